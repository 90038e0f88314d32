/// A distribution that supports exact resampling from its conditional
/// posterior given observed data.
pub trait GibbsSampling {
    type Data;

    /// Redraw the state from `p(state | data)`; `None` draws from the prior.
    fn resample(&mut self, data: Option<&Self::Data>) -> anyhow::Result<()>;
}

/// A distribution with a fully factorized variational posterior and
/// closed-form coordinate-ascent updates.
pub trait MeanField {
    type ExpectedStats;

    /// Full-batch coordinate-ascent update of the variational parameters
    /// given expected sufficient statistics.
    fn meanfieldupdate(&mut self, ez: &Self::ExpectedStats) -> anyhow::Result<()>;

    /// Contribution of this factor to the evidence lower bound,
    /// `E[ln p] - E[ln q]` under the current variational posterior.
    fn get_vlb(&self) -> f64;

    /// Replace the current sample with a draw from the variational posterior.
    fn resample_from_mf(&mut self) -> anyhow::Result<()>;
}

/// A mean-field distribution that additionally supports stochastic
/// variational inference: natural-gradient steps on minibatch statistics.
pub trait MeanFieldSVI {
    type ExpectedStats;

    /// Take a natural-gradient step of size `stepsize` toward the
    /// coordinate-ascent optimum implied by a minibatch covering
    /// `minibatchfrac` of the full data set.
    fn meanfield_sgdstep(
        &mut self,
        ez: &Self::ExpectedStats,
        minibatchfrac: f64,
        stepsize: f64,
    ) -> anyhow::Result<()>;
}
