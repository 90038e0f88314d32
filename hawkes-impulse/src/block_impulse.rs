//! Per-block-pair impulse responses.
//!
//! The stochastic-block-model variant keeps one Dirichlet weight vector
//! per ordered pair of latent blocks, C² vectors in total, instead of one
//! per process pair. Construction is the only supported operation: how
//! block-level responses should pool the per-process parent counts is
//! still undecided, so everything beyond the prior draw fails with an
//! explicit "not supported" error instead of guessing those semantics.
//
// TODO: conditional updates need the process-to-block assignment vector
// to pool the (T, K, K, B) parent counts into C x C x B statistics.

use anyhow::{bail, Result};
use dirichlet_param::dirichlet::{concentration_vector, Dirichlet};
use log::info;
use ndarray::prelude::*;
use rand::rngs::SmallRng;

/// Dirichlet basis-weight vectors for all C² ordered block pairs.
///
/// Shares the field contract of
/// [`DirichletImpulseResponses`](crate::impulse::DirichletImpulseResponses)
/// at C×C×B; `k` is retained for reference only.
pub struct SBMDirichletImpulseResponses {
    c: usize,
    k: usize,
    b: usize,
    /// Shared symmetric prior concentration, length B
    gamma: Array1<f64>,
    /// Current sample, C×C×B, one simplex vector per block pair
    blockg: Array3<f64>,
    /// Variational posterior concentrations, C×C×B
    mf_gamma: Array3<f64>,
}

impl SBMDirichletImpulseResponses {
    /// Create the model and draw the initial `blockg` from the prior.
    ///
    /// * `c` - number of latent blocks
    /// * `k` - number of processes (kept for reference)
    /// * `b` - number of temporal basis functions
    /// * `gamma` - prior concentration, length 1 (symmetric) or length `b`;
    ///   `None` is the all-ones prior
    /// * `rng` - seeded generator, consumed by the prior draw
    pub fn new(
        c: usize,
        k: usize,
        b: usize,
        gamma: Option<&[f64]>,
        mut rng: SmallRng,
    ) -> Result<Self> {
        let gamma = concentration_vector(b, gamma)?;

        info!("initializing {} x {} x {} block impulse responses", c, c, b);

        let mf_gamma = Array3::from_shape_fn((c, c, b), |(_, _, j)| gamma[j]);
        let blockg = Dirichlet::new(mf_gamma.view()).sample(&mut rng)?;

        Ok(SBMDirichletImpulseResponses {
            c,
            k,
            b,
            gamma,
            blockg,
            mf_gamma,
        })
    }

    /// Number of latent blocks C.
    pub fn c(&self) -> usize {
        self.c
    }

    /// Number of processes K.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of basis functions B.
    pub fn b(&self) -> usize {
        self.b
    }

    /// Prior concentration vector, length B.
    pub fn gamma(&self) -> &Array1<f64> {
        &self.gamma
    }

    /// Current sample of the block impulse responses, C×C×B.
    pub fn blockg(&self) -> &Array3<f64> {
        &self.blockg
    }

    /// Variational posterior concentrations, C×C×B.
    pub fn mf_gamma(&self) -> &Array3<f64> {
        &self.mf_gamma
    }

    /// Not supported by the block-pair variant.
    pub fn rvs(&self) -> Result<Array3<f64>> {
        bail!("rvs is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn log_likelihood(&self, _x: &Array3<f64>) -> Result<f64> {
        bail!("log_likelihood is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn log_probability(&self) -> Result<f64> {
        bail!("log_probability is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn sufficient_statistics(&self, _data: Option<&Array4<f64>>) -> Result<Array3<f64>> {
        bail!("sufficient_statistics is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn resample(&mut self, _data: Option<&Array4<f64>>) -> Result<()> {
        bail!("resample is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn expected_g(&self) -> Result<Array3<f64>> {
        bail!("expected_g is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn expected_log_g(&self) -> Result<Array3<f64>> {
        bail!("expected_log_g is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn meanfieldupdate(&mut self, _ez: &Array4<f64>) -> Result<()> {
        bail!("meanfieldupdate is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn meanfield_sgdstep(
        &mut self,
        _ez: &Array4<f64>,
        _minibatchfrac: f64,
        _stepsize: f64,
    ) -> Result<()> {
        bail!("meanfield_sgdstep is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn expected_log_likelihood(&self, _x: &Array3<f64>) -> Result<f64> {
        bail!("expected_log_likelihood is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn get_vlb(&self) -> Result<f64> {
        bail!("get_vlb is not supported for SBMDirichletImpulseResponses")
    }

    /// Not supported by the block-pair variant.
    pub fn resample_from_mf(&mut self) -> Result<()> {
        bail!("resample_from_mf is not supported for SBMDirichletImpulseResponses")
    }
}
