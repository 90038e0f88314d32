//! Per-process-pair impulse responses.
//!
//! One Dirichlet-distributed basis-weight vector per ordered pair of
//! processes, K² vectors in total. `g[[k1, k2, ..]]` is the current Gibbs
//! sample, `mf_gamma[[k1, k2, ..]]` the variational concentrations; both
//! are owned by the model and mutated only through the update operations.

use anyhow::{bail, ensure, Result};
use dirichlet_param::dirichlet::{concentration_vector, ln_normalizer, Dirichlet};
use dirichlet_param::traits::{GibbsSampling, MeanField, MeanFieldSVI};
use log::{debug, info};
use ndarray::prelude::*;
use rand::rngs::SmallRng;

/// Dirichlet basis-weight vectors for all K² ordered process pairs.
pub struct DirichletImpulseResponses {
    k: usize,
    b: usize,
    /// Shared symmetric prior concentration, length B
    gamma: Array1<f64>,
    /// Current Gibbs sample, K×K×B, one simplex vector per pair
    g: Array3<f64>,
    /// Variational posterior concentrations, K×K×B
    mf_gamma: Array3<f64>,
    rng: SmallRng,
}

impl DirichletImpulseResponses {
    /// Create the model and draw the initial `g` from the prior.
    ///
    /// * `k` - number of processes
    /// * `b` - number of temporal basis functions
    /// * `gamma` - prior concentration, length 1 (symmetric) or length `b`;
    ///   `None` is the all-ones prior
    /// * `rng` - seeded generator owned by this instance
    pub fn new(k: usize, b: usize, gamma: Option<&[f64]>, rng: SmallRng) -> Result<Self> {
        let gamma = concentration_vector(b, gamma)?;

        info!("initializing {} x {} x {} impulse responses", k, k, b);

        let mf_gamma = Array3::from_shape_fn((k, k, b), |(_, _, j)| gamma[j]);

        let mut model = DirichletImpulseResponses {
            k,
            b,
            gamma,
            g: Array3::zeros((k, k, b)),
            mf_gamma,
            rng,
        };
        model.resample(None)?;
        Ok(model)
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

    /// Current Gibbs sample of the impulse responses, K×K×B.
    pub fn g(&self) -> &Array3<f64> {
        &self.g
    }

    /// Variational posterior concentrations, K×K×B.
    pub fn mf_gamma(&self) -> &Array3<f64> {
        &self.mf_gamma
    }

    /// Total log-density of `x` under the symmetric product-Dirichlet prior.
    ///
    /// `x` must be K×K×B with each pair's vector on the simplex.
    pub fn log_likelihood(&self, x: &Array3<f64>) -> Result<f64> {
        ensure!(
            x.dim() == (self.k, self.k, self.b),
            "impulse responses must be {} x {} x {}, got {:?}",
            self.k,
            self.k,
            self.b,
            x.dim()
        );

        let z = ln_normalizer(&self.gamma.view());
        let shape_term = (x.mapv(f64::ln) * &self.gamma.mapv(|a| a - 1.0)).sum();
        Ok((self.k * self.k) as f64 * z + shape_term)
    }

    /// Log-density of the current sample `g`.
    pub fn log_probability(&self) -> Result<f64> {
        self.log_likelihood(&self.g)
    }

    /// Aggregate a (T, K, K, B) parent-count tensor over the time axis.
    ///
    /// `None` stands for an empty data set and yields all zeros, so the
    /// conditional posterior collapses to the prior.
    pub fn sufficient_statistics(&self, data: Option<&Array4<f64>>) -> Result<Array3<f64>> {
        match data {
            Some(data) => {
                let shape = data.shape();
                ensure!(
                    shape[1] == self.k && shape[2] == self.k && shape[3] == self.b,
                    "parent counts must be T x {} x {} x {}, got {:?}",
                    self.k,
                    self.k,
                    self.b,
                    shape
                );
                Ok(data.sum_axis(Axis(0)))
            }
            None => Ok(Array3::zeros((self.k, self.k, self.b))),
        }
    }

    /// Mean-field expectation of each weight vector, K×K×B, normalized
    /// over the basis axis.
    pub fn expected_g(&self) -> Array3<f64> {
        Dirichlet::new(self.mf_gamma.view()).mean()
    }

    /// Expected log weights `digamma(mf_gamma_b) - digamma(sum_b mf_gamma)`.
    pub fn expected_log_g(&self) -> Array3<f64> {
        Dirichlet::new(self.mf_gamma.view()).expected_log()
    }

    /// Not implemented; exposed as an explicit unsupported operation so
    /// callers cannot mistake a stub for a real draw.
    pub fn rvs(&self) -> Result<Array3<f64>> {
        bail!("rvs is not supported for DirichletImpulseResponses")
    }

    /// Not implemented, like [`Self::rvs`].
    pub fn expected_log_likelihood(&self, _x: &Array3<f64>) -> Result<f64> {
        bail!("expected_log_likelihood is not supported for DirichletImpulseResponses")
    }

    /// Natural-parameter update shared by the full-batch and SVI paths:
    /// `gamma_hat = gamma + sum_t EZ / minibatchfrac`, then a convex
    /// combination with step `stepsize` toward `gamma_hat`.
    fn mf_update_gamma(&mut self, ez: &Array4<f64>, minibatchfrac: f64, stepsize: f64) -> Result<()> {
        let shape = ez.shape();
        ensure!(
            shape[1] == self.k && shape[2] == self.k && shape[3] == self.b,
            "expected assignments must be T x {} x {} x {}, got {:?}",
            self.k,
            self.k,
            self.b,
            shape
        );

        debug!(
            "mean-field step over {} time bins: minibatchfrac = {}, stepsize = {}",
            shape[0], minibatchfrac, stepsize
        );

        let gamma_hat = ez.sum_axis(Axis(0)) / minibatchfrac + &self.gamma;
        self.mf_gamma = &self.mf_gamma * (1.0 - stepsize) + &gamma_hat * stepsize;
        Ok(())
    }
}

impl GibbsSampling for DirichletImpulseResponses {
    type Data = Array4<f64>;

    /// Redraw every pair's weight vector from its conditional posterior
    /// `Dirichlet(gamma + ss[[k1, k2, ..]])`. Validation happens before
    /// `g` is touched.
    fn resample(&mut self, data: Option<&Array4<f64>>) -> Result<()> {
        let alpha_post = self.sufficient_statistics(data)? + &self.gamma;
        self.g = Dirichlet::new(alpha_post.view()).sample(&mut self.rng)?;
        Ok(())
    }
}

impl MeanField for DirichletImpulseResponses {
    type ExpectedStats = Array4<f64>;

    fn meanfieldupdate(&mut self, ez: &Array4<f64>) -> Result<()> {
        self.mf_update_gamma(ez, 1.0, 1.0)
    }

    /// `sum_pairs E_q[ln p(g | gamma)] - sum_pairs E_q[ln q(g | mf_gamma)]`.
    fn get_vlb(&self) -> f64 {
        let e_ln_g = self.expected_log_g();
        let prior = Array3::from_shape_fn((self.k, self.k, self.b), |(_, _, j)| self.gamma[j]);

        let mut vlb = Dirichlet::new(prior.view())
            .negentropy(Some(e_ln_g.view()))
            .sum();
        vlb -= Dirichlet::new(self.mf_gamma.view()).negentropy(None).sum();
        vlb
    }

    fn resample_from_mf(&mut self) -> Result<()> {
        self.g = Dirichlet::new(self.mf_gamma.view()).sample(&mut self.rng)?;
        Ok(())
    }
}

impl MeanFieldSVI for DirichletImpulseResponses {
    type ExpectedStats = Array4<f64>;

    fn meanfield_sgdstep(
        &mut self,
        ez: &Array4<f64>,
        minibatchfrac: f64,
        stepsize: f64,
    ) -> Result<()> {
        self.mf_update_gamma(ez, minibatchfrac, stepsize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    fn make_model(k: usize, b: usize, gamma: Option<&[f64]>, seed: u64) -> DirichletImpulseResponses {
        DirichletImpulseResponses::new(k, b, gamma, SmallRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_construction_draws_from_prior() {
        let model = make_model(3, 4, None, 42);
        assert_eq!(model.g().dim(), (3, 3, 4));
        assert_eq!(model.mf_gamma().dim(), (3, 3, 4));

        for pair in model.g().rows() {
            assert_abs_diff_eq!(pair.sum(), 1.0, epsilon = 1e-10);
            assert!(pair.iter().all(|&x| x >= 0.0));
        }

        // variational parameters start at the prior
        assert!(model.mf_gamma().iter().all(|&a| a == 1.0));
    }

    #[test]
    fn test_gamma_validation() {
        assert!(model_result(2, 3, Some(&[0.5])).is_ok());
        assert!(model_result(2, 3, Some(&[1.0, 2.0, 3.0])).is_ok());
        assert!(model_result(2, 3, Some(&[1.0, 2.0])).is_err());
        assert!(model_result(2, 3, Some(&[-1.0])).is_err());

        fn model_result(
            k: usize,
            b: usize,
            gamma: Option<&[f64]>,
        ) -> Result<DirichletImpulseResponses> {
            DirichletImpulseResponses::new(k, b, gamma, SmallRng::seed_from_u64(0))
        }
    }

    #[test]
    fn test_sufficient_statistics() {
        let model = make_model(2, 3, None, 1);

        let none = model.sufficient_statistics(None).unwrap();
        assert_eq!(none, Array3::zeros((2, 2, 3)));

        let data = Array4::from_shape_fn((5, 2, 2, 3), |(t, k1, k2, b)| {
            (t + k1 + 2 * k2 + b) as f64
        });
        let ss = model.sufficient_statistics(Some(&data)).unwrap();
        assert_eq!(ss.dim(), (2, 2, 3));
        for k1 in 0..2 {
            for k2 in 0..2 {
                for b in 0..3 {
                    let expected: f64 = (0..5).map(|t| (t + k1 + 2 * k2 + b) as f64).sum();
                    assert_abs_diff_eq!(ss[[k1, k2, b]], expected, epsilon = 1e-12);
                }
            }
        }

        // K axes must match the model
        let bad = Array4::<f64>::zeros((5, 3, 2, 3));
        assert!(model.sufficient_statistics(Some(&bad)).is_err());
        let bad = Array4::<f64>::zeros((5, 2, 2, 4));
        assert!(model.sufficient_statistics(Some(&bad)).is_err());
    }

    #[test]
    fn test_log_likelihood_uniform() {
        // (gamma - 1) = 0, so only the normalizer survives:
        // K^2 * (B lnGamma(1) - lnGamma(B)) = -K^2 * lnGamma(3) = -4 ln(2)
        let model = make_model(2, 3, None, 2);
        let x = Array3::from_elem((2, 2, 3), 1.0 / 3.0);
        let ll = model.log_likelihood(&x).unwrap();
        assert_abs_diff_eq!(ll, -4.0 * 2.0f64.ln(), epsilon = 1e-10);

        let wrong = Array3::from_elem((2, 3, 3), 1.0 / 3.0);
        assert!(model.log_likelihood(&wrong).is_err());

        // log_probability evaluates at the current sample and is finite
        assert!(model.log_probability().unwrap().is_finite());
    }

    #[test]
    fn test_expected_g_is_simplex() {
        let mut model = make_model(2, 3, Some(&[2.0]), 3);
        let ez = Array4::from_shape_fn((4, 2, 2, 3), |(t, k1, _, b)| (t * k1 + b) as f64);
        model.meanfieldupdate(&ez).unwrap();

        for pair in model.expected_g().rows() {
            assert_abs_diff_eq!(pair.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_expected_log_g_jensen() {
        let mut model = make_model(3, 4, None, 4);
        let ez = Array4::from_shape_fn((2, 3, 3, 4), |(_, k1, k2, b)| (k1 + k2 + b) as f64);
        model.meanfieldupdate(&ez).unwrap();

        let e_ln = model.expected_log_g();
        let ln_e = model.expected_g().mapv(f64::ln);
        for (a, b) in e_ln.iter().zip(ln_e.iter()) {
            assert!(*a <= *b + 1e-12);
        }
    }

    #[test]
    fn test_full_batch_update_is_exact() {
        let mut model = make_model(2, 3, None, 5);
        let ez = Array4::from_elem((5, 2, 2, 3), 1.0);

        model.meanfield_sgdstep(&ez, 1.0, 1.0).unwrap();
        assert!(model.mf_gamma().iter().all(|&a| (a - 6.0).abs() < 1e-12));

        // meanfieldupdate is the same full-batch special case
        let mut other = make_model(2, 3, None, 6);
        other.meanfieldupdate(&ez).unwrap();
        assert_eq!(other.mf_gamma(), model.mf_gamma());
    }

    #[test]
    fn test_sgd_step_convex_combination() {
        let mut model = make_model(2, 3, None, 7);
        let ez = Array4::from_elem((5, 2, 2, 3), 1.0);

        // gamma_hat = 1 + 5 = 6, starting from mf_gamma = 1:
        // one half step: 0.5 * 1 + 0.5 * 6 = 3.5
        model.meanfield_sgdstep(&ez, 1.0, 0.5).unwrap();
        assert!(model.mf_gamma().iter().all(|&a| (a - 3.5).abs() < 1e-12));

        // second half step accumulates toward gamma_hat: 0.5 * 3.5 + 0.5 * 6 = 4.75
        model.meanfield_sgdstep(&ez, 1.0, 0.5).unwrap();
        assert!(model.mf_gamma().iter().all(|&a| (a - 4.75).abs() < 1e-12));
    }

    #[test]
    fn test_sgd_step_minibatch_scaling() {
        let mut model = make_model(2, 3, None, 8);
        let ez = Array4::from_elem((5, 2, 2, 3), 1.0);

        // a minibatch covering a quarter of the data counts four-fold:
        // gamma_hat = 1 + 20 = 21
        model.meanfield_sgdstep(&ez, 0.25, 1.0).unwrap();
        assert!(model.mf_gamma().iter().all(|&a| (a - 21.0).abs() < 1e-12));

        let bad = Array4::from_elem((5, 3, 2, 3), 1.0);
        assert!(model.meanfield_sgdstep(&bad, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_vlb_zero_at_prior() {
        // q == p right after construction, so this factor contributes
        // nothing to the bound
        let model = make_model(3, 4, Some(&[1.0, 2.0, 3.0, 0.5]), 9);
        assert_abs_diff_eq!(model.get_vlb(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vlb_finite_and_deterministic() {
        let mut model = make_model(2, 3, None, 10);
        let ez = Array4::from_shape_fn((3, 2, 2, 3), |(t, _, k2, b)| (t + k2 * b) as f64);
        model.meanfieldupdate(&ez).unwrap();

        let first = model.get_vlb();
        let second = model.get_vlb();
        assert!(first.is_finite());
        assert_eq!(first, second);
    }

    #[test]
    fn test_resample_from_mf() {
        let mut model = make_model(2, 3, None, 11);
        let ez = Array4::from_elem((100, 2, 2, 3), 1.0);
        model.meanfieldupdate(&ez).unwrap();
        model.resample_from_mf().unwrap();

        for pair in model.g().rows() {
            assert_abs_diff_eq!(pair.sum(), 1.0, epsilon = 1e-10);
        }

        // mf_gamma is uniform and concentrated, so draws stay near 1/B
        let expected = model.expected_g();
        for (a, b) in model.g().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 0.2);
        }
    }

    #[test]
    fn test_placeholders_are_unsupported() {
        let model = make_model(2, 3, None, 12);
        assert!(model.rvs().is_err());
        let x = Array3::from_elem((2, 2, 3), 1.0 / 3.0);
        assert!(model.expected_log_likelihood(&x).is_err());
    }
}
