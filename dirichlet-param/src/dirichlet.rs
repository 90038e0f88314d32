//! Dirichlet concentration-array helper.
//!
//! Both impulse-response models keep one length-B concentration vector per
//! ordered pair, so every routine here works on `(.., .., B)` arrays with
//! the basis axis trailing; a broadcast view covers the shared prior.

extern crate special;

use anyhow::{ensure, Result};
use ndarray::prelude::*;
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use special::Gamma as SpecialGamma;

/// Build a concentration vector from an optional user override.
///
/// * `b` - number of basis functions
/// * `gamma` - length 1 (symmetric) or length `b` (per basis); `None` is
///   the all-ones symmetric prior
pub fn concentration_vector(b: usize, gamma: Option<&[f64]>) -> Result<Array1<f64>> {
    let gamma = match gamma {
        None => Array1::ones(b),
        Some(values) if values.len() == 1 => Array1::from_elem(b, values[0]),
        Some(values) if values.len() == b => Array1::from(values.to_vec()),
        Some(values) => anyhow::bail!(
            "gamma must have length 1 (symmetric) or {} (per basis), got {}",
            b,
            values.len()
        ),
    };
    ensure!(
        gamma.iter().all(|&a| a > 0.0),
        "gamma entries must be positive"
    );
    Ok(gamma)
}

/// Log-normalizer `sum_b lnGamma(alpha_b) - lnGamma(sum_b alpha_b)` of a
/// single concentration vector.
pub fn ln_normalizer(alpha: &ArrayView1<f64>) -> f64 {
    let total: f64 = alpha.sum();
    let ln_gamma_sum: f64 = alpha.iter().map(|&a| SpecialGamma::ln_gamma(a).0).sum();
    ln_gamma_sum - SpecialGamma::ln_gamma(total).0
}

/// Draw one vector from `Dirichlet(alpha)`.
///
/// Samples `x_b ~ Gamma(alpha_b, 1)` per coordinate and normalizes:
/// if `X_b ~ Gamma(alpha_b, 1)` then `X / sum_b X_b ~ Dirichlet(alpha)`.
pub fn sample_dirichlet<R: Rng>(alpha: &ArrayView1<f64>, rng: &mut R) -> Result<Array1<f64>> {
    ensure!(
        alpha.iter().all(|&a| a > 0.0),
        "Dirichlet concentrations must be positive"
    );

    let mut draw = Array1::<f64>::zeros(alpha.len());
    for (x, &a) in draw.iter_mut().zip(alpha.iter()) {
        *x = Gamma::new(a, 1.0)?.sample(rng);
    }

    let total = draw.sum();
    Ok(draw / total)
}

/// A family of Dirichlet variables, one per leading pair index, with a
/// shared trailing basis axis.
pub struct Dirichlet<'a> {
    alpha: ArrayView3<'a, f64>,
}

impl<'a> Dirichlet<'a> {
    /// Borrow a `(.., .., B)` concentration array.
    pub fn new(alpha: ArrayView3<'a, f64>) -> Self {
        Dirichlet { alpha }
    }

    /// Posterior mean `alpha / sum_b alpha`, one simplex vector per pair.
    pub fn mean(&self) -> Array3<f64> {
        let total = self.alpha.sum_axis(Axis(2)).insert_axis(Axis(2));
        &self.alpha / &total
    }

    /// Expected log statistic `digamma(alpha_b) - digamma(sum_b alpha)`.
    pub fn expected_log(&self) -> Array3<f64> {
        let psi_total = self
            .alpha
            .sum_axis(Axis(2))
            .mapv(|a| SpecialGamma::digamma(a))
            .insert_axis(Axis(2));
        self.alpha.mapv(|a| SpecialGamma::digamma(a)) - &psi_total
    }

    /// Negative entropy `E[ln p(x | alpha)]` per pair:
    ///
    /// ```text
    /// sum_b (alpha_b - 1) E[ln x_b] - (lnGamma(sum_b alpha_b) - sum_b lnGamma(alpha_b))
    /// ```
    ///
    /// With `e_ln_x = None` the expectation is taken under `alpha` itself,
    /// giving the (negated) entropy of this distribution; supplying the
    /// expected log of another posterior gives the cross term of the ELBO.
    pub fn negentropy(&self, e_ln_x: Option<ArrayView3<f64>>) -> Array2<f64> {
        let e_ln = match e_ln_x {
            Some(v) => v.to_owned(),
            None => self.expected_log(),
        };

        let ln_norm = self
            .alpha
            .sum_axis(Axis(2))
            .mapv(|a| SpecialGamma::ln_gamma(a).0)
            - self
                .alpha
                .mapv(|a| SpecialGamma::ln_gamma(a).0)
                .sum_axis(Axis(2));

        (self.alpha.mapv(|a| a - 1.0) * &e_ln).sum_axis(Axis(2)) - ln_norm
    }

    /// Draw one simplex vector per pair.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<Array3<f64>> {
        let (n1, n2, _) = self.alpha.dim();
        let mut out = Array3::<f64>::zeros(self.alpha.raw_dim());
        for i in 0..n1 {
            for j in 0..n2 {
                let draw = sample_dirichlet(&self.alpha.slice(s![i, j, ..]), rng)?;
                out.slice_mut(s![i, j, ..]).assign(&draw);
            }
        }
        Ok(out)
    }
}
