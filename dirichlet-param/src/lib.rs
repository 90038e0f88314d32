//! Conjugate parameter distributions for network point-process models.
//!
//! Provides the Dirichlet concentration-array helper (posterior mean,
//! expected-log statistic, negentropy, sampling) together with the
//! capability traits shared by the inference schemes: exact conditional
//! resampling ([`traits::GibbsSampling`]), mean-field coordinate ascent
//! ([`traits::MeanField`]), and stochastic natural-gradient steps
//! ([`traits::MeanFieldSVI`]).

pub mod dirichlet;
pub mod traits;
