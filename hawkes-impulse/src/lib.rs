//! Impulse-response distributions for the discrete-time network Hawkes model.
//!
//! In the discrete-time network Hawkes process, K event streams excite each
//! other through impulse responses expressed as weights over B fixed
//! temporal basis functions. Each ordered pair of processes `(k1, k2)`
//! carries a Dirichlet-distributed weight vector of length B giving the
//! temporal shape of the influence of `k1` on `k2`.
//!
//! # Inference
//!
//! The per-process-pair model supports the three schemes the enclosing
//! sampler alternates between:
//!
//! - **Gibbs**: exact conditional resampling of all K² weight vectors from
//!   `Dirichlet(gamma + parent counts)`
//! - **Mean field**: closed-form coordinate-ascent updates of the
//!   variational concentrations and the factor's ELBO contribution
//! - **SVI**: natural-gradient steps on minibatch statistics scaled up to
//!   full-data size
//!
//! The per-block-pair variant (stochastic block model indexing) only
//! supports construction; see [`block_impulse`].
//!
//! # References
//!
//! Linderman & Adams (2014). "Discovering Latent Network Structure in
//! Point Process Data." ICML.

/// Per-block-pair impulse responses (C×C, construction-only stub)
pub mod block_impulse;

/// Per-process-pair impulse responses (K×K)
pub mod impulse;


pub use block_impulse::SBMDirichletImpulseResponses;
pub use impulse::DirichletImpulseResponses;
