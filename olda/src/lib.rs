//! Online topic inference with Latent Dirichlet Allocation.
//!
//! A Rao-Blackwellized particle filter ingests tokenized documents one at a
//! time. Each particle is a weighted hypothesis over the topic of every word
//! observed so far; when the effective sample size of the weights drops, the
//! population is resampled and rejuvenated with Gibbs moves over a uniform
//! reservoir of past documents. See [`filter`] for the algorithmic
//! reference.

pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod numerics;
pub mod particle;
pub mod population;
pub mod report;

pub use config::FilterConfig;
pub use error::{Error, Result};
pub use filter::ParticleFilterLda;
pub use particle::Particle;
pub use report::TopicReport;

/// Dense vocabulary id of an observed token.
pub type WordId = usize;

/// Topic index in `[0, T)`.
pub type Topic = usize;

/// Reservoir slot index in `[0, K)`.
pub type Slot = usize;

/// Index of a particle's node in the assignment forest.
pub type NodeId = usize;
