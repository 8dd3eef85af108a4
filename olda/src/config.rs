#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hyperparameters and runtime knobs for [`crate::ParticleFilterLda`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FilterConfig {
    /// Number of topics.
    pub topics: usize,
    /// Symmetric Dirichlet prior on document-topic distributions.
    pub alpha: f64,
    /// Symmetric Dirichlet prior on topic-word distributions.
    pub beta: f64,
    /// Reservoir capacity in documents. Once full, an arriving document
    /// either evicts a uniformly chosen resident or is not retained.
    pub reservoir_capacity: usize,
    /// Number of particles.
    pub particles: usize,
    /// Resample and rejuvenate when the effective sample size of the
    /// normalized weights is at or below this value.
    pub ess_threshold: f64,
    /// Retained word positions resampled per rejuvenation pass.
    pub rejuvenation_batch: usize,
    /// MCMC passes per rejuvenation event.
    pub rejuvenation_steps: usize,
    /// PRNG seed. Identical seeds and identical input order reproduce
    /// identical output.
    pub seed: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            topics: 10,
            alpha: 0.1,
            beta: 0.01,
            reservoir_capacity: 1000,
            particles: 100,
            ess_threshold: 20.0,
            rejuvenation_batch: 30,
            rejuvenation_steps: 1,
            seed: 42,
        }
    }
}

impl FilterConfig {
    /// Check that the configuration is usable.
    ///
    /// # Panics
    /// When `topics` or `particles` is zero, or when a prior is not
    /// strictly positive and finite.
    pub fn validate(&self) {
        assert!(self.topics > 0, "at least one topic is required");
        assert!(self.particles > 0, "at least one particle is required");
        assert!(
            self.alpha > 0.0 && self.alpha.is_finite(),
            "alpha must be strictly positive, got {}",
            self.alpha
        );
        assert!(
            self.beta > 0.0 && self.beta.is_finite(),
            "beta must be strictly positive, got {}",
            self.beta
        );
    }
}

#[cfg(test)]
mod tests {
    use super::FilterConfig;

    #[test]
    fn default_is_valid() {
        FilterConfig::default().validate();
    }

    #[test]
    #[should_panic(expected = "at least one topic")]
    fn rejects_zero_topics() {
        FilterConfig {
            topics: 0,
            ..FilterConfig::default()
        }
        .validate();
    }

    #[test]
    #[should_panic(expected = "alpha must be strictly positive")]
    fn rejects_non_positive_alpha() {
        FilterConfig {
            alpha: 0.0,
            ..FilterConfig::default()
        }
        .validate();
    }
}
