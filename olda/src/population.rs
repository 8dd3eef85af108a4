//! The particle population and its shared assignment store.

use log::debug;
use rand::Rng;

use crate::data::assignments::AssignmentStore;
use crate::error::{Error, Result};
use crate::numerics::{l2_norm, normalize_to_cdf, sample_categorical};
use crate::particle::{Particle, RejuvenationWindow};
use crate::{Slot, WordId};

/// Owns the particle vector and the copy-on-write assignment forest, and
/// broadcasts the per-word operations across the population.
#[derive(Clone, Debug)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    store: AssignmentStore,
}

impl ParticleStore {
    /// Allocate `count` root particles with uniform weights.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(
        count: usize,
        topics: usize,
        alpha: f64,
        beta: f64,
        reservoir_capacity: usize,
    ) -> Self {
        let mut store = AssignmentStore::new(reservoir_capacity);
        let weight = 1.0 / count as f64;
        let particles = (0..count)
            .map(|_| Particle::new(store.new_root(), topics, alpha, beta, weight))
            .collect();
        Self { particles, store }
    }

    /// Scale every particle's weight by its predictive probability of
    /// `word`.
    pub fn reweight_all(&mut self, word: WordId, vocab_size: usize) {
        for particle in &mut self.particles {
            particle.reweight(word, vocab_size);
        }
    }

    /// Sample a topic for the current word in every particle.
    pub fn transition_all<R: Rng>(
        &mut self,
        position: usize,
        word: WordId,
        slot: Option<Slot>,
        vocab_size: usize,
        rng: &mut R,
    ) -> Result<()> {
        for particle in &mut self.particles {
            particle.transition(position, word, slot, &mut self.store, vocab_size, rng)?;
        }
        Ok(())
    }

    /// Start a new document in every particle.
    pub fn begin_document_all(&mut self, slot: Option<Slot>, len: usize) -> Result<()> {
        for particle in &mut self.particles {
            particle.begin_document(slot, len, &mut self.store)?;
        }
        Ok(())
    }

    /// Rescale the weights to sum to one.
    ///
    /// # Errors
    /// [`Error::ParticleCollapse`] when the total mass is zero or not
    /// finite; the weights are left untouched.
    pub fn normalize_weights(&mut self) -> Result<()> {
        let mass: f64 = self.particles.iter().map(Particle::weight).sum();
        if !mass.is_finite() || mass <= 0.0 {
            return Err(Error::ParticleCollapse {
                particles: self.particles.len(),
            });
        }
        for particle in &mut self.particles {
            particle.set_weight(particle.weight() / mass);
        }
        Ok(())
    }

    /// Effective sample size `1 / ‖w‖₂²` of the (normalized) weights.
    #[must_use]
    pub fn effective_sample_size(&self) -> f64 {
        let norm = l2_norm(&self.weights());
        1.0 / (norm * norm)
    }

    /// Snapshot of the current weights, in particle order.
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.particles.iter().map(Particle::weight).collect()
    }

    /// Replace the population by as many multinomial draws with
    /// replacement, proportional to weight.
    ///
    /// Every draw becomes a child particle: counts are deep-copied, while
    /// assignments stay shared with the drawn particle through a fresh
    /// store node. Afterwards the weights are uniform and unreachable store
    /// nodes are pruned.
    ///
    /// # Errors
    /// [`Error::ParticleCollapse`] when the weights carry no mass to
    /// resample from.
    pub fn resample<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let mut cdf = self.weights();
        normalize_to_cdf(&mut cdf).map_err(|_| Error::ParticleCollapse {
            particles: self.particles.len(),
        })?;

        let next = (0..self.particles.len())
            .map(|_| {
                let pick = sample_categorical(&cdf, rng)?;
                let node = self.store.new_child(self.particles[pick].node());
                Ok(self.particles[pick].duplicate(node))
            })
            .collect::<Result<Vec<Particle>>>()?;
        self.particles = next;

        let live: Vec<_> = self.particles.iter().map(Particle::node).collect();
        self.store.prune(&live);
        self.uniform_reweight_all();
        debug!("resampled {} particles", self.particles.len());
        Ok(())
    }

    /// One rejuvenation pass over every particle; each draws its own fresh
    /// batch of retained positions.
    pub fn rejuvenate_all<R: Rng>(
        &mut self,
        window: &RejuvenationWindow,
        batch: usize,
        current_slot: Option<Slot>,
        vocab_size: usize,
        rng: &mut R,
    ) -> Result<()> {
        for particle in &mut self.particles {
            particle.rejuvenate(window, batch, current_slot, &mut self.store, vocab_size, rng)?;
        }
        Ok(())
    }

    /// Reset every weight to `1 / P`.
    #[allow(clippy::cast_precision_loss)]
    pub fn uniform_reweight_all(&mut self) {
        let weight = 1.0 / self.particles.len() as f64;
        for particle in &mut self.particles {
            particle.set_weight(weight);
        }
    }

    /// The live particles, in population order.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable particle access for tests that need to force degenerate
    /// weight states the arithmetic cannot reach on its own.
    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// The shared assignment forest.
    #[must_use]
    pub const fn assignments(&self) -> &AssignmentStore {
        &self.store
    }

    /// Population size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}
