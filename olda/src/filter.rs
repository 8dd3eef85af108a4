//! Streaming topic inference with a Rao-Blackwellized particle filter.
//!
//! ```bibtex
//! @inproceedings{Canini2009,
//!    author = {Kevin R. Canini and Lei Shi and Thomas L. Griffiths},
//!    booktitle = {Proceedings of the Twelfth International Conference on Artificial Intelligence and Statistics},
//!    pages = {65--72},
//!    title = {Online Inference of Topics with Latent Dirichlet Allocation},
//!    year = {2009},
//! }
//! ```

use log::{debug, trace};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use crate::config::FilterConfig;
use crate::data::reservoir::ReservoirSampler;
use crate::data::vocabulary::Vocabulary;
use crate::error::{Error, Result};
use crate::particle::{Particle, RejuvenationWindow};
use crate::population::ParticleStore;
use crate::report::TopicReport;
use crate::{Slot, Topic};

/// Online LDA inference engine.
///
/// Documents are ingested one at a time. Every particle keeps a full
/// hypothesis over the topics of all observed words; after each word the
/// weights are renormalized, and a low effective sample size triggers
/// multinomial resampling followed by MCMC rejuvenation over a uniform
/// reservoir of past documents.
#[derive(Clone, Debug)]
pub struct ParticleFilterLda {
    config: FilterConfig,
    vocabulary: Vocabulary,
    reservoir: ReservoirSampler<Vec<String>>,
    // Per-slot count of word positions whose transition committed in every
    // particle. A resident whose ingest failed mid-document keeps a prefix
    // shorter than its token count; only that prefix may ever be read back.
    committed: Vec<usize>,
    population: ParticleStore,
    rng: Xoshiro256Plus,
    words_seen: usize,
}

impl ParticleFilterLda {
    /// Build an engine from `config`.
    ///
    /// # Panics
    /// When the configuration is invalid, see [`FilterConfig::validate`].
    #[must_use]
    pub fn new(config: FilterConfig) -> Self {
        config.validate();
        let population = ParticleStore::new(
            config.particles,
            config.topics,
            config.alpha,
            config.beta,
            config.reservoir_capacity,
        );
        let reservoir = ReservoirSampler::new(config.reservoir_capacity);
        let rng = Xoshiro256Plus::seed_from_u64(config.seed);
        Self {
            vocabulary: Vocabulary::new(),
            reservoir,
            committed: vec![0; config.reservoir_capacity],
            population,
            rng,
            words_seen: 0,
            config,
        }
    }

    /// Ingest one tokenized document.
    ///
    /// Returns the reservoir slot the document was retained in, or `None`
    /// when the reservoir did not keep it.
    ///
    /// # Errors
    /// [`Error::ParticleCollapse`] when the weights (or a single particle's
    /// predictive distribution) lose all mass mid-document. Counts committed
    /// before the failing word stay in place and the engine is poisoned for
    /// this document only: a retained document keeps just its committed
    /// prefix visible to rejuvenation and label reads, so later documents
    /// may still be ingested.
    pub fn ingest_document<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<Option<Slot>> {
        let document: Vec<String> = tokens.iter().map(|t| t.as_ref().to_owned()).collect();
        let len = document.len();
        let slot = self.reservoir.add(document, &mut self.rng);
        if let Some(slot) = slot {
            self.committed[slot] = 0;
        }
        self.population.begin_document_all(slot, len)?;
        trace!("document of {len} words entered slot {slot:?}");

        for (position, token) in tokens.iter().enumerate() {
            // The vocabulary grows before the update equations run, so the
            // smoothing denominator sees the current word.
            let word = self.vocabulary.intern(token.as_ref());
            let vocab_size = self.vocabulary.len();

            self.population.reweight_all(word, vocab_size);
            self.population
                .transition_all(position, word, slot, vocab_size, &mut self.rng)
                .map_err(|e| self.collapse_on_degenerate(e))?;

            // Only a word whose transition committed in every particle is
            // durably assigned; the counters must never run ahead of the
            // assignment store.
            self.words_seen += 1;
            if let Some(slot) = slot {
                self.committed[slot] = position + 1;
            }

            self.population.normalize_weights()?;

            let ess = self.population.effective_sample_size();
            if ess <= self.config.ess_threshold {
                debug!(
                    "ess {ess:.3} at or below {}; resampling and rejuvenating",
                    self.config.ess_threshold
                );
                self.population.resample(&mut self.rng)?;
                let window = self.rejuvenation_window();
                for _ in 0..self.config.rejuvenation_steps {
                    self.population.rejuvenate_all(
                        &window,
                        self.config.rejuvenation_batch,
                        slot,
                        vocab_size,
                        &mut self.rng,
                    )?;
                }
            }
        }
        Ok(slot)
    }

    /// Every retained `(slot, position)` pair whose assignment was durably
    /// committed. Each resident is bounded to its committed prefix, which
    /// covers both the document currently being ingested and any resident
    /// whose ingest failed mid-document; the flat list is truncated to the
    /// number of words observed so far.
    fn rejuvenation_window(&self) -> RejuvenationWindow {
        let docs = self
            .reservoir
            .iter()
            .enumerate()
            .map(|(slot, tokens)| {
                let words = tokens[..self.committed[slot]]
                    .iter()
                    .map(|t| self.vocabulary.id(t).expect("observed tokens are interned"))
                    .collect();
                (slot, words)
            })
            .collect();
        RejuvenationWindow::new(docs, self.words_seen)
    }

    fn collapse_on_degenerate(&self, error: Error) -> Error {
        match error {
            Error::DegenerateDistribution { .. } => Error::ParticleCollapse {
                particles: self.config.particles,
            },
            other => other,
        }
    }

    /// Top `top_n` words per topic for every particle, ordered by
    /// within-topic probability.
    #[must_use]
    pub fn topic_report(&self, top_n: usize) -> TopicReport {
        TopicReport::new(
            &self.population,
            &self.vocabulary,
            self.config.beta,
            top_n,
        )
    }

    /// Current topic assignment of every durably assigned word of a
    /// retained document, one vector per particle. A document whose ingest
    /// failed mid-way reports only its committed prefix.
    ///
    /// # Errors
    /// [`Error::SlotOutOfRange`] when `slot` holds no document.
    pub fn per_document_labels(&self, slot: Slot) -> Result<Vec<Vec<Topic>>> {
        if self.reservoir.get(slot).is_none() {
            return Err(Error::SlotOutOfRange {
                slot,
                capacity: self.reservoir.capacity(),
            });
        }
        let len = self.committed[slot];
        self.population
            .particles()
            .iter()
            .map(|particle| {
                (0..len)
                    .map(|position| {
                        self.population
                            .assignments()
                            .get(particle.node(), slot, position)
                    })
                    .collect()
            })
            .collect()
    }

    /// The interned vocabulary.
    #[must_use]
    pub const fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// The live particles, in population order.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        self.population.particles()
    }

    /// Snapshot of the normalized particle weights.
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.population.weights()
    }

    /// Effective sample size of the current weights.
    #[must_use]
    pub fn effective_sample_size(&self) -> f64 {
        self.population.effective_sample_size()
    }

    /// Total words durably assigned across all ingested documents. A word
    /// whose ingest failed before its transition committed is not counted.
    #[must_use]
    pub const fn words_seen(&self) -> usize {
        self.words_seen
    }

    /// Number of documents currently retained for rejuvenation.
    #[must_use]
    pub fn reservoir_occupied(&self) -> usize {
        self.reservoir.occupied()
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &FilterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::ParticleFilterLda;
    use crate::config::FilterConfig;
    use crate::error::Error;

    fn config() -> FilterConfig {
        FilterConfig {
            topics: 2,
            alpha: 0.1,
            beta: 0.1,
            reservoir_capacity: 2,
            particles: 1,
            ess_threshold: 0.0,
            rejuvenation_batch: 2,
            rejuvenation_steps: 1,
            seed: 1,
        }
    }

    #[test]
    fn two_documents_grow_vocabulary_and_counts() {
        let mut engine = ParticleFilterLda::new(config());

        let first = engine.ingest_document(&["a", "b"]).unwrap();
        let second = engine.ingest_document(&["a", "c"]).unwrap();
        assert_eq!(first, Some(0));
        assert_eq!(second, Some(1));

        assert_eq!(engine.vocabulary().id("a"), Some(0));
        assert_eq!(engine.vocabulary().id("b"), Some(1));
        assert_eq!(engine.vocabulary().id("c"), Some(2));
        assert_eq!(engine.vocabulary().len(), 3);
        assert_eq!(engine.words_seen(), 4);

        let particle = &engine.particles()[0];
        assert_eq!(particle.global().total(0) + particle.global().total(1), 4);
        assert_eq!(particle.document().total(), 2);
    }

    #[test]
    fn ess_threshold_zero_never_fires() {
        // With one particle the normalized weight is always 1, so the ESS
        // stays at 1 and a zero threshold never triggers a resample. The
        // store then holds exactly the root node.
        let mut engine = ParticleFilterLda::new(config());
        engine.ingest_document(&["a", "b", "a"]).unwrap();
        assert_eq!(engine.population.assignments().len(), 1);
    }

    #[test]
    fn rejuvenation_fires_every_word_under_high_threshold() {
        let mut engine = ParticleFilterLda::new(FilterConfig {
            topics: 2,
            reservoir_capacity: 8,
            particles: 5,
            ess_threshold: 200.0,
            rejuvenation_batch: 2,
            rejuvenation_steps: 1,
            seed: 7,
            ..FilterConfig::default()
        });

        for _ in 0..3 {
            engine.ingest_document(&["x", "y", "z"]).unwrap();
        }

        // One assignment per token per ingest, across all three words.
        for particle in engine.particles() {
            let assigned: usize = (0..2)
                .map(|t| {
                    particle.global().count(0, t)
                        + particle.global().count(1, t)
                        + particle.global().count(2, t)
                })
                .sum();
            assert_eq!(assigned, 9);
        }

        // Resampling happened, so the population is made of child nodes.
        assert!(engine.population.assignments().len() > 5);
    }

    #[test]
    fn empty_document_only_touches_the_reservoir() {
        let mut engine = ParticleFilterLda::new(config());
        let slot = engine.ingest_document::<&str>(&[]).unwrap();
        assert_eq!(slot, Some(0));
        assert_eq!(engine.words_seen(), 0);
        assert_eq!(engine.vocabulary().len(), 0);
        assert_eq!(engine.reservoir_occupied(), 1);
        assert_eq!(engine.particles()[0].document().total(), 0);
    }

    #[test]
    fn zero_capacity_reservoir_disables_rejuvenation() {
        let mut engine = ParticleFilterLda::new(FilterConfig {
            topics: 2,
            reservoir_capacity: 0,
            particles: 3,
            ess_threshold: 1e9,
            rejuvenation_batch: 10,
            rejuvenation_steps: 3,
            seed: 5,
            ..FilterConfig::default()
        });

        for _ in 0..4 {
            let slot = engine.ingest_document(&["p", "q"]).unwrap();
            assert_eq!(slot, None);
        }
        assert_eq!(engine.reservoir_occupied(), 0);

        for particle in engine.particles() {
            let total: usize = (0..2).map(|t| particle.global().total(t)).sum();
            assert_eq!(total, 8);
        }
    }

    #[test]
    fn first_word_keeps_equal_weights_across_particles() {
        // Before the first transition every particle carries identical
        // counts, so the first reweight scales all weights equally: the ESS
        // stays at P and any threshold below P cannot fire.
        let mut engine = ParticleFilterLda::new(FilterConfig {
            topics: 2,
            particles: 3,
            reservoir_capacity: 2,
            ess_threshold: 2.9,
            seed: 3,
            ..FilterConfig::default()
        });
        engine.ingest_document(&["solo"]).unwrap();

        for weight in engine.weights() {
            assert::close(weight, 1.0 / 3.0, 1e-12);
        }
        assert::close(engine.effective_sample_size(), 3.0, 1e-9);
        for particle in engine.particles() {
            let total: usize = (0..2).map(|t| particle.global().total(t)).sum();
            assert_eq!(total, 1);
        }
        assert_eq!(engine.population.assignments().len(), 3);
    }

    #[test]
    fn labels_for_unoccupied_slot_are_rejected() {
        let mut engine = ParticleFilterLda::new(config());
        engine.ingest_document(&["a"]).unwrap();
        assert!(engine.per_document_labels(0).is_ok());
        assert!(matches!(
            engine.per_document_labels(1),
            Err(Error::SlotOutOfRange { slot: 1, .. })
        ));
    }

    #[test]
    fn labels_cover_every_position_for_every_particle() {
        let mut engine = ParticleFilterLda::new(FilterConfig {
            topics: 3,
            particles: 4,
            reservoir_capacity: 4,
            ess_threshold: 0.0,
            seed: 9,
            ..FilterConfig::default()
        });
        engine.ingest_document(&["u", "v", "w"]).unwrap();

        let labels = engine.per_document_labels(0).unwrap();
        assert_eq!(labels.len(), 4);
        for particle_labels in labels {
            assert_eq!(particle_labels.len(), 3);
            assert!(particle_labels.iter().all(|&t| t < 3));
        }
    }

    #[test]
    fn collapse_mid_document_leaves_later_ingests_safe() {
        // Every word triggers a resample, and the batch is large enough
        // that rejuvenation visits every eligible retained position.
        let mut engine = ParticleFilterLda::new(FilterConfig {
            topics: 2,
            particles: 3,
            reservoir_capacity: 4,
            ess_threshold: 1e9,
            rejuvenation_batch: 100,
            rejuvenation_steps: 2,
            seed: 13,
            ..FilterConfig::default()
        });
        engine.ingest_document(&["a", "b"]).unwrap();

        // Zero the weights so the next normalization reports a collapse
        // after the first word of the document has committed.
        for particle in engine.population.particles_mut() {
            particle.set_weight(0.0);
        }
        let err = engine.ingest_document(&["c", "d", "e"]).unwrap_err();
        assert!(matches!(err, Error::ParticleCollapse { particles: 3 }));

        // The poisoned document stays resident with only its committed
        // prefix visible; the uncommitted suffix is not counted.
        assert_eq!(engine.reservoir_occupied(), 2);
        assert_eq!(engine.words_seen(), 3);
        let labels = engine.per_document_labels(1).unwrap();
        assert!(labels.iter().all(|per_particle| per_particle.len() == 1));

        // Once the caller restores usable weights, later documents ingest
        // and rejuvenate over the whole reservoir without tripping over the
        // unassigned suffix.
        engine.population.uniform_reweight_all();
        engine.ingest_document(&["f", "g", "h", "i"]).unwrap();

        assert_eq!(engine.words_seen(), 7);
        for particle in engine.particles() {
            let total: usize = (0..2).map(|t| particle.global().total(t)).sum();
            assert_eq!(total, 7);
        }
        let weight_sum: f64 = engine.weights().iter().sum();
        assert::close(weight_sum, 1.0, 1e-9);
    }

    #[test]
    fn identical_seeds_reproduce_identical_reports() {
        let build = || {
            ParticleFilterLda::new(FilterConfig {
                topics: 2,
                particles: 5,
                reservoir_capacity: 4,
                ess_threshold: 3.0,
                rejuvenation_batch: 4,
                rejuvenation_steps: 2,
                seed: 11,
                ..FilterConfig::default()
            })
        };
        let corpus: [&[&str]; 3] = [
            &["cat", "dog", "cat"],
            &["dog", "fish"],
            &["cat", "fish", "fish", "dog"],
        ];

        let mut left = build();
        let mut right = build();
        for doc in corpus {
            left.ingest_document(doc).unwrap();
            right.ingest_document(doc).unwrap();
        }

        assert_eq!(
            left.topic_report(usize::MAX).to_string(),
            right.topic_report(usize::MAX).to_string()
        );
        assert_eq!(left.weights(), right.weights());
    }
}
