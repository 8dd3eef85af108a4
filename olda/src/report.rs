//! Plain-text topic reporting.

use std::fmt;

use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::vocabulary::Vocabulary;
use crate::population::ParticleStore;
use crate::Topic;

/// Words of one topic ranked by within-topic probability.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TopicWords {
    /// The topic index.
    pub topic: Topic,
    /// `(probability, word)` pairs, descending by probability; ties broken
    /// by word so the ordering is reproducible.
    pub words: Vec<(f64, String)>,
}

/// Ranked topics of one particle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleTopics {
    /// Index of the particle in the population.
    pub particle: usize,
    /// One entry per topic.
    pub topics: Vec<TopicWords>,
}

/// Per-particle, per-topic word rankings.
///
/// `Display` renders the persisted plain-text artifact: one header line per
/// `(particle, topic)` pair followed by indented `(probability, word)`
/// lines.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TopicReport {
    /// One entry per particle, in population order.
    pub particles: Vec<ParticleTopics>,
}

impl TopicReport {
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn new(
        population: &ParticleStore,
        vocabulary: &Vocabulary,
        beta: f64,
        top_n: usize,
    ) -> Self {
        let vocab_size = vocabulary.len();
        let particles = population
            .particles()
            .iter()
            .enumerate()
            .map(|(index, particle)| {
                let topics = (0..particle.topics())
                    .map(|topic| {
                        let denominator =
                            particle.global().total(topic) as f64 + vocab_size as f64 * beta;
                        let words = (0..vocab_size)
                            .map(|word| {
                                let probability = (particle.global().count(word, topic) as f64
                                    + beta)
                                    / denominator;
                                let token = vocabulary
                                    .word(word)
                                    .expect("vocabulary ids are dense")
                                    .to_owned();
                                (probability, token)
                            })
                            .sorted_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)))
                            .take(top_n)
                            .collect();
                        TopicWords { topic, words }
                    })
                    .collect();
                ParticleTopics {
                    particle: index,
                    topics,
                }
            })
            .collect();
        Self { particles }
    }
}

impl fmt::Display for TopicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for particle in &self.particles {
            for topic in &particle.topics {
                writeln!(f, "particle {}, topic {}", particle.particle, topic.topic)?;
                for (probability, word) in &topic.words {
                    writeln!(f, "    ({probability:.6}, {word})")?;
                }
            }
        }
        Ok(())
    }
}
