//! Per-document and corpus-wide topic occupancy counts.

use std::collections::HashMap;

use crate::{Topic, WordId};

/// Topic occupancy of a single document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentCounts {
    by_topic: Vec<usize>,
    total: usize,
}

impl DocumentCounts {
    /// Zeroed counts over `topics` topics.
    #[must_use]
    pub fn new(topics: usize) -> Self {
        Self {
            by_topic: vec![0; topics],
            total: 0,
        }
    }

    /// Record one word assigned to `topic`.
    pub fn add(&mut self, topic: Topic) {
        self.by_topic[topic] += 1;
        self.total += 1;
    }

    /// Move one occurrence from `old` to `new`; the total is unchanged.
    ///
    /// The decrement saturates at zero, so a caller holding a stale `old`
    /// cannot underflow the counts.
    pub fn resample_update(&mut self, old: Topic, new: Topic) {
        self.by_topic[old] = self.by_topic[old].saturating_sub(1);
        self.by_topic[new] += 1;
    }

    /// Words of this document assigned to `topic`.
    #[must_use]
    pub fn count(&self, topic: Topic) -> usize {
        self.by_topic[topic]
    }

    /// Words of this document counted so far.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Number of topics tracked.
    #[must_use]
    pub fn topics(&self) -> usize {
        self.by_topic.len()
    }

    /// Zero every count for the next document.
    pub fn reset(&mut self) {
        self.by_topic.fill(0);
        self.total = 0;
    }
}

/// Corpus-wide word-topic counts of one particle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalCounts {
    by_word: HashMap<(WordId, Topic), usize>,
    by_topic: Vec<usize>,
}

impl GlobalCounts {
    /// Empty counts over `topics` topics.
    #[must_use]
    pub fn new(topics: usize) -> Self {
        Self {
            by_word: HashMap::new(),
            by_topic: vec![0; topics],
        }
    }

    /// Record one occurrence of `word` assigned to `topic`.
    pub fn add(&mut self, word: WordId, topic: Topic) {
        *self.by_word.entry((word, topic)).or_insert(0) += 1;
        self.by_topic[topic] += 1;
    }

    /// Move one occurrence of `word` from `old` to `new`.
    ///
    /// The `(word, old)` key is dropped when its count reaches zero, so the
    /// map only ever holds live pairs.
    pub fn resample_update(&mut self, word: WordId, old: Topic, new: Topic) {
        if let Some(count) = self.by_word.get_mut(&(word, old)) {
            *count -= 1;
            if *count == 0 {
                self.by_word.remove(&(word, old));
            }
        }
        self.by_topic[old] = self.by_topic[old].saturating_sub(1);

        *self.by_word.entry((word, new)).or_insert(0) += 1;
        self.by_topic[new] += 1;
    }

    /// Occurrences of `word` assigned to `topic`; zero when never assigned.
    #[must_use]
    pub fn count(&self, word: WordId, topic: Topic) -> usize {
        self.by_word.get(&(word, topic)).copied().unwrap_or(0)
    }

    /// Total words assigned to `topic`, over the whole corpus.
    #[must_use]
    pub fn total(&self, topic: Topic) -> usize {
        self.by_topic[topic]
    }

    /// Number of topics tracked.
    #[must_use]
    pub fn topics(&self) -> usize {
        self.by_topic.len()
    }
}
