//! A single weighted hypothesis over the topics of all observed words.

use itertools::Itertools;
use rand::Rng;

use crate::data::assignments::AssignmentStore;
use crate::data::counts::{DocumentCounts, GlobalCounts};
use crate::error::Result;
use crate::numerics::{normalize_to_cdf, sample_categorical, sample_without_replacement};
use crate::{NodeId, Slot, Topic, WordId};

/// Retained word positions eligible for rejuvenation.
///
/// Documents carry their words already resolved to vocabulary ids; the
/// driver bounds the in-flight document to its observed prefix and truncates
/// the flat position list to the number of words observed so far.
#[derive(Clone, Debug, Default)]
pub struct RejuvenationWindow {
    docs: Vec<(Slot, Vec<WordId>)>,
    positions: Vec<(usize, usize)>,
}

impl RejuvenationWindow {
    /// Enumerate `(document, position)` pairs over `docs`, keeping at most
    /// `limit` of them.
    #[must_use]
    pub fn new(docs: Vec<(Slot, Vec<WordId>)>, limit: usize) -> Self {
        let mut positions = Vec::new();
        'docs: for (index, (_, words)) in docs.iter().enumerate() {
            for position in 0..words.len() {
                if positions.len() == limit {
                    break 'docs;
                }
                positions.push((index, position));
            }
        }
        Self { docs, positions }
    }

    /// Number of eligible word positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// One particle: a topic assignment hypothesis with its importance weight.
///
/// The particle owns deep copies of its count structures and a node in the
/// shared [`AssignmentStore`]; assignments made before the particle was
/// split off its parent are read through the store's parent chain.
#[derive(Clone, Debug)]
pub struct Particle {
    weight: f64,
    node: NodeId,
    alpha: f64,
    beta: f64,
    global: GlobalCounts,
    doc: DocumentCounts,
}

impl Particle {
    pub(crate) fn new(node: NodeId, topics: usize, alpha: f64, beta: f64, weight: f64) -> Self {
        Self {
            weight,
            node,
            alpha,
            beta,
            global: GlobalCounts::new(topics),
            doc: DocumentCounts::new(topics),
        }
    }

    /// Deep copy with a fresh store node; used when the population is
    /// resampled.
    pub(crate) fn duplicate(&self, node: NodeId) -> Self {
        Self {
            node,
            global: self.global.clone(),
            doc: self.doc.clone(),
            ..*self
        }
    }

    /// Unnormalized posterior mass of `topic` for `word` given `doc`, with
    /// the vocabulary size at the moment of observation.
    #[allow(clippy::cast_precision_loss)]
    fn posterior_mass(
        &self,
        doc: &DocumentCounts,
        word: WordId,
        topic: Topic,
        vocab_size: usize,
    ) -> f64 {
        let topics = doc.topics() as f64;
        let word_part = (self.global.count(word, topic) as f64 + self.beta)
            / (self.global.total(topic) as f64 + vocab_size as f64 * self.beta);
        let doc_part = (doc.count(topic) as f64 + self.alpha)
            / (doc.total() as f64 + topics * self.alpha);
        word_part * doc_part
    }

    /// Scale the weight by the predictive probability of `word`:
    /// the posterior mass summed over every topic.
    pub fn reweight(&mut self, word: WordId, vocab_size: usize) {
        let mass: f64 = (0..self.topics())
            .map(|topic| self.posterior_mass(&self.doc, word, topic, vocab_size))
            .sum();
        self.weight *= mass;
    }

    /// Sample a topic for the word at `position` of the current document
    /// and commit it to the counts. Retained documents also record the
    /// draw in the assignment store.
    ///
    /// # Errors
    /// [`crate::Error::DegenerateDistribution`] when the posterior mass has
    /// underflowed to zero for every topic.
    pub fn transition<R: Rng>(
        &mut self,
        position: usize,
        word: WordId,
        slot: Option<Slot>,
        store: &mut AssignmentStore,
        vocab_size: usize,
        rng: &mut R,
    ) -> Result<Topic> {
        let mut masses: Vec<f64> = (0..self.topics())
            .map(|topic| self.posterior_mass(&self.doc, word, topic, vocab_size))
            .collect();
        normalize_to_cdf(&mut masses)?;
        let topic = sample_categorical(&masses, rng)?;

        self.global.add(word, topic);
        self.doc.add(topic);
        if let Some(slot) = slot {
            store.set(self.node, slot, position, topic)?;
        }
        Ok(topic)
    }

    /// Reset the current-document counts for a document of `len` words;
    /// retained documents are registered with the assignment store.
    pub fn begin_document(
        &mut self,
        slot: Option<Slot>,
        len: usize,
        store: &mut AssignmentStore,
    ) -> Result<()> {
        self.doc.reset();
        if let Some(slot) = slot {
            store.new_document(self.node, slot, len)?;
        }
        Ok(())
    }

    /// One MCMC rejuvenation pass: a fresh without-replacement batch of
    /// retained positions, each resampled from the posterior that excludes
    /// its current assignment. Changed draws move the counts and rewrite
    /// the stored assignment.
    ///
    /// Counts for a non-current reservoir document are reconstructed from
    /// the stored assignments; positions of the document currently being
    /// ingested update the live document counts instead.
    pub fn rejuvenate<R: Rng>(
        &mut self,
        window: &RejuvenationWindow,
        batch: usize,
        current_slot: Option<Slot>,
        store: &mut AssignmentStore,
        vocab_size: usize,
        rng: &mut R,
    ) -> Result<()> {
        if window.is_empty() || batch == 0 {
            return Ok(());
        }

        let mut picks = sample_without_replacement(&window.positions, batch, rng);
        picks.sort_unstable();

        let groups = picks.iter().chunk_by(|(index, _)| *index);
        for (index, group) in &groups {
            let (slot, words) = &window.docs[index];

            let mut rebuilt;
            let doc: &mut DocumentCounts = if current_slot == Some(*slot) {
                &mut self.doc
            } else {
                rebuilt = rebuild_document_counts(
                    &*store,
                    self.node,
                    *slot,
                    words.len(),
                    self.global.topics(),
                )?;
                &mut rebuilt
            };

            for &(_, position) in group {
                let word = words[position];
                let old = store.get(self.node, *slot, position)?;
                let new = incremental_draw(
                    &self.global,
                    doc,
                    self.alpha,
                    self.beta,
                    word,
                    old,
                    vocab_size,
                    rng,
                )?;
                if new != old {
                    self.global.resample_update(word, old, new);
                    doc.resample_update(old, new);
                    store.set(self.node, *slot, position, new)?;
                }
            }
        }
        Ok(())
    }

    /// Current importance weight.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// This particle's node in the assignment forest.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Number of topics.
    #[must_use]
    pub fn topics(&self) -> usize {
        self.global.topics()
    }

    /// Corpus-wide word-topic counts.
    #[must_use]
    pub const fn global(&self) -> &GlobalCounts {
        &self.global
    }

    /// Counts of the document currently being ingested.
    #[must_use]
    pub const fn document(&self) -> &DocumentCounts {
        &self.doc
    }
}

/// Replay the stored assignments of one reservoir document into counts.
fn rebuild_document_counts(
    store: &AssignmentStore,
    node: NodeId,
    slot: Slot,
    len: usize,
    topics: usize,
) -> Result<DocumentCounts> {
    let mut counts = DocumentCounts::new(topics);
    for position in 0..len {
        counts.add(store.get(node, slot, position)?);
    }
    Ok(counts)
}

/// Draw a topic for one retained position from the incremental posterior:
/// the usual update with the position's current assignment `old` removed
/// from every count it touches, clamped at zero.
#[allow(clippy::cast_precision_loss, clippy::too_many_arguments)]
fn incremental_draw<R: Rng>(
    global: &GlobalCounts,
    doc: &DocumentCounts,
    alpha: f64,
    beta: f64,
    word: WordId,
    old: Topic,
    vocab_size: usize,
    rng: &mut R,
) -> Result<Topic> {
    let topics = doc.topics();
    let doc_total = doc.total().saturating_sub(1) as f64;

    let mut masses = Vec::with_capacity(topics);
    for topic in 0..topics {
        let exclude = usize::from(topic == old);
        let word_count = global.count(word, topic).saturating_sub(exclude) as f64;
        let topic_total = global.total(topic).saturating_sub(exclude) as f64;
        let doc_count = doc.count(topic).saturating_sub(exclude) as f64;

        let word_part = (word_count + beta) / (topic_total + vocab_size as f64 * beta);
        let doc_part = (doc_count + alpha) / (doc_total + topics as f64 * alpha);
        masses.push(word_part * doc_part);
    }

    normalize_to_cdf(&mut masses)?;
    sample_categorical(&masses, rng)
}
