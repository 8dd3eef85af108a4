//! End-to-end inference on a small two-topic corpus in the style of the
//! Steyvers-Griffiths "river bank / money bank" example.

use olda::{FilterConfig, ParticleFilterLda};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rv::dist::Categorical;
use rv::traits::Sampleable;

const VOCAB: [&str; 5] = ["river", "stream", "bank", "money", "loan"];
const DOC_LEN: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Money,
    Nature,
    Mixed,
}

/// Sixteen documents: six purely financial, six mixed, four purely
/// riparian, each sampled from its topic-word distribution.
fn synthesize(seed: u64) -> Vec<(Kind, Vec<&'static str>)> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let money = Categorical::new(&[0.0, 0.0, 0.3, 0.35, 0.35]).unwrap();
    let nature = Categorical::new(&[0.35, 0.35, 0.3, 0.0, 0.0]).unwrap();

    let mut corpus = Vec::with_capacity(16);
    for index in 0..16 {
        let kind = match index {
            0..=5 => Kind::Money,
            6..=11 => Kind::Mixed,
            _ => Kind::Nature,
        };
        let tokens = (0..DOC_LEN)
            .map(|_| {
                let dist = match kind {
                    Kind::Money => &money,
                    Kind::Nature => &nature,
                    Kind::Mixed => {
                        if rng.random::<bool>() {
                            &money
                        } else {
                            &nature
                        }
                    }
                };
                let word: usize = dist.draw(&mut rng);
                VOCAB[word]
            })
            .collect();
        corpus.push((kind, tokens));
    }

    // Present the documents in shuffled order, under the same seed
    // discipline the engine itself uses.
    corpus.shuffle(&mut rng);
    corpus
}

fn config() -> FilterConfig {
    FilterConfig {
        topics: 2,
        alpha: 0.1,
        beta: 0.1,
        reservoir_capacity: 16,
        particles: 5,
        ess_threshold: 2.0,
        rejuvenation_batch: 100,
        rejuvenation_steps: 20,
        seed: 10,
    }
}

fn ingest_all(
    engine: &mut ParticleFilterLda,
    corpus: &[(Kind, Vec<&'static str>)],
) -> Vec<(Kind, usize)> {
    corpus
        .iter()
        .map(|(kind, tokens)| {
            let slot = engine
                .ingest_document(tokens)
                .expect("ingest should not collapse")
                .expect("all sixteen documents fit the reservoir");
            (*kind, slot)
        })
        .collect()
}

#[test]
fn single_topic_documents_concentrate_on_one_topic() {
    let corpus = synthesize(10);
    let mut engine = ParticleFilterLda::new(config());
    let slots = ingest_all(&mut engine, &corpus);

    // Tally per-word assignments of the purely financial documents across
    // every particle.
    let mut by_topic = [0usize; 2];
    for &(kind, slot) in &slots {
        if kind != Kind::Money {
            continue;
        }
        for labels in engine.per_document_labels(slot).unwrap() {
            for topic in labels {
                by_topic[topic] += 1;
            }
        }
    }

    let total = by_topic[0] + by_topic[1];
    assert_eq!(total, 6 * DOC_LEN * 5);

    // Which of the two labels won is decided by the filter; the documents
    // must agree with each other either way.
    let majority = by_topic[0].max(by_topic[1]);
    let purity = majority as f64 / total as f64;
    assert!(
        purity >= 0.8,
        "single-topic documents split across topics: purity {purity:.3}, tallies {by_topic:?}"
    );
}

#[test]
fn counts_stay_consistent_after_heavy_rejuvenation() {
    let corpus = synthesize(10);
    let mut engine = ParticleFilterLda::new(config());
    ingest_all(&mut engine, &corpus);

    let words_total = 16 * DOC_LEN;
    assert_eq!(engine.words_seen(), words_total);

    for particle in engine.particles() {
        // Every observed word holds exactly one assignment.
        let assigned: usize = (0..2).map(|t| particle.global().total(t)).sum();
        assert_eq!(assigned, words_total);

        // Per-topic totals agree with the word-topic map.
        for topic in 0..2 {
            let from_words: usize = (0..engine.vocabulary().len())
                .map(|w| particle.global().count(w, topic))
                .sum();
            assert_eq!(from_words, particle.global().total(topic));
        }
    }

    let weight_sum: f64 = engine.weights().iter().sum();
    assert::close(weight_sum, 1.0, 1e-9);
}

#[test]
fn identical_engines_render_identical_reports() {
    let corpus = synthesize(10);

    let mut left = ParticleFilterLda::new(config());
    let mut right = ParticleFilterLda::new(config());
    ingest_all(&mut left, &corpus);
    ingest_all(&mut right, &corpus);

    assert_eq!(
        left.topic_report(usize::MAX).to_string(),
        right.topic_report(usize::MAX).to_string()
    );
    assert_eq!(left.weights(), right.weights());
    assert_eq!(
        left.effective_sample_size(),
        right.effective_sample_size()
    );
}
