//! Sampling primitives shared by the per-word updates.

use rand::Rng;

use crate::error::{Error, Result};

/// Normalize non-negative masses into a cumulative distribution, in place.
///
/// The final entry is forced to exactly `1.0` so accumulated rounding can
/// never leave the tail unreachable.
///
/// # Errors
/// [`Error::DegenerateDistribution`] when `xs` is empty or its total mass is
/// zero, negative, or non-finite.
pub fn normalize_to_cdf(xs: &mut [f64]) -> Result<()> {
    let mass: f64 = xs.iter().sum();
    if xs.is_empty() || !mass.is_finite() || mass <= 0.0 {
        return Err(Error::DegenerateDistribution { mass });
    }

    let mut acc = 0.0;
    for x in xs.iter_mut() {
        acc += *x;
        *x = acc / mass;
    }
    *xs.last_mut().expect("non-empty by the mass check") = 1.0;
    Ok(())
}

/// Draw an index from a cumulative distribution: the least `i` with
/// `cdf[i] >= u` for `u ~ U[0, 1)`.
///
/// # Errors
/// [`Error::EmptyDistribution`] when `cdf` is empty.
pub fn sample_categorical<R: Rng>(cdf: &[f64], rng: &mut R) -> Result<usize> {
    if cdf.is_empty() {
        return Err(Error::EmptyDistribution);
    }
    if cdf.len() == 1 {
        return Ok(0);
    }

    let u: f64 = rng.random();
    Ok(cdf.partition_point(|&c| c < u).min(cdf.len() - 1))
}

/// Uniform sample of `k` items without replacement.
///
/// Returns the whole slice when `k >= xs.len()`. The order of the result is
/// unspecified.
pub fn sample_without_replacement<T: Clone, R: Rng>(xs: &[T], k: usize, rng: &mut R) -> Vec<T> {
    if k >= xs.len() {
        return xs.to_vec();
    }
    rand::seq::index::sample(rng, xs.len(), k)
        .iter()
        .map(|i| xs[i].clone())
        .collect()
}

/// Euclidean norm of `xs`.
#[must_use]
pub fn l2_norm(xs: &[f64]) -> f64 {
    xs.iter().map(|x| x * x).sum::<f64>().sqrt()
}
