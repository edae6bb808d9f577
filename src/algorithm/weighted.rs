//! Weighted categorical choice
//!
//! The single primitive every weighted layer of the sampler goes through.
//! Items whose weight is absent, negative or not finite are removed first.
//! When the remaining weights sum to zero the choice falls back to a uniform
//! draw over the remaining items, so an all-zero layer still yields a value.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

/// Pick an index in `0..len` according to `weights`.
///
/// `weights[i]` belongs to item `i`; indices past the end of `weights` count
/// as absent. Returns `None` when no item has a usable weight.
pub fn choose_weighted_index<R: Rng + ?Sized>(
    weights: &[Option<f64>],
    len: usize,
    rng: &mut R,
) -> Option<usize> {
    let candidates: Vec<(usize, f64)> = (0..len)
        .filter_map(|i| {
            weights
                .get(i)
                .copied()
                .flatten()
                .filter(|w| w.is_finite() && *w >= 0.0)
                .map(|w| (i, w))
        })
        .collect();

    if candidates.is_empty() {
        return None;
    }

    let total: f64 = candidates.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        let pick = rng.random_range(0..candidates.len());
        return Some(candidates[pick].0);
    }

    match WeightedIndex::new(candidates.iter().map(|(_, w)| *w)) {
        Ok(dist) => Some(candidates[dist.sample(rng)].0),
        Err(e) => {
            // Only reachable through float overflow of the total
            log::debug!("Weighted index rejected weights ({e}), using uniform choice");
            let pick = rng.random_range(0..candidates.len());
            Some(candidates[pick].0)
        }
    }
}

/// Pick one item of `items` according to the parallel `weights`
pub fn weighted_choice<'a, T, R: Rng + ?Sized>(
    items: &'a [T],
    weights: &[Option<f64>],
    rng: &mut R,
) -> Option<&'a T> {
    choose_weighted_index(weights, items.len(), rng).map(|i| &items[i])
}
