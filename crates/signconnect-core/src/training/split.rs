//! Stratified train/validation split.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Sample indices assigned to each side of the split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
}

/// Splits sample indices so every class keeps its proportion on both sides.
///
/// Each class contributes `round(n * fraction)` samples to validation, but
/// always keeps at least one for training. Both sides are returned sorted.
#[must_use]
pub fn stratified_split(targets: &[u32], fraction: f32, rng: &mut StdRng) -> Split {
    let mut by_class: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, &t) in targets.iter().enumerate() {
        by_class.entry(t).or_default().push(i);
    }

    let mut split = Split::default();
    for (_, mut indices) in by_class {
        indices.shuffle(rng);
        let n_val = val_count(indices.len(), fraction);
        split.val.extend_from_slice(&indices[..n_val]);
        split.train.extend_from_slice(&indices[n_val..]);
    }

    split.train.sort_unstable();
    split.val.sort_unstable();
    split
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn val_count(n: usize, fraction: f32) -> usize {
    let wanted = (n as f32 * fraction).round() as usize;
    wanted.min(n.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn targets(counts: &[usize]) -> Vec<u32> {
        counts
            .iter()
            .enumerate()
            .flat_map(|(class, &n)| std::iter::repeat(class as u32).take(n))
            .collect()
    }

    #[test]
    fn test_every_sample_lands_on_one_side() {
        let t = targets(&[20, 7, 13]);
        let split = stratified_split(&t, 0.15, &mut StdRng::seed_from_u64(42));

        let mut all: Vec<usize> = split.train.iter().chain(&split.val).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..t.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_stratified() {
        let t = targets(&[20, 40]);
        let split = stratified_split(&t, 0.15, &mut StdRng::seed_from_u64(42));

        let val_of = |class: u32| split.val.iter().filter(|&&i| t[i] == class).count();
        assert_eq!(val_of(0), 3);
        assert_eq!(val_of(1), 6);
    }

    #[test]
    fn test_singleton_class_stays_in_training() {
        let t = targets(&[1, 10]);
        let split = stratified_split(&t, 0.5, &mut StdRng::seed_from_u64(42));
        assert!(split.train.contains(&0));
    }

    #[test]
    fn test_zero_fraction_has_no_validation() {
        let t = targets(&[5, 5]);
        let split = stratified_split(&t, 0.0, &mut StdRng::seed_from_u64(1));
        assert!(split.val.is_empty());
        assert_eq!(split.train.len(), 10);
    }

    #[test]
    fn test_same_seed_same_split() {
        let t = targets(&[30, 30, 30]);
        let a = stratified_split(&t, 0.15, &mut StdRng::seed_from_u64(42));
        let b = stratified_split(&t, 0.15, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
