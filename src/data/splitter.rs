// ============================================================
// Layer 4 — Train/Validation/Test Splitter
// ============================================================
// Used when no index lists are supplied: the scanned pairs are
// shuffled with a seeded RNG and cut into three contiguous
// slices.
//
// The seed makes the split reproducible, which matters because
// `evaluate` rebuilds the test set from the saved config long
// after training finished.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `items` with `seed` and split into (train, valid, test).
///
/// `train_fraction` and `valid_fraction` are proportions of the total;
/// the test split receives whatever remains.
pub fn split_three_way<T>(
    mut items:      Vec<T>,
    train_fraction: f64,
    valid_fraction: f64,
    seed:           u64,
) -> (Vec<T>, Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let total     = items.len();
    let train_end = ((total as f64) * train_fraction).round() as usize;
    let train_end = train_end.min(total);
    let valid_end = (train_end + ((total as f64) * valid_fraction).round() as usize).min(total);

    // split_off(n) removes elements [n..] and returns them
    let test  = items.split_off(valid_end);
    let valid = items.split_off(train_end);

    tracing::debug!(
        "Dataset split: {} train, {} valid, {} test",
        items.len(),
        valid.len(),
        test.len(),
    );

    (items, valid, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..20000).collect();
        let (train, valid, test) = split_three_way(items, 0.7, 0.05, 1);
        assert_eq!(train.len(), 14000);
        assert_eq!(valid.len(), 1000);
        assert_eq!(test.len(),  5000);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, valid, test) = split_three_way(items, 0.6, 0.3, 9);
        let mut all: Vec<usize> = train.into_iter().chain(valid).chain(test).collect();
        all.sort();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_three_way((0..30).collect::<Vec<u32>>(), 0.5, 0.2, 42);
        let b = split_three_way((0..30).collect::<Vec<u32>>(), 0.5, 0.2, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let (train, valid, test) = split_three_way(Vec::<usize>::new(), 0.8, 0.1, 0);
        assert!(train.is_empty() && valid.is_empty() && test.is_empty());
    }

    #[test]
    fn test_fractions_over_one_are_clamped() {
        let (train, valid, test) = split_three_way((0..10).collect::<Vec<u8>>(), 0.9, 0.5, 3);
        assert_eq!(train.len(), 9);
        assert_eq!(valid.len(), 1);
        assert!(test.is_empty());
    }
}
