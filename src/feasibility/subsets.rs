//! Bounded enumeration of item removals for the exact covering check.
//!
//! [`KSubsets`] walks the `k`-element index sets of `0..n` in lexicographic
//! order, one index vector at a time, so the check never holds more than the
//! current removal in memory.

use crate::error::InputError;

/// Lexicographic walk over the `k`-subsets of `0..n`.
///
/// `[0, 1, .., k-1]` comes first and `[n-k, .., n-1]` last. Yields nothing
/// when `k` is zero or larger than `n`.
#[derive(Debug, Clone)]
pub struct KSubsets {
    n: usize,
    current: Option<Vec<usize>>,
}

impl KSubsets {
    pub fn new(n: usize, k: usize) -> Self {
        let current = (k > 0 && k <= n).then(|| (0..k).collect());
        Self { n, current }
    }

    /// Advance `indices` to its lexicographic successor, or return false
    /// when it already is the last subset.
    fn advance(indices: &mut [usize], n: usize) -> bool {
        let k = indices.len();
        // rightmost slot that can still move right
        let Some(slot) = (0..k).rev().find(|&i| indices[i] < n - k + i) else {
            return false;
        };
        indices[slot] += 1;
        for i in slot + 1..k {
            indices[i] = indices[i - 1] + 1;
        }
        true
    }
}

impl Iterator for KSubsets {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.current.take()?;
        let mut successor = current.clone();
        if Self::advance(&mut successor, self.n) {
            self.current = Some(successor);
        }
        Some(current)
    }
}

/// Binomial coefficient, saturating at `u128::MAX`.
pub fn n_choose_k(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result = 1u128;
    for i in 0..k {
        result = match result.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    result
}

/// Exact covering check: after removing any `n_removed` items, the remaining
/// counts must still sum to at least `requirement`.
///
/// Enumerates all `C(len, n_removed)` removals, so it is exponential in the
/// number of items; fails with [`InputError::EnumerationTooLarge`] instead of
/// running past `max_subsets`.
pub fn covers_after_any_removal(
    counts: &[usize],
    n_removed: usize,
    requirement: usize,
    max_subsets: u128,
) -> Result<bool, InputError> {
    let total: usize = counts.iter().sum();
    if n_removed == 0 {
        return Ok(total >= requirement);
    }
    let subsets = n_choose_k(counts.len(), n_removed);
    if subsets > max_subsets {
        return Err(InputError::EnumerationTooLarge {
            subsets,
            limit: max_subsets,
        });
    }

    for removed in KSubsets::new(counts.len(), n_removed) {
        let removed_sum: usize = removed.iter().map(|&i| counts[i]).sum();
        if total - removed_sum < requirement {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_subsets_in_lexicographic_order() {
        let subsets: Vec<Vec<usize>> = KSubsets::new(4, 2).collect();
        assert_eq!(
            subsets,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
    }

    #[test]
    fn subset_count_matches_binomial() {
        for n in 1..=9 {
            for k in 1..=n {
                let all: Vec<Vec<usize>> = KSubsets::new(n, k).collect();
                assert_eq!(all.len() as u128, n_choose_k(n, k), "n={n} k={k}");
                assert!(all.windows(2).all(|w| w[0] < w[1]), "n={n} k={k} not strictly increasing");
                assert!(all.iter().all(|s| s.len() == k && s.windows(2).all(|p| p[0] < p[1])));
            }
        }
    }

    #[test]
    fn empty_when_k_out_of_range() {
        assert_eq!(KSubsets::new(2, 4).count(), 0);
        assert_eq!(KSubsets::new(2, 0).count(), 0);
        assert_eq!(KSubsets::new(3, 3).collect::<Vec<_>>(), vec![vec![0, 1, 2]]);
    }

    /// Every bit pattern with `len - n_removed` kept items, summed directly.
    fn covers_by_bitmask(counts: &[usize], n_removed: usize, requirement: usize) -> bool {
        let len = counts.len();
        if n_removed > len {
            return true;
        }
        (0u32..1 << len)
            .filter(|mask| mask.count_ones() as usize == len - n_removed)
            .all(|mask| {
                let kept: usize = (0..len).filter(|i| mask & (1 << i) != 0).map(|i| counts[i]).sum();
                kept >= requirement
            })
    }

    #[test]
    fn covering_check_agrees_with_bitmask_recount() {
        let cases: [&[usize]; 6] = [
            &[1, 4, 2],
            &[3, 0, 0, 3, 1],
            &[2, 2, 2, 1],
            &[5, 1, 1, 1, 1, 1],
            &[0, 0, 7, 2, 2, 3, 1],
            &[4, 4, 4, 4],
        ];
        for counts in cases {
            let total: usize = counts.iter().sum();
            for n_removed in 0..=counts.len() + 1 {
                for requirement in 0..=total + 1 {
                    assert_eq!(
                        covers_after_any_removal(counts, n_removed, requirement, 1_000).unwrap(),
                        covers_by_bitmask(counts, n_removed, requirement),
                        "counts {counts:?}, removing {n_removed}, requirement {requirement}"
                    );
                }
            }
        }
    }

    #[test]
    fn binomials() {
        assert_eq!(n_choose_k(5, 2), 10);
        assert_eq!(n_choose_k(5, 6), 0);
        assert_eq!(n_choose_k(40, 20), 137_846_528_820);
        assert_eq!(n_choose_k(500, 250), u128::MAX);
    }

    #[test]
    fn covering_check() {
        // removing the single largest count (4) leaves 3
        assert!(covers_after_any_removal(&[1, 4, 2], 1, 3, 100).unwrap());
        assert!(!covers_after_any_removal(&[1, 4, 2], 1, 4, 100).unwrap());
        assert!(covers_after_any_removal(&[1, 4, 2], 0, 7, 100).unwrap());
        // more removals than items leaves nothing to enumerate
        assert!(covers_after_any_removal(&[1], 2, 5, 100).unwrap());
    }

    #[test]
    fn enumeration_limit() {
        let counts = vec![1; 30];
        assert!(matches!(
            covers_after_any_removal(&counts, 15, 1, 1000),
            Err(InputError::EnumerationTooLarge { limit: 1000, .. })
        ));
    }
}
