//! Repeated values and gaps in integer sequences

use std::hash::Hash;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};

/// Values that occur more than once, grouped by value in order of first
/// appearance. Each repeated value is listed once per occurrence, or once
/// overall with `distinct`.
pub fn duplicates<T, I>(source: I, distinct: bool) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut counts: IndexMap<T, usize, FxBuildHasher> = IndexMap::default();
    for item in source {
        *counts.entry(item).or_insert(0) += 1;
    }

    let mut out = Vec::new();
    for (value, count) in counts.into_iter().filter(|(_, n)| *n > 1) {
        let copies = if distinct { 1 } else { count };
        out.extend(std::iter::repeat(value).take(copies));
    }
    out
}

/// Repeated values with the 0-based positions at which they occur
pub fn duplicates_with_indices<T, I>(source: I) -> Vec<(T, Vec<usize>)>
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
{
    let mut positions: IndexMap<T, Vec<usize>, FxBuildHasher> = IndexMap::default();
    for (idx, item) in source.into_iter().enumerate() {
        positions.entry(item).or_default().push(idx);
    }
    positions.into_iter().filter(|(_, at)| at.len() > 1).collect()
}

/// Integers in `[min, max)` of the source's projected values that the source
/// lacks, ascending, each passed through `selector`
pub fn missing_elements<S, R, I, F, G>(source: I, to_int: F, selector: G) -> Vec<R>
where
    I: IntoIterator<Item = S>,
    F: Fn(&S) -> i64,
    G: Fn(i64) -> R,
{
    let present: FxHashSet<i64> = source.into_iter().map(|s| to_int(&s)).collect();
    let (Some(&min), Some(&max)) = (present.iter().min(), present.iter().max()) else {
        return Vec::new();
    };
    (min..max)
        .filter(|n| !present.contains(n))
        .map(selector)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates() {
        let words = ["a", "a", "c", "b", "a", "b"];

        assert_eq!(duplicates(words, true), vec!["a", "b"]);
        assert_eq!(duplicates(words, false), vec!["a", "a", "a", "b", "b"]);
        assert!(duplicates(["x", "y"], false).is_empty());
    }

    #[test]
    fn test_duplicates_with_indices() {
        let found = duplicates_with_indices([3, 1, 3, 2, 1, 3]);
        assert_eq!(found, vec![(3, vec![0, 2, 5]), (1, vec![1, 4])]);
    }

    #[test]
    fn test_missing_elements() {
        let ids = [7415, 7416, 7418, 7421, 7423];
        let missing = missing_elements(ids, |&n| n, |n| n);
        assert_eq!(missing, vec![7417, 7419, 7420, 7422]);
    }

    #[test]
    fn test_missing_elements_with_projection() {
        let invoices = ["INV-3", "INV-1", "INV-5"];
        let missing = missing_elements(
            invoices,
            |s| s.trim_start_matches("INV-").parse().unwrap_or(0),
            |n| format!("INV-{}", n),
        );
        assert_eq!(missing, vec!["INV-2", "INV-4"]);
    }

    #[test]
    fn test_missing_elements_degenerate() {
        assert!(missing_elements(Vec::<i64>::new(), |&n| n, |n| n).is_empty());
        assert!(missing_elements([4, 4], |&n| n, |n| n).is_empty());
    }
}
