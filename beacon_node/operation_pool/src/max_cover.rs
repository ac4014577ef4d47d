/// Trait for types that we can compute a maximum cover for.
///
/// Terminology:
/// * `item`: something that implements this trait
/// * `element`: something contained in a set, and covered by the covering set of an item
/// * `object`: something extracted from an item in order to comprise a solution
///
/// See: <https://en.wikipedia.org/wiki/Maximum_coverage_problem>
pub trait MaxCover {
    /// The result type, of which we would eventually like a collection of maximal quality.
    type Object;
    /// The type used to represent sets.
    type Set: Clone;

    /// Extract an object for inclusion in a solution.
    fn object(&self) -> Self::Object;

    /// Get the set of elements covered.
    fn covering_set(&self) -> &Self::Set;
    /// Update the set of items covered, for the inclusion of some object in the solution.
    fn update_covering_set(&mut self, max_obj: &Self::Object, max_set: &Self::Set);
    /// The quality of this item's covering set, usually its cardinality.
    fn score(&self) -> usize;
}

/// Compute an approximate maximum cover using a greedy algorithm.
pub fn maximum_cover<I, T>(items_iter: I, limit: usize) -> Vec<T::Object>
where
    I: IntoIterator<Item = T>,
    T: MaxCover,
{
    // Construct an initial vec of all items, discarding 0-score items.
    let mut all_items: Vec<_> = items_iter
        .into_iter()
        .filter(|x| x.score() != 0)
        .collect();

    let mut result = vec![];

    for _ in 0..limit {
        // Select the item with the maximum score.
        let (best_item, best_cover) = match all_items
            .iter()
            .max_by_key(|x| x.score())
            .map(|x| (x.object(), x.covering_set().clone()))
        {
            Some(x) => x,
            None => return result,
        };

        // Update the covering sets of the other items, for the inclusion of the selected item.
        // Items covered by the selected item can't be re-covered.
        all_items
            .iter_mut()
            .for_each(|x| x.update_covering_set(&best_item, &best_cover));
        all_items.retain(|x| x.score() != 0);

        result.push(best_item);
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;
    use std::iter::FromIterator;

    impl MaxCover for HashSet<usize> {
        type Object = Self;
        type Set = Self;

        fn object(&self) -> Self {
            self.clone()
        }

        fn covering_set(&self) -> &Self {
            self
        }

        fn update_covering_set(&mut self, _: &Self, other: &Self) {
            let mut difference = &*self - other;
            std::mem::swap(self, &mut difference);
        }

        fn score(&self) -> usize {
            self.len()
        }
    }

    #[test]
    fn zero_limit() {
        let cover = maximum_cover(vec![HashSet::from_iter(0..10)], 0);
        assert_eq!(cover.len(), 0);
    }

    #[test]
    fn overlapping_sets_converge_to_disjoint_solution() {
        let sets: Vec<HashSet<usize>> = vec![
            HashSet::from_iter(0..10),
            HashSet::from_iter(5..15),
            HashSet::from_iter(10..20),
        ];

        let cover = maximum_cover(sets, 2);
        assert_eq!(cover.len(), 2);

        let union: HashSet<usize> = cover.iter().flatten().copied().collect();
        assert_eq!(union, HashSet::from_iter(0..20));
    }

    #[test]
    fn subset_is_never_chosen() {
        let sets: Vec<HashSet<usize>> = vec![
            HashSet::from_iter(0..10),
            HashSet::from_iter(2..8),
            HashSet::from_iter(10..20),
        ];

        let cover = maximum_cover(sets, 3);
        // The subset's score drops to zero after the first selection and it is discarded.
        assert_eq!(cover.len(), 2);
    }
}
