use std::cmp::Ordering;

/// Group the items of `iter` by the key computed with `f`. Groups come out in
/// ascending key order; inside a group, items keep the order they were yielded in.
pub fn group_by_key<T, K, F>(iter: impl Iterator<Item = T>, mut f: F) -> Vec<Vec<T>>
where
    F: FnMut(&T) -> K,
    K: Ord,
{
    use std::collections::BTreeMap;
    let mut groups: BTreeMap<K, Vec<T>> = Default::default();
    for i in iter {
        let key = f(&i);
        groups.entry(key).or_default().push(i);
    }
    groups.into_values().collect()
}

/// Stable ranking of the indices `0..n` by the key computed with `f`.
/// Equal keys are ranked by ascending index.
pub fn rank_by_key<K, F>(n: usize, f: F) -> Vec<usize>
where
    F: FnMut(&usize) -> K,
    K: Ord,
{
    group_by_key(0..n, f).into_iter().flatten().collect()
}

/// Like `rank_by_key`, but larger keys come first. Equal keys are still
/// ranked by ascending index.
pub fn rank_by_key_desc<K, F>(n: usize, mut f: F) -> Vec<usize>
where
    F: FnMut(&usize) -> K,
    K: Ord,
{
    let mut rank: Vec<usize> = (0..n).collect();
    rank.sort_by(|a, b| match f(b).cmp(&f(a)) {
        Ordering::Equal => a.cmp(b),
        ord => ord,
    });
    rank
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_keeps_insertion_order() {
        let groups = group_by_key(vec![(3, 'a'), (1, 'b'), (3, 'c'), (2, 'd')].into_iter(), |x| x.0);
        assert_eq!(
            groups,
            vec![vec![(1, 'b')], vec![(2, 'd')], vec![(3, 'a'), (3, 'c')]]
        );
    }

    #[test]
    fn rank_breaks_ties_by_index() {
        let keys = [5, 1, 5, 0, 1];
        assert_eq!(rank_by_key(keys.len(), |&i| keys[i]), vec![3, 1, 4, 0, 2]);
        assert_eq!(rank_by_key_desc(keys.len(), |&i| keys[i]), vec![0, 2, 1, 4, 3]);
    }
}
