//! Longest increasing subsequence for move minimization.

/// Positions (ascending) of a longest strictly increasing subsequence of
/// `seq`, ignoring `0` entries.
///
/// In the keyed diff `seq[i]` is `old index + 1` of the node now at new
/// position `i`, or `0` for a freshly mounted node. Nodes on the returned
/// positions keep their relative order and never move.
///
/// O(n log n): patience sorting with predecessor links.
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    // tails[k] = position of the smallest tail of an increasing run of length k+1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        if value == 0 {
            continue;
        }
        if let Some(&last) = tails.last() {
            if seq[last] < value {
                prev[i] = Some(last);
                tails.push(i);
                continue;
            }
        } else {
            tails.push(i);
            continue;
        }
        // First tail whose value is >= value.
        let at = tails.partition_point(|&t| seq[t] < value);
        if at > 0 {
            prev[i] = Some(tails[at - 1]);
        }
        tails[at] = i;
    }

    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn values(seq: &[usize], positions: &[usize]) -> Vec<usize> {
        positions.iter().map(|&p| seq[p]).collect()
    }

    #[test]
    fn test_empty_and_zeros() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
        assert!(longest_increasing_subsequence(&[0, 0]).is_empty());
    }

    #[test]
    fn test_sorted_keeps_everything() {
        assert_eq!(longest_increasing_subsequence(&[1, 2, 3, 4]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_single_move() {
        // old [a b c d], new [b c a d]
        let seq = [2, 3, 1, 4];
        let lis = longest_increasing_subsequence(&seq);
        assert_eq!(values(&seq, &lis), vec![2, 3, 4]);
    }

    #[test]
    fn test_skips_new_nodes() {
        let seq = [3, 0, 1, 2, 0];
        let lis = longest_increasing_subsequence(&seq);
        assert_eq!(values(&seq, &lis), vec![1, 2]);
    }

    #[test]
    fn test_reversed() {
        let seq = [5, 4, 3, 2, 1];
        assert_eq!(longest_increasing_subsequence(&seq).len(), 1);
    }

    #[test]
    fn test_classic() {
        let seq = [3, 1, 5, 2, 6, 4, 9];
        let lis = longest_increasing_subsequence(&seq);
        assert_eq!(lis.len(), 4);
        let v = values(&seq, &lis);
        assert!(v.windows(2).all(|w| w[0] < w[1]));
    }

    /// Quadratic reference length.
    fn lis_len(seq: &[usize]) -> usize {
        let mut best = vec![0usize; seq.len()];
        for i in 0..seq.len() {
            if seq[i] == 0 {
                continue;
            }
            best[i] = 1 + (0..i)
                .filter(|&j| seq[j] != 0 && seq[j] < seq[i])
                .map(|j| best[j])
                .max()
                .unwrap_or(0);
        }
        best.into_iter().max().unwrap_or(0)
    }

    proptest! {
        #[test]
        fn test_matches_reference(seq in prop::collection::vec(0usize..32, 0..40)) {
            let lis = longest_increasing_subsequence(&seq);
            prop_assert_eq!(lis.len(), lis_len(&seq));
            prop_assert!(lis.windows(2).all(|w| w[0] < w[1]));
            let v = values(&seq, &lis);
            prop_assert!(v.iter().all(|&x| x != 0));
            prop_assert!(v.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
