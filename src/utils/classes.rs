use std::{collections::BTreeSet, hash::Hash};

/// Invert a map by swapping keys and values
pub fn invert_map<K, V, MK, MV>(original: MK) -> MV
where
    K: Ord + Hash + Eq,
    V: Ord + Hash + Eq + Clone,
    MK: IntoIterator<Item = (K, V)>,
    MV: FromIterator<(V, K)>,
{
    original
        .into_iter()
        .map(|(key, value)| (value, key))
        .collect()
}

/// Collect the distinct class labels in sorted order
pub fn distinct_labels<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    labels
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_invert_map() {
        let id2label: BTreeMap<usize, String> =
            [(0, "O".to_string()), (1, "B-PER".to_string())].into();

        let label2id: BTreeMap<String, usize> = invert_map(id2label);

        assert_eq!(label2id.get("B-PER"), Some(&1));
        assert_eq!(label2id.get("O"), Some(&0));
    }

    #[test]
    fn test_distinct_labels() {
        assert_eq!(
            distinct_labels(["O", "B-PER", "O", "I-PER"]),
            vec!["B-PER", "I-PER", "O"]
        );
    }
}
