/// Accuracy over the positions selected by a mask, such as the tag carriers of a batch
///
/// Returns `None` when the mask selects nothing.
pub fn masked_accuracy<T: PartialEq>(
    predictions: &[Vec<T>],
    targets: &[Vec<T>],
    mask: &[Vec<bool>],
) -> Option<f64> {
    let mut total = 0usize;
    let mut correct = 0usize;

    for ((predicted, expected), selected) in predictions.iter().zip(targets).zip(mask) {
        for ((p, t), s) in predicted.iter().zip(expected).zip(selected) {
            if *s {
                total += 1;
                if p == t {
                    correct += 1;
                }
            }
        }
    }

    (total > 0).then(|| correct as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_masked_positions_count() {
        let predictions = vec![vec![0, 5, 1, 7], vec![0, 2, 9, 9]];
        let targets = vec![vec![0, 5, 0, 3], vec![0, 2, 0, 0]];
        let mask = vec![
            vec![false, true, false, true],
            vec![false, true, false, false],
        ];

        assert_eq!(masked_accuracy(&predictions, &targets, &mask), Some(2.0 / 3.0));
    }

    #[test]
    fn test_empty_mask() {
        let predictions = vec![vec![1]];
        let mask = vec![vec![false]];

        assert_eq!(masked_accuracy(&predictions, &predictions, &mask), None);
    }
}
