//! Masked language model inputs and pseudo-log-likelihood scoring
//!
//! A sentence is scored by masking each of its subwords in turn and summing the log probability
//! the model gives the original subword at the masked position. The model itself is supplied
//! by the caller.

use derive_new::new;

use crate::tokenization::SpecialTokens;

/// A copy of a sequence with one position masked
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MaskedInput {
    /// The sequence with `position` replaced by the mask id
    pub token_ids: Vec<u32>,

    /// The masked position
    pub position: usize,

    /// The id that was masked
    pub target: u32,
}

/// Mask every non-special position of a sequence, one copy per position
pub fn masked_copies(token_ids: &[u32], specials: &SpecialTokens) -> Vec<MaskedInput> {
    token_ids
        .iter()
        .enumerate()
        .filter(|(_, id)| !specials.contains(**id) || **id == specials.unknown)
        .map(|(position, &target)| {
            let mut masked = token_ids.to_vec();
            masked[position] = specials.mask;

            MaskedInput::new(masked, position, target)
        })
        .collect()
}

/// Sum the log probability of each masked target
///
/// `log_prob` receives a masked copy and returns the model's log probability of its target at
/// the masked position.
pub fn pseudo_log_likelihood<F>(inputs: &[MaskedInput], mut log_prob: F) -> f64
where
    F: FnMut(&MaskedInput) -> f64,
{
    inputs.iter().map(|input| log_prob(input)).sum()
}
