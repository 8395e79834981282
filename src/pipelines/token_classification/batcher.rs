use std::{collections::BTreeMap, ops::Range, sync::Arc};

use burn::{
    data::dataloader,
    tensor::{backend::Backend, Bool, Int, Tensor},
};
use derive_new::new;

use crate::{
    tokenization::SubwordTokenizer,
    utils::{classes::invert_map, tensors},
};

use super::{Aligner, BatchAlignment, Item};

/// An inference batch for token classification
///
/// Rejected sentences have no row. `indices` maps each row back to its input position, so
/// predictions can be read per word through `word_spans`.
#[derive(Debug, Clone, new)]
pub struct Infer<B: Backend> {
    /// Subword ids as 2D tensor: [batch_size, seq_length]
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask containing `true` at padding locations
    pub mask_pad: Tensor<B, 2, Bool>,

    /// `true` at the first subword of each word, where predictions are read
    pub tag_mask: Tensor<B, 2, Bool>,

    /// The input position of the sentence behind each row
    pub indices: Vec<usize>,

    /// Subword positions of each word, per row
    pub word_spans: Vec<Vec<Range<usize>>>,

    /// Input positions of the sentences left out of the batch
    pub rejected: Vec<usize>,
}

/// A training batch for token classification
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Model input
    pub input: Infer<B>,

    /// Class ids for the batch, the no-tag id outside carrier positions
    pub targets: Tensor<B, 2, Int>,
}

/// Struct for batching token classification items
///
/// Sentences the aligner rejects are logged and left out of the batch.
pub struct Batcher<B: Backend, Tok: SubwordTokenizer> {
    /// Aligner for expanding word tags onto subwords
    aligner: Arc<Aligner<Tok>>,

    /// A mapping from class name labels to class ids
    pub label2id: BTreeMap<String, usize>,

    /// A mapping from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,

    /// The class id given to markers, continuation subwords, padding and unknown labels
    pub no_tag_id: usize,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend, Tok: SubwordTokenizer> Batcher<B, Tok> {
    /// Creates a new batcher, numbering the labels in the given order
    pub fn new(
        aligner: Arc<Aligner<Tok>>,
        labels: &[String],
        no_tag_id: usize,
        device: B::Device,
    ) -> Self {
        let id2label: BTreeMap<usize, String> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (i, label.trim().to_string()))
            .collect();

        let label2id = invert_map(id2label.clone());

        Self {
            aligner,
            label2id,
            id2label,
            no_tag_id,
            device,
        }
    }

    /// Align tagged items, with `None` for positions without a known class
    pub fn align<I: Item>(&self, items: &[I]) -> BatchAlignment<Option<usize>> {
        let sentences: Vec<(Vec<&str>, Vec<Option<usize>>)> = items
            .iter()
            .map(|item| {
                let tags = item.tags().into_iter().map(|tag| self.label_id(tag)).collect();
                (item.words(), tags)
            })
            .collect();

        self.aligner.align_batch(&sentences, None)
    }

    /// Build an inference batch from an alignment
    pub fn infer_batch<T>(&self, alignment: &BatchAlignment<T>) -> Infer<B> {
        self.to_infer(alignment, alignment.batch.tag_mask.clone())
    }

    /// Build a training batch from an alignment of class ids
    ///
    /// Words whose label is not in the label map keep the no-tag id and lose their carrier bit.
    pub fn train_batch(&self, alignment: &BatchAlignment<Option<usize>>) -> Train<B> {
        let batch = &alignment.batch;

        let tag_mask = batch
            .tags
            .iter()
            .zip(&batch.tag_mask)
            .map(|(tags, mask)| {
                tags.iter()
                    .zip(mask)
                    .map(|(tag, carrier)| *carrier && tag.is_some())
                    .collect()
            })
            .collect();

        let targets = batch
            .tags
            .iter()
            .map(|row| {
                row.iter()
                    .map(|id| id.unwrap_or(self.no_tag_id) as i64)
                    .collect()
            })
            .collect();

        Train {
            input: self.to_infer(alignment, tag_mask),
            targets: tensors::int_rows::<B>(targets, batch.seq_length, &self.device),
        }
    }

    fn to_infer<T>(&self, alignment: &BatchAlignment<T>, tag_mask: Vec<Vec<bool>>) -> Infer<B> {
        let batch = &alignment.batch;
        let seq_length = batch.seq_length;

        let tokens = batch
            .token_ids
            .iter()
            .map(|row| row.iter().map(|id| *id as i64).collect())
            .collect();

        let mask_pad = batch
            .attention_mask
            .iter()
            .map(|row| row.iter().map(|present| !present).collect())
            .collect();

        Infer {
            tokens: tensors::int_rows::<B>(tokens, seq_length, &self.device),
            mask_pad: tensors::bool_rows::<B>(mask_pad, seq_length, &self.device),
            tag_mask: tensors::bool_rows::<B>(tag_mask, seq_length, &self.device),
            indices: batch.indices.clone(),
            word_spans: batch.word_spans.clone(),
            rejected: alignment.rejected.iter().map(|(index, _)| *index).collect(),
        }
    }

    fn label_id(&self, label: &str) -> Option<usize> {
        let id = self.label2id.get(label).copied();
        if id.is_none() {
            log::debug!("Unknown label {:?}, the word carries no tag", label);
        }

        id
    }
}

impl<B: Backend, Tok: SubwordTokenizer> Clone for Batcher<B, Tok> {
    fn clone(&self) -> Self {
        Self {
            aligner: self.aligner.clone(),
            label2id: self.label2id.clone(),
            id2label: self.id2label.clone(),
            no_tag_id: self.no_tag_id,
            device: self.device.clone(),
        }
    }
}

/// Implement Batcher trait for Batcher struct for inference on whitespace-separated text
impl<B: Backend, Tok: SubwordTokenizer> dataloader::batcher::Batcher<String, Infer<B>>
    for Batcher<B, Tok>
{
    /// Collects a vector of sentences into an inference batch
    fn batch(&self, items: Vec<String>) -> Infer<B> {
        let sentences: Vec<(Vec<&str>, Vec<()>)> = items
            .iter()
            .map(|text| {
                let words: Vec<&str> = text.split_whitespace().collect();
                let tags = vec![(); words.len()];
                (words, tags)
            })
            .collect();

        self.infer_batch(&self.aligner.align_batch(&sentences, ()))
    }
}

/// Implement Batcher trait for Batcher struct for training
impl<B: Backend, Tok: SubwordTokenizer, I: Item> dataloader::batcher::Batcher<I, Train<B>>
    for Batcher<B, Tok>
{
    /// Collects a vector of token classification items into a training batch
    fn batch(&self, items: Vec<I>) -> Train<B> {
        self.train_batch(&self.align(&items))
    }
}
