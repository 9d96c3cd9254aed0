use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

// XLM-RoBERTa vocabulary
const PAD_TOKEN_ID: u32 = 1;

/// Row-major token ids and attention mask for `batch` sequences of `seq_len` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub ids: Vec<u32>,
    pub mask: Vec<u32>,
    pub batch: usize,
    pub seq_len: usize,
}

impl EncodedBatch {
    /// Truncates each `(ids, mask)` pair to `max_len` and right-pads every row to the
    /// longest remaining one.
    pub fn from_sequences(sequences: Vec<(Vec<u32>, Vec<u32>)>, max_len: usize) -> Self {
        let batch = sequences.len();
        let seq_len = sequences.iter().map(|(ids, _)| ids.len().min(max_len)).max().unwrap_or(0).max(1);
        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for (row_ids, row_mask) in sequences {
            let len = row_ids.len().min(seq_len);
            ids.extend_from_slice(&row_ids[..len]);
            ids.resize(ids.len() + seq_len - len, PAD_TOKEN_ID);
            mask.extend(row_mask.iter().copied().chain(std::iter::repeat(1)).take(len));
            mask.resize(mask.len() + seq_len - len, 0);
        }
        Self { ids, mask, batch, seq_len }
    }

    /// `[batch, seq_len]` id and mask tensors.
    pub fn to_tensors(&self, device: &Device) -> Result<(Tensor, Tensor)> {
        let shape = (self.batch, self.seq_len);
        let ids = Tensor::from_slice(&self.ids, shape, device)?;
        let mask = Tensor::from_slice(&self.mask, shape, device)?;
        Ok((ids, mask))
    }
}

pub fn encode_batch(tokenizer: &Tokenizer, texts: &[&str], max_len: usize) -> Result<EncodedBatch> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let sequences = encodings
        .iter()
        .map(|enc| (enc.get_ids().to_vec(), enc.get_attention_mask().to_vec()))
        .collect();
    Ok(EncodedBatch::from_sequences(sequences, max_len))
}
