use anyhow::{bail, Result};
use candle_core::{DType, Device, Tensor};

/// Mean over the unmasked tokens of each row, then L2 normalisation: `[B,T,H]` with a `[B,T]` mask → `[B,H]`.
/// Padding never changes a row's result, so a batch pools to the same vectors as its members alone.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, seq_len, _) = hidden.dims3()?;
    let (mask_batch, mask_len) = attention_mask.dims2()?;
    if (mask_batch, mask_len) != (batch, seq_len) {
        bail!("mask shape [{mask_batch}, {mask_len}] does not match hidden [{batch}, {seq_len}, _]");
    }
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    // fully masked rows pool to zero
    let counts = mask.sum_keepdim(1)?.maximum(1f64)?;
    let mean = summed.broadcast_div(&counts)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(1e-12f64)?;
    Ok(mean.broadcast_div(&norm)?)
}

/// Pooled `[B,H]` tensor as host-side rows.
pub fn pooled_rows(pooled: &Tensor) -> Result<Vec<Vec<f32>>> {
    Ok(pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?)
}
