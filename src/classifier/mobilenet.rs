//! MobileNetV2 with the transfer-learning head used by the packaging model:
//! frozen backbone, global average pool, a 64-wide ReLU layer and a logits
//! layer sized to the class list. Weights load from safetensors exported by
//! the training pipeline; tensor names follow the `stem`/`blocks.N`/`head`/
//! `fc1`/`fc2` scheme below.

use candle_core::{Module, Result, Tensor, D};
use candle_nn::{
    batch_norm, conv2d_no_bias, linear, BatchNorm, Conv2d, Conv2dConfig, Linear, VarBuilder,
};

/// Bottleneck settings (expansion, output channels, repeats, first stride).
const BLOCK_SETTINGS: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

const HEAD_CHANNELS: usize = 1280;
const HIDDEN_UNITS: usize = 64;

#[derive(Debug)]
struct ConvBnBlock {
    conv: Conv2d,
    bn: BatchNorm,
    relu6: bool,
}

fn conv_bn(
    vb: VarBuilder,
    in_c: usize,
    out_c: usize,
    kernel: usize,
    stride: usize,
    groups: usize,
    relu6: bool,
) -> Result<ConvBnBlock> {
    let cfg = Conv2dConfig {
        stride,
        padding: kernel / 2,
        groups,
        ..Default::default()
    };
    let conv = conv2d_no_bias(in_c, out_c, kernel, cfg, vb.pp("conv"))?;
    let bn = batch_norm(out_c, 1e-3, vb.pp("bn"))?;
    Ok(ConvBnBlock { conv, bn, relu6 })
}

impl Module for ConvBnBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = xs.apply(&self.conv)?.apply_t(&self.bn, false)?;
        if self.relu6 {
            xs.clamp(0f32, 6f32)
        } else {
            Ok(xs)
        }
    }
}

#[derive(Debug)]
struct InvertedResidual {
    expand: Option<ConvBnBlock>,
    depthwise: ConvBnBlock,
    project: ConvBnBlock,
    skip: bool,
}

fn inverted_residual(
    vb: VarBuilder,
    in_c: usize,
    out_c: usize,
    expansion: usize,
    stride: usize,
) -> Result<InvertedResidual> {
    let hidden = in_c * expansion;
    let expand = if expansion != 1 {
        Some(conv_bn(vb.pp("expand"), in_c, hidden, 1, 1, 1, true)?)
    } else {
        None
    };
    let depthwise = conv_bn(vb.pp("depthwise"), hidden, hidden, 3, stride, hidden, true)?;
    let project = conv_bn(vb.pp("project"), hidden, out_c, 1, 1, 1, false)?;
    Ok(InvertedResidual {
        expand,
        depthwise,
        project,
        skip: stride == 1 && in_c == out_c,
    })
}

impl Module for InvertedResidual {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = match &self.expand {
            Some(expand) => xs.apply(expand)?,
            None => xs.clone(),
        };
        let ys = ys.apply(&self.depthwise)?.apply(&self.project)?;
        if self.skip {
            xs + ys
        } else {
            Ok(ys)
        }
    }
}

#[derive(Debug)]
pub struct MobileNetV2 {
    stem: ConvBnBlock,
    blocks: Vec<InvertedResidual>,
    head: ConvBnBlock,
    fc1: Linear,
    fc2: Linear,
}

impl MobileNetV2 {
    pub fn load(vb: VarBuilder, nclasses: usize) -> Result<Self> {
        let stem = conv_bn(vb.pp("stem"), 3, 32, 3, 2, 1, true)?;

        let mut blocks = Vec::new();
        let mut in_c = 32;
        let mut idx = 0;
        for &(expansion, out_c, repeats, stride) in BLOCK_SETTINGS.iter() {
            for i in 0..repeats {
                let s = if i == 0 { stride } else { 1 };
                blocks.push(inverted_residual(
                    vb.pp(format!("blocks.{idx}")),
                    in_c,
                    out_c,
                    expansion,
                    s,
                )?);
                in_c = out_c;
                idx += 1;
            }
        }

        let head = conv_bn(vb.pp("head"), in_c, HEAD_CHANNELS, 1, 1, 1, true)?;
        let fc1 = linear(HEAD_CHANNELS, HIDDEN_UNITS, vb.pp("fc1"))?;
        let fc2 = linear(HIDDEN_UNITS, nclasses, vb.pp("fc2"))?;

        Ok(Self {
            stem,
            blocks,
            head,
            fc1,
            fc2,
        })
    }
}

impl Module for MobileNetV2 {
    /// Input is NCHW float, already rescaled. Output is raw logits.
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut ys = xs.apply(&self.stem)?;
        for block in self.blocks.iter() {
            ys = ys.apply(block)?;
        }
        let ys = ys.apply(&self.head)?.mean(D::Minus1)?.mean(D::Minus1)?;
        ys.apply(&self.fc1)?.relu()?.apply(&self.fc2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_forward_shape() -> Result<()> {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let model = MobileNetV2::load(vb, 3)?;
        let input = Tensor::zeros((1, 3, 128, 128), DType::F32, &Device::Cpu)?;
        let logits = model.forward(&input)?;
        assert_eq!(logits.dims(), &[1, 3]);
        Ok(())
    }

    #[test]
    fn test_block_count_matches_settings() -> Result<()> {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let model = MobileNetV2::load(vb, 5)?;
        let repeats: usize = BLOCK_SETTINGS.iter().map(|s| s.2).sum();
        assert_eq!(model.blocks.len(), repeats);
        Ok(())
    }
}
