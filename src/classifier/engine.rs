use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::ops::softmax;
use candle_nn::VarBuilder;
use std::path::Path;

use super::mobilenet::MobileNetV2;

/// Input side length the packaging model was trained at.
pub const IMG_SIZE: usize = 128;

#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
    /// Per-class softmax scores, in class-table order.
    pub scores: Vec<(String, f32)>,
}

pub struct ClassifierEngine {
    model: MobileNetV2,
    classes: Vec<String>,
    device: Device,
}

impl ClassifierEngine {
    /// Load the fine-tuned weights from a safetensors file.
    pub fn new(weights: &Path, classes: Vec<String>) -> Result<Self> {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        println!("🧠 Loading packaging classifier on device: {:?}", device);

        let tensors = candle_core::safetensors::load(weights, &device)
            .with_context(|| format!("Failed to read model weights at {}", weights.display()))?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        Self::from_varbuilder(vb, classes, device)
    }

    /// Build from an arbitrary weight source (embedded tensors, test zeros).
    pub fn from_varbuilder(vb: VarBuilder, classes: Vec<String>, device: Device) -> Result<Self> {
        if classes.is_empty() {
            return Err(anyhow!("Classifier needs at least one class name"));
        }
        let model = MobileNetV2::load(vb, classes.len())?;
        Ok(Self {
            model,
            classes,
            device,
        })
    }

    /// Decode and shape an image file into the NCHW tensor the model expects.
    /// The training recipe rescales by 1/255 only, no mean/std normalization.
    pub fn preprocess(&self, path: &Path) -> Result<Tensor> {
        let img = image::open(path)
            .with_context(|| format!("Image not found or unreadable: {}", path.display()))?
            .resize_exact(
                IMG_SIZE as u32,
                IMG_SIZE as u32,
                image::imageops::FilterType::Triangle,
            )
            .to_rgb8();

        let data = img.into_raw();
        let tensor = Tensor::from_vec(data, (IMG_SIZE, IMG_SIZE, 3), &self.device)?
            .permute((2, 0, 1))?;
        let tensor = (tensor.to_dtype(DType::F32)? / 255.)?;
        Ok(tensor.unsqueeze(0)?)
    }

    pub fn predict(&self, path: &Path) -> Result<Prediction> {
        let input = self.preprocess(path)?;
        self.predict_tensor(&input)
    }

    pub fn predict_tensor(&self, input: &Tensor) -> Result<Prediction> {
        let logits = self.model.forward(input)?;
        let probs = softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()?;

        let mut best = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }

        let scores = self
            .classes
            .iter()
            .cloned()
            .zip(probs.iter().copied())
            .collect();

        Ok(Prediction {
            label: self.classes[best].clone(),
            confidence: probs[best],
            scores,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}
