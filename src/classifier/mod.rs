pub mod engine;
pub mod mobilenet;

pub use engine::{ClassifierEngine, Prediction, IMG_SIZE};
pub use mobilenet::MobileNetV2;
