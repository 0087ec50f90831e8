use std::path::PathBuf;

mod error;
mod category;
mod options;
pub(crate) mod engine;
mod preprocess;
mod postprocess;
#[allow(clippy::module_inception)]
mod classifier;
pub mod builder;

pub use error::ClassifierError;
pub use category::Category;
pub use options::{ClassifierOptions, Normalization};
pub use engine::{
    ElementType, InferenceEngine, InputGeometry, InputTensor, QuantizationParams, RawScores,
    TensorDetails, TensorLayout,
};
pub use preprocess::Preprocessor;
pub use postprocess::Postprocessor;
pub use classifier::Classifier;
pub use builder::ClassifierBuilder;

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Path to the model file, if the classifier loaded one
    pub model_path: Option<PathBuf>,
    /// Number of labels in the catalog
    pub num_labels: usize,
    /// Height the model expects its input image to have
    pub input_height: usize,
    /// Width the model expects its input image to have
    pub input_width: usize,
    /// Whether the input batch is channels-last or channels-first
    pub input_layout: TensorLayout,
    /// Whether the input tensor holds 8-bit quantized values
    pub quantized_input: bool,
    /// Whether the output tensor holds 8-bit quantized values
    pub quantized_output: bool,
}
