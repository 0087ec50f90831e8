//! An image classifier that runs a pre-trained model and turns its raw
//! scores into a ranked, filtered list of labeled predictions.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use image_classifier::{Classifier, ClassifierOptions};
//! use ndarray::Array3;
//!
//! let mut classifier = Classifier::builder()
//!     .with_model_path("model1.onnx")
//!     .with_options(
//!         ClassifierOptions::default()
//!             .with_max_results(1)
//!             .with_preprocess(true)
//!     )
//!     .build()?;
//!
//! let image = Array3::<u8>::zeros((256, 256, 3));
//! let results = classifier.classify(image.view())?;
//! println!("Top prediction: {:?}", results.first());
//! # Ok(())
//! # }
//! ```
//!
//! # Labels
//!
//! Output position `i` is the score for label `i`. Models named `model1`,
//! `model2` and `model3` get builtin label tables (see [`BuiltinModel`]);
//! any other model needs [`ClassifierBuilder::with_labels`] or
//! [`ClassifierBuilder::with_labels_file`], otherwise its catalog is empty
//! and `classify` fails with [`ClassifierError::LabelOutOfRange`].
//!
//! # Custom engines
//!
//! The ONNX Runtime binding ([`OrtEngine`]) is one implementation of
//! [`InferenceEngine`]; [`Classifier::from_engine`] accepts any other.

pub mod classifier;
mod labels;
mod runtime;

pub use classifier::{
    Category, Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo, ClassifierOptions,
    ElementType, InferenceEngine, InputGeometry, InputTensor, Normalization, Postprocessor,
    Preprocessor, QuantizationParams, RawScores, TensorDetails, TensorLayout,
};
pub use labels::{BuiltinModel, LabelCatalog};
pub use runtime::{
    accelerator_library, create_session_builder, current_platform, OrtEngine, RuntimeConfig,
    OUTPUT_SCALE_KEY, OUTPUT_ZERO_POINT_KEY,
};

pub fn init_logger() {
    env_logger::init();
}
