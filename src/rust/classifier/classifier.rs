use std::path::{Path, PathBuf};

use log::debug;
use ndarray::ArrayView3;

use super::category::Category;
use super::engine::{InferenceEngine, InputGeometry};
use super::error::ClassifierError;
use super::options::ClassifierOptions;
use super::postprocess::Postprocessor;
use super::preprocess::Preprocessor;
use crate::{LabelCatalog, OrtEngine};

/// An image classifier: one model, its label catalog, and fixed options.
///
/// # Concurrency
///
/// `classify` writes into the engine's input and output buffers, so it takes
/// `&mut self`. A classifier serves one caller at a time; to share one across
/// threads, wrap it in a `Mutex`. `Classifier<OrtEngine>` is `Send`.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use image_classifier::{Classifier, ClassifierOptions};
/// use ndarray::Array3;
///
/// let options = ClassifierOptions::default()
///     .with_max_results(2)
///     .with_preprocess(true);
/// let mut classifier = Classifier::new("model2.onnx", options)?;
///
/// let image = Array3::<u8>::zeros((480, 640, 3));
/// for category in classifier.classify(image.view())? {
///     println!("{}: {:.2}", category.label, category.score);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Classifier<E: InferenceEngine = OrtEngine> {
    model_path: Option<PathBuf>,
    engine: E,
    preprocessor: Preprocessor,
    postprocessor: Postprocessor,
    quantized_input: bool,
    quantized_output: bool,
}

// Compile-time verification that a classifier can move between threads
const _: () = {
    fn assert_send<T: Send>() {}
    fn verify_send() {
        assert_send::<Classifier<OrtEngine>>();
    }
};

impl Classifier<OrtEngine> {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Loads a model with builtin labels resolved from its file name.
    ///
    /// # Errors
    /// - `ValidationError` if the options are invalid
    /// - `BuildError` if the model file is missing or fails to load
    /// - `ModelError` if the model's input or output is not usable
    pub fn new(model_path: impl AsRef<Path>, options: ClassifierOptions) -> Result<Self, ClassifierError> {
        Self::builder()
            .with_model_path(model_path.as_ref())
            .with_options(options)
            .build()
    }
}

impl<E: InferenceEngine> Classifier<E> {
    /// Wires a classifier around an already loaded engine.
    ///
    /// # Errors
    /// - `ValidationError` if the options are invalid
    /// - `ModelError` if the engine's input is not a fixed-size 3-channel image
    /// - `BuildError` if the output is quantized but reports no parameters
    pub fn from_engine(
        engine: E,
        labels: LabelCatalog,
        options: ClassifierOptions,
    ) -> Result<Self, ClassifierError> {
        options.validate()?;

        let input = engine.input_details();
        let output = engine.output_details();
        let geometry = InputGeometry::from_shape(&input.shape)?;
        let quantized_input = input.is_quantized();
        let quantized_output = output.is_quantized();

        if quantized_output && output.quantization.is_none() {
            return Err(ClassifierError::BuildError(format!(
                "Output tensor '{}' is quantized but has no quantization parameters",
                output.name
            )));
        }
        let output_quantization = output.quantization;

        let preprocessor = Preprocessor::new(geometry, quantized_input, options.normalization);
        let postprocessor = Postprocessor::new(labels, options, output_quantization);

        Ok(Self {
            model_path: None,
            engine,
            preprocessor,
            postprocessor,
            quantized_input,
            quantized_output,
        })
    }

    pub(crate) fn with_model_path(mut self, model_path: PathBuf) -> Self {
        self.model_path = Some(model_path);
        self
    }

    /// Classifies an `H x W x 3` RGB image.
    ///
    /// With `preprocess` enabled the image is resized (and normalized for
    /// float models); otherwise it must already match the model input size.
    /// Results are sorted by descending score and filtered by the options.
    ///
    /// # Errors
    /// - `ShapeMismatch` if the image does not fit the model input
    /// - `ModelError` if the forward pass fails
    /// - `LabelOutOfRange` if the model outputs more scores than there are labels
    pub fn classify(&mut self, image: ArrayView3<u8>) -> Result<Vec<Category>, ClassifierError> {
        let input = if self.postprocessor.options().preprocess {
            self.preprocessor.preprocess(image)?
        } else {
            self.preprocessor.to_input(image)?
        };

        self.engine.set_input(input)?;
        self.engine.invoke()?;
        let raw = self.engine.output()?;
        debug!("Raw output: {:?}", raw);

        self.postprocessor.postprocess(&raw)
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        let geometry = self.preprocessor.geometry();
        super::ClassifierInfo {
            model_path: self.model_path.clone(),
            num_labels: self.labels().len(),
            input_height: geometry.height,
            input_width: geometry.width,
            input_layout: geometry.layout,
            quantized_input: self.quantized_input,
            quantized_output: self.quantized_output,
        }
    }

    pub fn labels(&self) -> &LabelCatalog {
        self.postprocessor.labels()
    }

    pub fn options(&self) -> &ClassifierOptions {
        self.postprocessor.options()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}
