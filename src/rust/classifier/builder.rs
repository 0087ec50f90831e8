use std::path::PathBuf;

use log::{error, info};

use super::classifier::Classifier;
use super::engine::QuantizationParams;
use super::error::ClassifierError;
use super::options::ClassifierOptions;
use crate::runtime::RuntimeConfig;
use crate::{LabelCatalog, OrtEngine};

/// Where the label catalog comes from
#[derive(Debug, Clone)]
enum LabelSource {
    /// Builtin table selected by the model file's identifier
    Builtin,
    Explicit(LabelCatalog),
    File(PathBuf),
}

/// A builder for constructing a Classifier with a fluent interface.
#[derive(Debug, Clone)]
pub struct ClassifierBuilder {
    model_path: Option<PathBuf>,
    labels: LabelSource,
    options: ClassifierOptions,
    runtime_config: Option<RuntimeConfig>,
    output_quantization: Option<QuantizationParams>,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default options
    ///
    /// # Example
    /// ```
    /// use image_classifier::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            model_path: None,
            labels: LabelSource::Builtin,
            options: ClassifierOptions::default(),
            runtime_config: None,
            output_quantization: None,
        }
    }

    /// Sets the path of the model file to load
    pub fn with_model_path(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    pub fn with_options(mut self, options: ClassifierOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses these labels instead of the builtin table for the model
    ///
    /// # Example
    /// ```
    /// use image_classifier::{ClassifierBuilder, LabelCatalog};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_model_path("pets.onnx")
    ///     .with_labels(LabelCatalog::new(vec!["cat", "dog"]));
    /// ```
    pub fn with_labels(mut self, labels: LabelCatalog) -> Self {
        self.labels = LabelSource::Explicit(labels);
        self
    }

    /// Reads labels from a file (one per line) when the classifier is built
    pub fn with_labels_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.labels = LabelSource::File(path.into());
        self
    }

    /// Sets the runtime configuration for ONNX model execution.
    ///
    /// Without it, the configuration is derived from the options
    /// (`num_threads`, `enable_edgetpu`).
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = Some(config);
        self
    }

    /// Dequantization parameters for a `u8` model output, taking precedence
    /// over the model metadata
    pub fn with_output_quantization(mut self, scale: f32, zero_point: i32) -> Self {
        self.output_quantization = Some(QuantizationParams::new(scale, zero_point));
        self
    }

    /// Builds and returns the final Classifier instance
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - The constructed Classifier if successful, or an error if:
    ///   - No model path is set or the file does not exist
    ///   - The options are invalid
    ///   - The labels file cannot be read
    ///   - The model fails to load, or the EdgeTPU accelerator is requested
    ///   - The model's input is not a fixed-size 3-channel image
    ///
    /// # Example
    /// ```no_run
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use image_classifier::{ClassifierBuilder, ClassifierOptions};
    ///
    /// let classifier = ClassifierBuilder::new()
    ///     .with_model_path("model3.onnx")
    ///     .with_options(ClassifierOptions::default().with_max_results(5))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        let model_path = self
            .model_path
            .ok_or_else(|| ClassifierError::BuildError("Model path must be set".to_string()))?;
        if model_path.as_os_str().is_empty() {
            return Err(ClassifierError::BuildError("Model path cannot be empty".to_string()));
        }
        if !model_path.exists() {
            return Err(ClassifierError::BuildError(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        self.options.validate()?;
        info!("model name: {}", model_path.display());

        let labels = match self.labels {
            LabelSource::Builtin => LabelCatalog::for_model_path(&model_path),
            LabelSource::Explicit(labels) => labels,
            LabelSource::File(path) => LabelCatalog::from_file(path)?,
        };

        let runtime_config = match self.runtime_config {
            Some(config) => config,
            None => RuntimeConfig::from_options(&self.options)?,
        };

        let engine = OrtEngine::load(&model_path, &runtime_config, self.output_quantization)
            .map_err(|e| {
                error!("Failed to load model {}: {}", model_path.display(), e);
                e
            })?;
        info!("Model loaded successfully");

        let classifier = Classifier::from_engine(engine, labels, self.options)?;
        Ok(classifier.with_model_path(model_path))
    }
}
