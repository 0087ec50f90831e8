use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use log::{debug, info};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use ort::Result as OrtResult;

use crate::classifier::engine::{
    check_input_shape, ElementType, InferenceEngine, InputTensor, QuantizationParams, RawScores,
    TensorDetails,
};
use crate::{ClassifierError, ClassifierOptions};

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Model metadata key holding the output dequantization scale
pub const OUTPUT_SCALE_KEY: &str = "output_scale";
/// Model metadata key holding the output dequantization zero point
pub const OUTPUT_ZERO_POINT_KEY: &str = "output_zero_point";

/// Name of the host platform as the accelerator table spells it
pub fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "Darwin",
        "linux" => "Linux",
        "windows" => "Windows",
        other => other,
    }
}

/// The EdgeTPU delegate library for a platform, `None` where there is none
pub fn accelerator_library(platform: &str) -> Option<&'static str> {
    match platform {
        "Darwin" => Some("libedgetpu.1.dylib"),
        "Linux" => Some("libedgetpu.so.1"),
        "Windows" => Some("edgetpu.dll"),
        _ => None,
    }
}

#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

impl RuntimeConfig {
    /// Session settings implied by classifier options.
    ///
    /// The EdgeTPU libraries are TensorFlow Lite delegates, which ONNX Runtime
    /// cannot load, so requesting the accelerator fails with a `BuildError`
    /// naming the platform's library.
    pub fn from_options(options: &ClassifierOptions) -> Result<Self, ClassifierError> {
        if options.enable_edgetpu {
            let platform = current_platform();
            return Err(match accelerator_library(platform) {
                Some(library) => ClassifierError::BuildError(format!(
                    "EdgeTPU delegate {} cannot be used: the ONNX Runtime engine has no EdgeTPU delegate",
                    library
                )),
                None => ClassifierError::BuildError(format!("EdgeTPU is not supported on {}", platform)),
            });
        }

        Ok(Self {
            intra_threads: options.num_threads,
            ..Self::default()
        })
    }
}

// GraphOptimizationLevel is neither Clone nor Copy
fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("image-classifier")
        .commit()?;
    Ok(())
}

pub fn ensure_initialized() -> Result<(), ClassifierError> {
    INIT.get_or_init(|| init_onnx_environment().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| ClassifierError::BuildError(format!("Failed to initialize ONNX Runtime: {}", e)))
}

fn session_error(err: ort::Error) -> ClassifierError {
    ClassifierError::BuildError(format!("Failed to configure session: {}", err))
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder().map_err(session_error)?;

    // Configure threading
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads).map_err(session_error)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads).map_err(session_error)?;
    }

    builder
        .with_optimization_level(copy_level(&config.optimization_level))
        .map_err(session_error)
}

/// [`InferenceEngine`] backed by an ONNX Runtime session.
///
/// The first model input is the image and the first model output holds the
/// class scores.
#[derive(Debug)]
pub struct OrtEngine {
    session: Session,
    input_details: TensorDetails,
    output_details: TensorDetails,
    input: Option<InputTensor>,
    output: Option<RawScores>,
}

impl OrtEngine {
    /// Loads a model file.
    ///
    /// When the model's output is `u8`, `output_quantization` supplies its
    /// scale and zero point; without it they are read from the model
    /// metadata keys [`OUTPUT_SCALE_KEY`] and [`OUTPUT_ZERO_POINT_KEY`].
    ///
    /// # Errors
    /// - `BuildError` if the session cannot be created or the model fails to load
    /// - `BuildError` if a quantized output has no quantization parameters
    /// - `ModelError` if the model has no inputs/outputs or uses unsupported types
    pub fn load(
        model_path: impl AsRef<Path>,
        config: &RuntimeConfig,
        output_quantization: Option<QuantizationParams>,
    ) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        let session = create_session_builder(config)?
            .commit_from_file(model_path)
            .map_err(|e| {
                ClassifierError::BuildError(format!("Failed to load model {:?}: {}", model_path, e))
            })?;

        let input = session.inputs.first().ok_or_else(|| {
            ClassifierError::ModelError("Model must have at least 1 input".to_string())
        })?;
        let output = session.outputs.first().ok_or_else(|| {
            ClassifierError::ModelError("Model must have at least 1 output".to_string())
        })?;

        let input_details = tensor_details(&input.name, &input.input_type)?;
        let mut output_details = tensor_details(&output.name, &output.output_type)?;

        if output_details.is_quantized() {
            let params = match output_quantization {
                Some(params) => params,
                None => read_output_quantization(&session)?,
            };
            info!("Output is quantized (scale {}, zero point {})", params.scale, params.zero_point);
            output_details.quantization = Some(params);
        }

        debug!("Input tensor: {:?}", input_details);
        debug!("Output tensor: {:?}", output_details);

        Ok(Self {
            session,
            input_details,
            output_details,
            input: None,
            output: None,
        })
    }
}

impl InferenceEngine for OrtEngine {
    fn input_details(&self) -> &TensorDetails {
        &self.input_details
    }

    fn output_details(&self) -> &TensorDetails {
        &self.output_details
    }

    fn set_input(&mut self, input: InputTensor) -> Result<(), ClassifierError> {
        check_input_shape(&self.input_details, &input)?;
        self.input = Some(input);
        Ok(())
    }

    fn invoke(&mut self) -> Result<(), ClassifierError> {
        let input = self.input.as_ref().ok_or_else(|| {
            ClassifierError::PredictionError("Input tensor has not been set".into())
        })?;

        let value = match input {
            InputTensor::Uint8(array) => Tensor::from_array(array.clone())?.into_dyn(),
            InputTensor::Float32(array) => Tensor::from_array(array.clone())?.into_dyn(),
        };

        let mut input_tensors = HashMap::new();
        input_tensors.insert(self.input_details.name.as_str(), value);

        self.output = None;
        let scores = {
            let outputs = self.session.run(input_tensors)
                .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
            let output = &outputs[self.output_details.name.as_str()];

            match self.output_details.element_type {
                ElementType::Uint8 => RawScores::Uint8(
                    output.try_extract_tensor::<u8>()?.iter().copied().collect(),
                ),
                ElementType::Float32 => RawScores::Float32(
                    output.try_extract_tensor::<f32>()?.iter().copied().collect(),
                ),
            }
        };

        self.output = Some(scores);
        Ok(())
    }

    fn output(&self) -> Result<RawScores, ClassifierError> {
        self.output.clone().ok_or_else(|| {
            ClassifierError::PredictionError("Model has not been invoked".into())
        })
    }
}

fn tensor_details(name: &str, value_type: &ValueType) -> Result<TensorDetails, ClassifierError> {
    let (ty, dimensions) = match value_type {
        ValueType::Tensor { ty, dimensions, .. } => (ty, dimensions),
        other => {
            return Err(ClassifierError::ModelError(format!(
                "Tensor '{}' must be a tensor, found {:?}",
                name, other
            )))
        }
    };

    let element_type = match ty {
        TensorElementType::Uint8 => ElementType::Uint8,
        TensorElementType::Float32 => ElementType::Float32,
        other => {
            return Err(ClassifierError::ModelError(format!(
                "Tensor '{}' has unsupported element type {:?}",
                name, other
            )))
        }
    };

    Ok(TensorDetails {
        name: name.to_string(),
        shape: dimensions.clone(),
        element_type,
        quantization: None,
    })
}

fn read_output_quantization(session: &Session) -> Result<QuantizationParams, ClassifierError> {
    let metadata_error =
        |e: ort::Error| ClassifierError::BuildError(format!("Failed to read model metadata: {}", e));
    let metadata = session.metadata().map_err(metadata_error)?;
    let scale = metadata.custom(OUTPUT_SCALE_KEY).map_err(metadata_error)?;
    let zero_point = metadata.custom(OUTPUT_ZERO_POINT_KEY).map_err(metadata_error)?;

    match (scale, zero_point) {
        (Some(scale), Some(zero_point)) => parse_quantization(&scale, &zero_point),
        _ => Err(ClassifierError::BuildError(format!(
            "Quantized output needs '{}' and '{}' in the model metadata or explicit parameters",
            OUTPUT_SCALE_KEY, OUTPUT_ZERO_POINT_KEY
        ))),
    }
}

fn parse_quantization(scale: &str, zero_point: &str) -> Result<QuantizationParams, ClassifierError> {
    let scale: f32 = scale.trim().parse().map_err(|_| {
        ClassifierError::BuildError(format!("Invalid output scale '{}'", scale))
    })?;
    let zero_point: i32 = zero_point.trim().parse().map_err(|_| {
        ClassifierError::BuildError(format!("Invalid output zero point '{}'", zero_point))
    })?;
    Ok(QuantizationParams::new(scale, zero_point))
}
