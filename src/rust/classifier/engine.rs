use ndarray::Array4;

use super::error::ClassifierError;

/// Element types the classifier can feed and read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// 8-bit quantized tensor
    Uint8,
    Float32,
}

/// Linear mapping from a quantized `u8` value to a real score:
/// `scale * (value - zero_point)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl QuantizationParams {
    pub fn new(scale: f32, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    pub fn dequantize(&self, value: u8) -> f32 {
        self.scale * (i64::from(value) - i64::from(self.zero_point)) as f32
    }
}

/// What the engine reports about one of its tensors
#[derive(Debug, Clone, PartialEq)]
pub struct TensorDetails {
    pub name: String,
    /// Dimensions as reported by the model; dynamic dimensions are negative
    pub shape: Vec<i64>,
    pub element_type: ElementType,
    pub quantization: Option<QuantizationParams>,
}

impl TensorDetails {
    pub fn is_quantized(&self) -> bool {
        self.element_type == ElementType::Uint8
    }
}

/// Memory order of the image batch tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[batch, height, width, channels]`
    Nhwc,
    /// `[batch, channels, height, width]`
    Nchw,
}

/// Spatial size and layout of a model's image input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputGeometry {
    pub height: usize,
    pub width: usize,
    pub layout: TensorLayout,
}

impl InputGeometry {
    /// Reads height, width and layout from a rank-4 image input shape.
    /// Channels-last is preferred when both readings are possible.
    pub fn from_shape(shape: &[i64]) -> Result<Self, ClassifierError> {
        if shape.len() != 4 {
            return Err(ClassifierError::ModelError(format!(
                "Model input must be a rank-4 image tensor, found shape {:?}",
                shape
            )));
        }

        let (height, width, layout) = if shape[3] == 3 {
            (shape[1], shape[2], TensorLayout::Nhwc)
        } else if shape[1] == 3 {
            (shape[2], shape[3], TensorLayout::Nchw)
        } else {
            return Err(ClassifierError::ModelError(format!(
                "Model input must have 3 channels, found shape {:?}",
                shape
            )));
        };

        if height <= 0 || width <= 0 {
            return Err(ClassifierError::ModelError(format!(
                "Model input must have a fixed height and width, found shape {:?}",
                shape
            )));
        }

        Ok(Self {
            height: height as usize,
            width: width as usize,
            layout,
        })
    }
}

/// A batch of one image, ready to be written into the input tensor
#[derive(Debug, Clone, PartialEq)]
pub enum InputTensor {
    Uint8(Array4<u8>),
    Float32(Array4<f32>),
}

impl InputTensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            InputTensor::Uint8(array) => array.shape(),
            InputTensor::Float32(array) => array.shape(),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            InputTensor::Uint8(_) => ElementType::Uint8,
            InputTensor::Float32(_) => ElementType::Float32,
        }
    }
}

/// Output tensor contents squeezed to one dimension, position `i` aligned
/// with label `i`
#[derive(Debug, Clone, PartialEq)]
pub enum RawScores {
    Uint8(Vec<u8>),
    Float32(Vec<f32>),
}

impl RawScores {
    pub fn len(&self) -> usize {
        match self {
            RawScores::Uint8(values) => values.len(),
            RawScores::Float32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The capabilities the classifier needs from an inference runtime.
///
/// The engine owns its input and output buffers. A call sequence is
/// `set_input` → `invoke` → `output`; the buffers are overwritten in place by
/// each call, so the methods that touch them take `&mut self`.
///
/// [`OrtEngine`](crate::OrtEngine) is the ONNX Runtime binding. Other
/// runtimes (or test doubles) plug in by implementing this trait and handing
/// the engine to [`Classifier::from_engine`](crate::Classifier::from_engine).
pub trait InferenceEngine {
    /// Details of the image input tensor
    fn input_details(&self) -> &TensorDetails;

    /// Details of the score output tensor
    fn output_details(&self) -> &TensorDetails;

    /// Writes one image batch into the input tensor.
    ///
    /// # Errors
    /// - `ShapeMismatch` if the tensor shape does not fit the model input
    /// - `ModelError` if the element type does not match the model input
    fn set_input(&mut self, input: InputTensor) -> Result<(), ClassifierError>;

    /// Runs one forward pass over the current input.
    ///
    /// # Errors
    /// - `PredictionError` if no input has been set
    /// - `ModelError` if the runtime fails
    fn invoke(&mut self) -> Result<(), ClassifierError>;

    /// Returns the output of the last forward pass.
    ///
    /// # Errors
    /// - `PredictionError` if `invoke` has not completed yet
    fn output(&self) -> Result<RawScores, ClassifierError>;
}

/// Checks an input batch against the model's reported shape. Dynamic
/// (negative) dimensions accept any size.
pub(crate) fn check_input_shape(
    details: &TensorDetails,
    input: &InputTensor,
) -> Result<(), ClassifierError> {
    let actual = input.shape();
    let matches = details.shape.len() == actual.len()
        && details
            .shape
            .iter()
            .zip(actual)
            .all(|(&expected, &got)| expected < 0 || expected as usize == got);

    if !matches {
        return Err(ClassifierError::ShapeMismatch {
            expected: details.shape.iter().map(|&d| d.max(0) as usize).collect(),
            actual: actual.to_vec(),
        });
    }
    if input.element_type() != details.element_type {
        return Err(ClassifierError::ModelError(format!(
            "Input tensor '{}' expects {:?} values, got {:?}",
            details.name,
            details.element_type,
            input.element_type()
        )));
    }
    Ok(())
}
