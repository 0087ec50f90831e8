#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image_classifier::{
    ClassifierError, ElementType, InferenceEngine, InputTensor, QuantizationParams, RawScores,
    TensorDetails,
};

/// Path of a model under `tests/fixtures`.
///
/// The `channel_mean*` models take a `[1, 2, 2, 3]` image and output the mean
/// of each channel as a `[1, 3]` score vector. The quantized variants read and
/// write `u8`; `channel_mean_quantized.onnx` carries `output_scale = 1/256`
/// and `output_zero_point = 0` in its metadata.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Engine double that returns canned scores and records what it was fed
pub struct FakeEngine {
    input_details: TensorDetails,
    output_details: TensorDetails,
    scores: RawScores,
    pub last_input: Option<InputTensor>,
    pub invocations: usize,
    ran: bool,
}

impl FakeEngine {
    pub fn float(height: i64, width: i64, scores: Vec<f32>) -> Self {
        Self::new(height, width, ElementType::Float32, RawScores::Float32(scores), None)
    }

    pub fn quantized(height: i64, width: i64, scores: Vec<u8>, params: QuantizationParams) -> Self {
        Self::new(height, width, ElementType::Uint8, RawScores::Uint8(scores), Some(params))
    }

    pub fn new(
        height: i64,
        width: i64,
        input_type: ElementType,
        scores: RawScores,
        quantization: Option<QuantizationParams>,
    ) -> Self {
        let output_type = match scores {
            RawScores::Uint8(_) => ElementType::Uint8,
            RawScores::Float32(_) => ElementType::Float32,
        };
        Self {
            input_details: TensorDetails {
                name: "input".into(),
                shape: vec![1, height, width, 3],
                element_type: input_type,
                quantization: None,
            },
            output_details: TensorDetails {
                name: "output".into(),
                shape: vec![1, scores.len() as i64],
                element_type: output_type,
                quantization,
            },
            scores,
            last_input: None,
            invocations: 0,
            ran: false,
        }
    }
}

impl InferenceEngine for FakeEngine {
    fn input_details(&self) -> &TensorDetails {
        &self.input_details
    }

    fn output_details(&self) -> &TensorDetails {
        &self.output_details
    }

    fn set_input(&mut self, input: InputTensor) -> Result<(), ClassifierError> {
        let expected: Vec<usize> = self.input_details.shape.iter().map(|&d| d as usize).collect();
        if input.shape() != expected.as_slice() {
            return Err(ClassifierError::ShapeMismatch {
                expected,
                actual: input.shape().to_vec(),
            });
        }
        self.last_input = Some(input);
        Ok(())
    }

    fn invoke(&mut self) -> Result<(), ClassifierError> {
        if self.last_input.is_none() {
            return Err(ClassifierError::PredictionError("Input tensor has not been set".into()));
        }
        self.invocations += 1;
        self.ran = true;
        Ok(())
    }

    fn output(&self) -> Result<RawScores, ClassifierError> {
        if !self.ran {
            return Err(ClassifierError::PredictionError("Model has not been invoked".into()));
        }
        Ok(self.scores.clone())
    }
}
