use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array3, ArrayView3, Axis};

use super::engine::{InputGeometry, InputTensor, TensorLayout};
use super::error::ClassifierError;
use super::options::Normalization;

/// Conditions raw RGB images for the model's input tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor {
    geometry: InputGeometry,
    quantized_input: bool,
    normalization: Normalization,
}

impl Preprocessor {
    pub fn new(geometry: InputGeometry, quantized_input: bool, normalization: Normalization) -> Self {
        Self {
            geometry,
            quantized_input,
            normalization,
        }
    }

    pub fn geometry(&self) -> InputGeometry {
        self.geometry
    }

    /// Resizes an `H x W x 3` image to the model input size with bilinear
    /// filtering. Float models additionally get `(pixel - mean) / std`;
    /// quantized models receive the resized `u8` values unchanged.
    pub fn preprocess(&self, image: ArrayView3<u8>) -> Result<InputTensor, ClassifierError> {
        let resized = self.resize(image)?;
        if self.quantized_input {
            return Ok(InputTensor::Uint8(self.batch(resized)));
        }

        let Normalization { mean, std } = self.normalization;
        let normalized = resized.mapv(|pixel| (f32::from(pixel) - mean) / std);
        Ok(InputTensor::Float32(self.batch(normalized)))
    }

    /// Writes an image through without resizing or normalization. The image
    /// must already be exactly the model's input height and width.
    pub fn to_input(&self, image: ArrayView3<u8>) -> Result<InputTensor, ClassifierError> {
        let expected = [self.geometry.height, self.geometry.width, 3];
        if image.shape() != &expected[..] {
            return Err(ClassifierError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: image.shape().to_vec(),
            });
        }

        if self.quantized_input {
            Ok(InputTensor::Uint8(self.batch(image.to_owned())))
        } else {
            Ok(InputTensor::Float32(self.batch(image.mapv(f32::from))))
        }
    }

    fn resize(&self, image: ArrayView3<u8>) -> Result<Array3<u8>, ClassifierError> {
        let (height, width, channels) = image.dim();
        if channels != 3 || height == 0 || width == 0 {
            return Err(ClassifierError::ShapeMismatch {
                expected: vec![height, width, 3],
                actual: image.shape().to_vec(),
            });
        }

        let (target_height, target_width) = (self.geometry.height, self.geometry.width);
        if (height, width) == (target_height, target_width) {
            return Ok(image.to_owned());
        }

        // `iter` walks the view in logical row-major order, whatever its strides
        let pixels: Vec<u8> = image.iter().copied().collect();
        let rgb = RgbImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
            ClassifierError::ValidationError(format!(
                "Image buffer does not hold {}x{} RGB pixels",
                width, height
            ))
        })?;

        let resized = imageops::resize(
            &rgb,
            target_width as u32,
            target_height as u32,
            FilterType::Triangle,
        );

        Array3::from_shape_vec((target_height, target_width, 3), resized.into_raw())
            .map_err(|e| ClassifierError::ValidationError(format!("Failed to build resized image: {}", e)))
    }

    /// Lays an `H x W x C` image out as a batch of one in the model's layout
    fn batch<T: Clone>(&self, image: Array3<T>) -> ndarray::Array4<T> {
        let image = match self.geometry.layout {
            TensorLayout::Nhwc => image,
            TensorLayout::Nchw => image.permuted_axes([2, 0, 1]),
        };
        image.insert_axis(Axis(0)).as_standard_layout().into_owned()
    }
}
