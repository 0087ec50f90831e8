use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ClassifierError;

/// Per-channel normalization applied to float-input models:
/// `(pixel - mean) / std`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: f32,
    pub std: f32,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mean: 127.0,
            std: 128.0,
        }
    }
}

/// Configuration for an image classifier.
///
/// Options are fixed once the classifier is built. Construct them with the
/// `with_*` methods or deserialize them from JSON; missing fields take their
/// defaults.
///
/// # Example
/// ```
/// use image_classifier::ClassifierOptions;
///
/// let options = ClassifierOptions::default()
///     .with_max_results(5)
///     .with_score_threshold(0.2)
///     .with_label_deny_list(vec!["benign"]);
/// assert_eq!(options.max_results, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Request the EdgeTPU accelerator. The ONNX Runtime engine has no EdgeTPU
    /// delegate, so building a classifier with this set fails.
    pub enable_edgetpu: bool,
    /// If set, only these labels are returned
    pub label_allow_list: Option<HashSet<String>>,
    /// If set, these labels are never returned
    pub label_deny_list: Option<HashSet<String>>,
    /// Maximum number of results; zero or negative means unlimited
    pub max_results: i32,
    /// Number of intra-op threads the runtime may use
    pub num_threads: usize,
    /// Results scoring below this are dropped
    pub score_threshold: f32,
    /// Resize and normalize images before inference. When off, images must
    /// already match the model's input size.
    pub preprocess: bool,
    pub normalization: Normalization,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            enable_edgetpu: false,
            label_allow_list: None,
            label_deny_list: None,
            max_results: 3,
            num_threads: 1,
            score_threshold: 0.0,
            preprocess: false,
            normalization: Normalization::default(),
        }
    }
}

impl ClassifierOptions {
    pub fn with_edgetpu(mut self, enable: bool) -> Self {
        self.enable_edgetpu = enable;
        self
    }

    pub fn with_label_allow_list(mut self, labels: Vec<impl Into<String>>) -> Self {
        self.label_allow_list = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_label_deny_list(mut self, labels: Vec<impl Into<String>>) -> Self {
        self.label_deny_list = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_results(mut self, max_results: i32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_score_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    pub fn with_preprocess(mut self, preprocess: bool) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn with_normalization(mut self, mean: f32, std: f32) -> Self {
        self.normalization = Normalization { mean, std };
        self
    }

    /// Reads options from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ClassifierError::ValidationError(format!("Failed to read options file {:?}: {}", path, e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            ClassifierError::ValidationError(format!("Invalid options file {:?}: {}", path, e))
        })
    }

    /// Checks the values a builder cannot recover from
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.num_threads == 0 {
            return Err(ClassifierError::ValidationError(
                "num_threads must be at least 1".into(),
            ));
        }
        if self.normalization.std == 0.0 || !self.normalization.std.is_finite() {
            return Err(ClassifierError::ValidationError(format!(
                "Normalization std must be finite and non-zero, got {}",
                self.normalization.std
            )));
        }
        if self.score_threshold.is_nan() {
            return Err(ClassifierError::ValidationError(
                "score_threshold cannot be NaN".into(),
            ));
        }
        Ok(())
    }

    /// `None` when results are unlimited
    pub(crate) fn result_limit(&self) -> Option<usize> {
        usize::try_from(self.max_results).ok().filter(|&n| n > 0)
    }
}
