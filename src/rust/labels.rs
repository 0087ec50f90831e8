use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::ClassifierError;

/// Models whose label tables ship with the crate.
///
/// Each variant is keyed by the identifier its model file carries (the file
/// stem), so `model1.tflite` and `model1.onnx` both resolve to
/// [`BuiltinModel::SkinCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinModel {
    /// Binary skin cancer / skin disorder screening model
    SkinCondition,
    /// Binary benign / malignant lesion model
    LesionMalignancy,
    /// 23-class dermatology model
    SkinDisease,
}

const SKIN_CONDITION_LABELS: &[&str] = &["skin_cancer", "skin_disorder"];

const LESION_MALIGNANCY_LABELS: &[&str] = &["benign", "malignant"];

const SKIN_DISEASE_LABELS: &[&str] = &[
    "Acne and Rosacea Photos",
    "Actinic Keratosis Basal Cell Carcinoma and other Malignant Lesions",
    "Atopic Dermatitis Photos",
    "Bullous Disease Photos",
    "Cellulitis Impetigo and other Bacterial Infections",
    "Eczema Photos",
    "Exanthems and Drug Eruptions",
    "Hair Loss Photos Alopecia and other Hair Diseases",
    "Herpes HPV and other STDs Photos",
    "Light Diseases and Disorders of Pigmentation",
    "Lupus and other Connective Tissue diseases",
    "Melanoma Skin Cancer Nevi and Moles",
    "Nail Fungus and other Nail Disease",
    "Poison Ivy Photos and other Contact Dermatitis",
    "Psoriasis pictures Lichen Planus and related diseases",
    "Scabies Lyme Disease and other Infestations and Bites",
    "Seborrheic Keratoses and other Benign Tumors",
    "Systemic Disease",
    "Tinea Ringworm Candidiasis and other Fungal Infections",
    "Urticaria Hives",
    "Vascular Tumors",
    "Warts Molluscum and other Viral Infections",
    "vasculitis",
];

impl BuiltinModel {
    pub const ALL: [BuiltinModel; 3] = [
        BuiltinModel::SkinCondition,
        BuiltinModel::LesionMalignancy,
        BuiltinModel::SkinDisease,
    ];

    /// The identifier a model file must carry to select this label table
    pub fn identifier(&self) -> &'static str {
        match self {
            BuiltinModel::SkinCondition => "model1",
            BuiltinModel::LesionMalignancy => "model2",
            BuiltinModel::SkinDisease => "model3",
        }
    }

    /// Looks up a builtin model by identifier. Returns `None` for anything
    /// not in the table; there is no fallback.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.identifier() == identifier)
    }

    /// Derives the identifier from a model path (its file stem) and looks it up
    pub fn from_model_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(Self::from_identifier)
    }

    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            BuiltinModel::SkinCondition => SKIN_CONDITION_LABELS,
            BuiltinModel::LesionMalignancy => LESION_MALIGNANCY_LABELS,
            BuiltinModel::SkinDisease => SKIN_DISEASE_LABELS,
        }
    }
}

/// Ordered class names, index-aligned with the model's output tensor:
/// position `i` of the output is the score for `labels[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<String>,
}

impl LabelCatalog {
    pub fn new(labels: Vec<impl Into<String>>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// An empty catalog. Any lookup into it fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_model(model: BuiltinModel) -> Self {
        Self::new(model.labels().to_vec())
    }

    /// Resolves the catalog for a model file. An unrecognized identifier
    /// yields an empty catalog rather than an error, so construction succeeds
    /// and the mismatch surfaces on the first `classify`.
    pub fn for_model_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match BuiltinModel::from_model_path(path) {
            Some(model) => {
                info!("Using builtin labels for {:?} ({})", model, model.identifier());
                Self::for_model(model)
            }
            None => {
                warn!("No builtin labels for model {:?}, label catalog is empty", path);
                Self::empty()
            }
        }
    }

    /// Reads a labels file with one label per line. Blank lines are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ClassifierError::BuildError(format!("Failed to read labels file {:?}: {}", path, e))
        })?;

        let labels: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        if labels.is_empty() {
            return Err(ClassifierError::BuildError(format!(
                "Labels file {:?} contains no labels",
                path
            )));
        }
        Ok(Self { labels })
    }

    pub fn get(&self, index: usize) -> Result<&str, ClassifierError> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifierError::LabelOutOfRange {
                index,
                len: self.labels.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}
