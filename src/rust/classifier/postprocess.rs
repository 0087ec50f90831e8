use log::debug;

use super::category::Category;
use super::engine::{QuantizationParams, RawScores};
use super::error::ClassifierError;
use super::options::ClassifierOptions;
use crate::LabelCatalog;

/// Turns raw output scores into ranked, filtered categories.
///
/// The steps run in a fixed order:
/// 1. Dequantize `u8` output with the model's scale and zero point
/// 2. Rank every output position by descending score (stable: ties keep the
///    lower index first)
/// 3. Attach labels; a position the catalog does not cover is an error
/// 4. Drop denied labels
/// 5. Keep only allowed labels
/// 6. Drop scores below the threshold (a score equal to it is kept)
/// 7. Truncate to `max_results` when it is positive
///
/// Filtering never reorders the ranked list.
#[derive(Debug, Clone)]
pub struct Postprocessor {
    labels: LabelCatalog,
    options: ClassifierOptions,
    output_quantization: Option<QuantizationParams>,
}

impl Postprocessor {
    pub fn new(
        labels: LabelCatalog,
        options: ClassifierOptions,
        output_quantization: Option<QuantizationParams>,
    ) -> Self {
        Self {
            labels,
            options,
            output_quantization,
        }
    }

    pub fn labels(&self) -> &LabelCatalog {
        &self.labels
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    pub fn postprocess(&self, raw: &RawScores) -> Result<Vec<Category>, ClassifierError> {
        let scores = self.dequantize(raw)?;
        let ranked = rank_descending(&scores);

        let categories = ranked
            .into_iter()
            .map(|index| {
                self.labels
                    .get(index)
                    .map(|label| Category::new(label, scores[index]))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let filtered = self.filter(categories);
        debug!("{} of {} categories kept after filtering", filtered.len(), scores.len());
        Ok(filtered)
    }

    fn dequantize(&self, raw: &RawScores) -> Result<Vec<f32>, ClassifierError> {
        match raw {
            RawScores::Float32(values) => Ok(values.clone()),
            RawScores::Uint8(values) => {
                let params = self.output_quantization.ok_or_else(|| {
                    ClassifierError::PredictionError(
                        "Quantized output without quantization parameters".into(),
                    )
                })?;
                Ok(values.iter().map(|&v| params.dequantize(v)).collect())
            }
        }
    }

    fn filter(&self, categories: Vec<Category>) -> Vec<Category> {
        let options = &self.options;

        let iter = categories
            .into_iter()
            .filter(|c| {
                options
                    .label_deny_list
                    .as_ref()
                    .map_or(true, |deny| !deny.contains(&c.label))
            })
            .filter(|c| {
                options
                    .label_allow_list
                    .as_ref()
                    .map_or(true, |allow| allow.contains(&c.label))
            })
            .filter(|c| c.score >= options.score_threshold);

        match options.result_limit() {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Output positions ordered by descending score. `sort_by` is stable, so
/// equal scores keep ascending index order.
pub(crate) fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    indices
}
