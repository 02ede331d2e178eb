use std::fmt;

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{model::Logits, ndarray::Array1};

/// The sentiment labels, in the order of the model's classes.
const LABELS: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

/// A sentiment label.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The winning label together with its softmax probability.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub confidence: f32,
}

/// The potential errors of the classifier.
#[derive(Debug, Display, Error)]
pub enum ClassifierError {
    /// The model predicts {0} classes instead of one per label
    Classes(usize),
}

/// A softmax classification strategy.
///
/// The logits are turned into a probability distribution and the most probable label wins.
pub struct SoftmaxClassifier;

impl SoftmaxClassifier {
    /// Classifies the predicted logits.
    pub(crate) fn classify(&self, logits: Logits) -> Result<Classification, ClassifierError> {
        if logits.shape()[1] != LABELS.len() {
            return Err(ClassifierError::Classes(logits.shape()[1]));
        }

        let probabilities = softmax(logits.0.row(0).to_owned());
        let (index, confidence) = probabilities
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |max, (index, probability)| {
                if *probability > max.1 {
                    (index, *probability)
                } else {
                    max
                }
            });

        Ok(Classification {
            sentiment: LABELS[index],
            confidence,
        })
    }
}

/// Computes the softmax of the logits.
///
/// The maximum is subtracted beforehand to prevent overflow.
fn softmax(mut logits: Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::MIN, f32::max);
    logits.mapv_inplace(|logit| (logit - max).exp());
    let sum = logits.sum();
    logits.mapv_inplace(|exp| exp / sum);
    logits
}
