use displaydoc::Display;
use thiserror::Error;

use crate::{
    classifier::{Classification, ClassifierError, SoftmaxClassifier},
    model::{Model, ModelError},
    tokenizer::{Tokenizer, TokenizerError},
};

/// A sentiment analysis pipeline.
///
/// Can be created via the [`Builder`] and consists of a tokenizer, a model and a classifier.
///
/// [`Builder`]: crate::builder::Builder
pub struct Pipeline {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) model: Model,
    pub(crate) classifier: SoftmaxClassifier,
}

/// The potential errors of the [`Pipeline`].
#[derive(Debug, Display, Error)]
pub enum PipelineError {
    /// Failed to run the tokenizer: {0}
    Tokenizer(#[from] TokenizerError),
    /// Failed to run the model: {0}
    Model(#[from] ModelError),
    /// Failed to run the classifier: {0}
    Classifier(#[from] ClassifierError),
}

impl Pipeline {
    /// Computes the sentiment of the sequence.
    pub fn run(&self, sequence: impl AsRef<str>) -> Result<Classification, PipelineError> {
        let encoding = self.tokenizer.encode(sequence)?;
        let logits = self.model.predict(encoding)?;
        self.classifier.classify(logits).map_err(Into::into)
    }

    /// Gets the token size.
    pub fn token_size(&self) -> usize {
        self.tokenizer.token_size
    }

    /// Gets the number of classes.
    pub fn num_classes(&self) -> usize {
        self.model.num_classes()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::BufReader};

    use crate::{
        builder::Builder,
        classifier::Sentiment,
        tests::{tiny_model_bytes, TINY_NUM_CLASSES, TINY_TOKEN_SIZE},
    };

    fn pipeline() -> super::Pipeline {
        let vocab = BufReader::new(File::open(test_utils::sentiment::vocab().unwrap()).unwrap());
        let model = tiny_model_bytes();
        Builder::new(vocab, model.as_slice())
            .with_accents(false)
            .with_lowercase(true)
            .with_token_size(TINY_TOKEN_SIZE)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_pipeline() {
        let pipeline = pipeline();
        assert_eq!(pipeline.token_size(), TINY_TOKEN_SIZE);
        assert_eq!(pipeline.num_classes(), TINY_NUM_CLASSES);

        let classification = pipeline.run("the market rallied").unwrap();
        // the synthetic weights favor the last class
        assert_eq!(classification.sentiment, Sentiment::Positive);
        assert!(classification.confidence > 1.0 / TINY_NUM_CLASSES as f32);

        let classification = pipeline.run("").unwrap();
        assert_eq!(classification.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_pipeline_deterministic() {
        let pipeline = pipeline();
        let first = pipeline.run("stocks fell sharply").unwrap();
        let second = pipeline.run("stocks fell sharply").unwrap();
        assert_eq!(first.sentiment, second.sentiment);
        assert!(float_cmp::approx_eq!(
            f32,
            first.confidence,
            second.confidence
        ));
    }
}
