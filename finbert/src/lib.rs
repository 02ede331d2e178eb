#![cfg_attr(doc, forbid(broken_intra_doc_links, private_intra_doc_links))]
//! The FinBERT pipeline computes the sentiment of sequences.
//!
//! Sequences are anything string-like, usually cleaned news headlines or snippets. The pipeline
//! consists of a Bert word piece tokenizer, an onnx sequence classification model and a softmax
//! classifier over the sentiment labels.
//!
//! ```no_run
//! use finbert::Builder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let finbert = Builder::from_files("vocab.txt", "sentiment.onnx")?
//!         .with_accents(false)
//!         .with_lowercase(true)
//!         .with_token_size(128)?
//!         .build()?;
//!
//!     let classification = finbert.run("Stocks rallied after the earnings report.")?;
//!     println!("{} ({})", classification.sentiment, classification.confidence);
//!
//!     Ok(())
//! }
//! ```
//!
//! The [`export`] module rewrites a raw pretrained graph to the fixed inference contract the
//! pipeline expects, the [`inspect`] module describes the declared outputs of a graph file.

mod builder;
mod classifier;
pub mod export;
pub mod inspect;
mod model;
mod pipeline;
mod preprocess;
mod tokenizer;

pub use crate::{
    builder::{Builder, BuilderError},
    classifier::{Classification, ClassifierError, Sentiment},
    model::ModelError,
    pipeline::{Pipeline, PipelineError},
    preprocess::{CleanerError, TextCleaner},
    tokenizer::{Encoding, Tokenizer, TokenizerError},
};

// the array types of the encodings and predictions
pub use ndarray;
