use std::path::PathBuf;

use anyhow::{Context, Error};
use log::debug;
use structopt::StructOpt;

use finbert::{Builder, TextCleaner};

use crate::{exit_code::NO_ERROR, hub::resolve_pretrained_file};

/// Runs sentiment analysis over the given text.
///
/// The text is cleaned like the news snippets at inference time before it is classified.
#[derive(Debug, StructOpt)]
pub struct AnalyzeCmd {
    /// Hub name of the pretrained model providing the vocabulary.
    #[structopt(short, long, default_value = "ProsusAI/finbert")]
    model: String,

    /// Local vocabulary file, skips the hub.
    #[structopt(short, long)]
    vocab: Option<PathBuf>,

    /// Path to the exported graph file.
    #[structopt(short = "f", long, default_value = "models/sentiment.onnx")]
    model_file: PathBuf,

    /// Fixed token length of the model inputs.
    #[structopt(short, long, default_value = "128")]
    token_size: usize,

    /// The text to analyze.
    #[structopt(required = true)]
    text: Vec<String>,
}

impl AnalyzeCmd {
    pub fn run(self) -> Result<i32, Error> {
        let vocab = resolve_pretrained_file(self.vocab, &self.model, "vocab.txt")?;

        debug!("Building the pipeline with {}.", self.model_file.display());
        let pipeline = Builder::from_files(&vocab, &self.model_file)
            .context("Failed to load the pipeline data files")?
            .with_token_size(self.token_size)?
            .build()
            .context("Failed to build the pipeline")?;

        let text = TextCleaner::new()?.clean(&self.text.join(" "));
        debug!("Analyzing '{}'.", text);
        let classification = pipeline.run(&text)?;

        println!(
            "Sentiment: {} ({:.2} confidence)",
            classification.sentiment, classification.confidence,
        );

        Ok(NO_ERROR)
    }
}
