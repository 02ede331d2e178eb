use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::{Context, Error};
use log::debug;
use serde::Serialize;
use structopt::StructOpt;

use finbert::Tokenizer;

use crate::{exit_code::NO_ERROR, hub::resolve_pretrained_file};

/// Tokenizes text into the tensors the sentiment model expects.
///
/// Prints exactly one JSON line to stdout, everything else goes to stderr.
#[derive(Debug, StructOpt)]
pub struct TokenizeCmd {
    /// Hub name of the pretrained model providing the vocabulary.
    #[structopt(short, long, default_value = "ProsusAI/finbert")]
    model: String,

    /// Local vocabulary file, skips the hub.
    #[structopt(short, long)]
    vocab: Option<PathBuf>,

    /// Fixed token length of the encoding.
    #[structopt(short, long, default_value = "128")]
    token_size: usize,

    /// The text to tokenize.
    #[structopt(required = true)]
    text: Vec<String>,
}

/// The tokenized text as consumed at inference time.
#[derive(Debug, Serialize)]
pub struct TokenizedText {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
}

impl TokenizeCmd {
    pub fn run(self) -> Result<i32, Error> {
        let vocab = resolve_pretrained_file(self.vocab, &self.model, "vocab.txt")?;

        debug!("Loading the vocabulary from {}.", vocab.display());
        let vocab = BufReader::new(
            File::open(&vocab)
                .with_context(|| format!("Failed to open the vocabulary {}", vocab.display()))?,
        );
        let tokenizer = Tokenizer::new(vocab, false, true, self.token_size)?;

        let tokenized = tokenize(&tokenizer, &self.text.join(" "))?;
        println!("{}", serde_json::to_string(&tokenized)?);

        Ok(NO_ERROR)
    }
}

/// Encodes the text into the flat tensor rows of a single sequence.
fn tokenize(tokenizer: &Tokenizer, text: &str) -> Result<TokenizedText, Error> {
    let encoding = tokenizer.encode(text)?;

    Ok(TokenizedText {
        input_ids: encoding.input_ids.row(0).to_vec(),
        attention_mask: encoding.attention_mask.row(0).to_vec(),
    })
}
