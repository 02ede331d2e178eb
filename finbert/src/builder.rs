use std::{
    fs::File,
    io::{BufRead, BufReader, Error as IoError, Read},
    path::Path,
};

use displaydoc::Display;
use thiserror::Error;

use crate::{
    classifier::SoftmaxClassifier,
    model::{Model, ModelError},
    pipeline::Pipeline,
    tokenizer::{Tokenizer, TokenizerError},
};

/// A builder to create a [`Pipeline`].
#[derive(Debug)]
pub struct Builder<V, M> {
    vocab: V,
    model: M,
    accents: bool,
    lowercase: bool,
    token_size: usize,
}

/// Potential errors of the [`Pipeline`] [`Builder`].
#[derive(Debug, Display, Error)]
pub enum BuilderError {
    /// The token size must be at least two to allow for special tokens
    TokenSize,
    /// Failed to load a data file: {0}
    DataFile(#[from] IoError),
    /// Failed to build the tokenizer: {0}
    Tokenizer(#[from] TokenizerError),
    /// Failed to build the model: {0}
    Model(#[from] ModelError),
}

impl Builder<BufReader<File>, BufReader<File>> {
    /// Creates a [`Pipeline`] builder from files.
    pub fn from_files(
        vocab: impl AsRef<Path>,
        model: impl AsRef<Path>,
    ) -> Result<Self, BuilderError> {
        let vocab = BufReader::new(File::open(vocab)?);
        let model = BufReader::new(File::open(model)?);
        Ok(Self::new(vocab, model))
    }
}

impl<V, M> Builder<V, M>
where
    V: BufRead,
    M: Read,
{
    /// Creates a [`Pipeline`] builder.
    pub fn new(vocab: V, model: M) -> Self {
        Self {
            vocab,
            model,
            accents: false,
            lowercase: true,
            token_size: 128,
        }
    }

    /// Toggles accent keeping for the tokenizer.
    ///
    /// Defaults to `false`.
    pub fn with_accents(mut self, toggle: bool) -> Self {
        self.accents = toggle;
        self
    }

    /// Toggles lower casing for the tokenizer.
    ///
    /// Defaults to `true`.
    pub fn with_lowercase(mut self, toggle: bool) -> Self {
        self.lowercase = toggle;
        self
    }

    /// Sets the token size for the tokenizer and the model.
    ///
    /// Defaults to `128`.
    ///
    /// # Errors
    /// Fails if `size` is less than two.
    pub fn with_token_size(mut self, size: usize) -> Result<Self, BuilderError> {
        if size < 2 {
            Err(BuilderError::TokenSize)
        } else {
            self.token_size = size;
            Ok(self)
        }
    }

    /// Builds a [`Pipeline`].
    ///
    /// # Errors
    /// Fails on invalid tokenizer or model settings.
    pub fn build(self) -> Result<Pipeline, BuilderError> {
        let tokenizer = Tokenizer::new(
            self.vocab,
            self.accents,
            self.lowercase,
            self.token_size,
        )?;
        let model = Model::new(self.model, self.token_size)?;

        Ok(Pipeline {
            tokenizer,
            model,
            classifier: SoftmaxClassifier,
        })
    }
}
