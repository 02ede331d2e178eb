use std::{collections::HashMap, io::BufRead};

use derive_more::{Deref, From};
use displaydoc::Display;
use thiserror::Error;
use tokenizers::{
    models::wordpiece::WordPiece,
    normalizers::BertNormalizer,
    pre_tokenizers::bert::BertPreTokenizer,
    processors::bert::BertProcessing,
    Model,
    PaddingParams,
    PaddingStrategy,
    Tokenizer as BertTokenizer,
    TruncationParams,
};

use crate::ndarray::{Array2, Dim, Ix2};

/// The class token.
const CLS: &str = "[CLS]";
/// The separation token.
const SEP: &str = "[SEP]";
/// The padding token.
const PAD: &str = "[PAD]";
/// The unknown token.
const UNK: &str = "[UNK]";
/// The continuing subword prefix.
const PREFIX: &str = "##";

/// A wrapped, pre-configured Bert word piece tokenizer.
pub struct Tokenizer {
    tokenizer: BertTokenizer,
    pub(crate) token_size: usize,
}

/// The potential errors of the tokenizer.
#[derive(Debug, Display, Error)]
pub enum TokenizerError {
    /// Failed to load the vocabulary: {0}
    Vocab(#[from] std::io::Error),
    /// The vocabulary is missing the special token `{0}`
    SpecialToken(&'static str),
    /// Failed to build the tokenizer: {0}
    Build(String),
    /// Failed to encode the sequence: {0}
    Encode(String),
}

/// The token ids of the encoded sequence.
#[derive(Clone, Debug, Deref, From)]
pub struct InputIds(pub Array2<i64>);

/// The attention mask of the encoded sequence.
#[derive(Clone, Debug, Deref, From)]
pub struct AttentionMask(pub Array2<i64>);

/// The encoded sequence.
#[derive(Clone, Debug)]
pub struct Encoding {
    pub input_ids: InputIds,
    pub attention_mask: AttentionMask,
}

impl Tokenizer {
    /// Creates a tokenizer from an in-order vocabulary.
    ///
    /// Can be set to strip accents and to lowercase the sequences. Requires the number of tokens
    /// per tokenized sequence, which applies to padding and truncation and includes special
    /// tokens as well.
    pub fn new(
        vocab: impl BufRead,
        accents: bool,
        lowercase: bool,
        token_size: usize,
    ) -> Result<Self, TokenizerError> {
        let vocab = vocab
            .lines()
            .enumerate()
            .map(|(id, token)| Ok((token?.trim_end().to_string(), id as u32)))
            .collect::<Result<HashMap<_, _>, std::io::Error>>()?;
        let model = WordPiece::builder()
            .vocab(vocab)
            .unk_token(UNK.into())
            .continuing_subword_prefix(PREFIX.into())
            .max_input_chars_per_word(100)
            .build()
            .map_err(|error| TokenizerError::Build(error.to_string()))?;
        let sep = model
            .token_to_id(SEP)
            .ok_or(TokenizerError::SpecialToken(SEP))?;
        let cls = model
            .token_to_id(CLS)
            .ok_or(TokenizerError::SpecialToken(CLS))?;
        let pad = model
            .token_to_id(PAD)
            .ok_or(TokenizerError::SpecialToken(PAD))?;

        let mut tokenizer = BertTokenizer::new(model);
        tokenizer
            .with_normalizer(BertNormalizer::new(true, true, Some(!accents), lowercase))
            .with_pre_tokenizer(BertPreTokenizer)
            .with_post_processor(BertProcessing::new((SEP.into(), sep), (CLS.into(), cls)))
            .with_truncation(Some(TruncationParams {
                max_length: token_size,
                ..TruncationParams::default()
            }))
            .map_err(|error| TokenizerError::Build(error.to_string()))?
            .with_padding(Some(PaddingParams {
                strategy: PaddingStrategy::Fixed(token_size),
                pad_id: pad,
                pad_token: PAD.into(),
                ..PaddingParams::default()
            }));

        Ok(Tokenizer {
            tokenizer,
            token_size,
        })
    }

    /// Encodes the sequence.
    ///
    /// The encoding is in correct shape for the model.
    pub fn encode(&self, sequence: impl AsRef<str>) -> Result<Encoding, TokenizerError> {
        let encoding = self
            .tokenizer
            .encode(sequence.as_ref(), true)
            .map_err(|error| TokenizerError::Encode(error.to_string()))?;

        let shape: Ix2 = Dim([1, self.token_size]);
        let input_ids = Array2::from_shape_fn(shape, |(_, i)| {
            encoding.get_ids().get(i).copied().unwrap_or(0) as i64
        })
        .into();
        let attention_mask = Array2::from_shape_fn(shape, |(_, i)| {
            encoding.get_attention_mask().get(i).copied().unwrap_or(0) as i64
        })
        .into();

        Ok(Encoding {
            input_ids,
            attention_mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::BufReader};

    use super::*;
    use crate::ndarray::ArrayView;

    fn tokenizer(token_size: usize) -> Tokenizer {
        let vocab = BufReader::new(File::open(test_utils::sentiment::vocab().unwrap()).unwrap());
        let accents = false;
        let lowercase = true;
        Tokenizer::new(vocab, accents, lowercase, token_size).unwrap()
    }

    #[test]
    fn test_encode_short() {
        let shape = (1, 10);
        let encoding = tokenizer(shape.1).encode("a b c").unwrap();
        assert_eq!(
            encoding.input_ids.0,
            ArrayView::from_shape(shape, &[2, 5, 6, 7, 3, 0, 0, 0, 0, 0]).unwrap(),
        );
        assert_eq!(
            encoding.attention_mask.0,
            ArrayView::from_shape(shape, &[1, 1, 1, 1, 1, 0, 0, 0, 0, 0]).unwrap(),
        );
    }

    #[test]
    fn test_encode_long() {
        // truncated to the token size with the separation token last
        let shape = (1, 5);
        let encoding = tokenizer(shape.1).encode("a b c d e f g").unwrap();
        assert_eq!(
            encoding.input_ids.0,
            ArrayView::from_shape(shape, &[2, 5, 6, 7, 3]).unwrap(),
        );
        assert_eq!(
            encoding.attention_mask.0,
            ArrayView::from_shape(shape, &[1, 1, 1, 1, 1]).unwrap(),
        );
    }

    #[test]
    fn test_encode_unknown() {
        let shape = (1, 5);
        let encoding = tokenizer(shape.1).encode("a xyzzy b").unwrap();
        assert_eq!(
            encoding.input_ids.0,
            ArrayView::from_shape(shape, &[2, 5, 1, 6, 3]).unwrap(),
        );
    }

    #[test]
    fn test_encode_lowercase() {
        let shape = (1, 5);
        let encoding = tokenizer(shape.1).encode("A B C").unwrap();
        assert_eq!(
            encoding.input_ids.0,
            ArrayView::from_shape(shape, &[2, 5, 6, 7, 3]).unwrap(),
        );
    }

    #[test]
    fn test_encode_deterministic() {
        let tokenizer = tokenizer(10);
        let first = tokenizer.encode("the market rallied").unwrap();
        let second = tokenizer.encode("the market rallied").unwrap();
        assert_eq!(first.input_ids.0, second.input_ids.0);
        assert_eq!(first.attention_mask.0, second.attention_mask.0);
    }

    #[test]
    fn test_mask_is_binary_prefix() {
        let encoding = tokenizer(16).encode("the market fell sharply").unwrap();
        let mask = encoding.attention_mask.0.row(0).to_vec();
        assert!(mask.iter().all(|mask| *mask == 0 || *mask == 1));
        let ones = mask.iter().take_while(|mask| **mask == 1).count();
        assert!(mask.iter().skip(ones).all(|mask| *mask == 0));
    }
}
