use std::io::{Error as IoError, Read};

use derive_more::{Deref, From};
use displaydoc::Display;
use thiserror::Error;
use tract_onnx::prelude::{
    tvec,
    Datum,
    Framework,
    InferenceFact,
    InferenceModelExt,
    TractError,
    TypedModel,
    TypedSimplePlan,
};

use crate::{
    ndarray::{Array2, Dim, Ix2},
    tokenizer::Encoding,
};

/// A wrapped onnx sequence classification model.
pub struct Model {
    plan: TypedSimplePlan<TypedModel>,
    shape: Ix2,
}

/// The potential errors of the model.
#[derive(Debug, Display, Error)]
pub enum ModelError {
    /// Failed to read the onnx model: {0}
    Read(#[from] IoError),
    /// Failed to run a tract operation: {0}
    Tract(#[from] TractError),
    /// Invalid onnx model shapes
    Shape,
}

/// The predicted classification scores, one per class.
#[derive(Clone, Debug, Deref, From)]
pub struct Logits(pub Array2<f32>);

impl Model {
    /// Creates a model from an onnx model file.
    ///
    /// Requires the token size of the model inputs. The model is expected to take the token ids
    /// and the attention mask and to predict the logits.
    pub fn new(mut model: impl Read, token_size: usize) -> Result<Self, ModelError> {
        let input_fact = InferenceFact::dt_shape(i64::datum_type(), &[1, token_size]);
        let plan = tract_onnx::onnx()
            .model_for_read(&mut model)?
            .with_input_fact(0, input_fact.clone())?
            .with_input_fact(1, input_fact)?
            .into_optimized()?
            .into_runnable()?;

        let shape = plan
            .model()
            .output_fact(0)?
            .shape
            .as_concrete()
            .map(|os| os.get(0..2).map(|os| Dim([os[0], os[1]])))
            .flatten()
            .ok_or(ModelError::Shape)?;
        // input/output shapes are guaranteed to match when a sound onnx model is loaded
        debug_assert_eq!(1, shape[0]);

        Ok(Model { plan, shape })
    }

    /// Runs prediction on the encoded sequence.
    pub fn predict(&self, encoding: Encoding) -> Result<Logits, ModelError> {
        let inputs = tvec!(
            encoding.input_ids.0.into(),
            encoding.attention_mask.0.into()
        );
        let mut outputs = self.plan.run(inputs)?;
        let output = outputs.remove(0);

        let logits = output
            .to_array_view::<f32>()?
            .to_owned()
            .into_dimensionality::<Ix2>()
            .map_err(|_| ModelError::Shape)?;
        debug_assert_eq!(self.shape, logits.raw_dim());

        Ok(logits.into())
    }

    /// Returns the number of classes the model predicts.
    pub fn num_classes(&self) -> usize {
        self.shape[1]
    }
}
