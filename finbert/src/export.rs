use std::{
    collections::HashSet,
    io::{Error as IoError, Read, Write},
};

use displaydoc::Display;
use prost::Message;
use thiserror::Error;
use tract_onnx::pb::{
    tensor_shape_proto::{dimension, Dimension},
    type_proto,
    GraphProto,
    ModelProto,
    OperatorSetIdProto,
    TensorShapeProto,
    TypeProto,
    ValueInfoProto,
};

/// The declared name of the token ids input tensor.
pub const INPUT_IDS: &str = "input_ids";
/// The declared name of the attention mask input tensor.
pub const ATTENTION_MASK: &str = "attention_mask";
/// The declared name of the logits output tensor.
pub const LOGITS: &str = "logits";
/// The dimension parameter declared for the dynamic batch axis.
pub const BATCH_DIM: &str = "batch_size";
/// The declared onnx operator set version.
pub const OPSET_VERSION: i64 = 12;

/// The int64 element type of the onnx type system.
const INT64: i32 = 7;

/// An export of a pretrained sequence classification graph to the fixed inference contract.
///
/// The raw pretrained graph is restricted to its logits output, the dead branches are pruned,
/// the input tensors are renamed and all three named tensors get a dynamic batch axis.
#[derive(Debug)]
pub struct Export {
    token_size: usize,
}

/// The potential errors of the export.
#[derive(Debug, Display, Error)]
pub enum ExportError {
    /// The token size must be at least two to allow for special tokens
    TokenSize,
    /// Failed to read the onnx model: {0}
    Read(#[from] IoError),
    /// Failed to decode the onnx model: {0}
    Decode(#[from] prost::DecodeError),
    /// Failed to encode the onnx model: {0}
    Encode(#[from] prost::EncodeError),
    /// The onnx model declares no graph
    MissingGraph,
    /// The graph declares no outputs
    NoOutputs,
    /// The graph declares {0} data inputs instead of two
    Inputs(usize),
    /// The tensor `{0}` has a non-tensor type declaration
    TensorType(String),
}

/// A summary of a graph rewrite.
#[derive(Clone, Copy, Debug)]
pub struct ExportSummary {
    /// The number of nodes kept in the graph.
    pub kept_nodes: usize,
    /// The number of nodes unreachable from the logits output.
    pub pruned_nodes: usize,
    /// The number of initializers without remaining references.
    pub pruned_initializers: usize,
}

impl Export {
    /// Creates an export for the given fixed token size.
    ///
    /// # Errors
    /// Fails if `token_size` is less than two.
    pub fn new(token_size: usize) -> Result<Self, ExportError> {
        if token_size < 2 {
            Err(ExportError::TokenSize)
        } else {
            Ok(Export { token_size })
        }
    }

    /// Rewrites the model in place to the fixed inference contract.
    pub fn rewrite(&self, model: &mut ModelProto) -> Result<ExportSummary, ExportError> {
        let graph = model.graph.as_mut().ok_or(ExportError::MissingGraph)?;
        select_logits_output(graph)?;
        let summary = prune_unreachable(graph);
        rename_inputs(graph)?;
        declare_axes(graph, self.token_size)?;
        stamp_opset(model);

        Ok(summary)
    }
}

/// Reads an onnx model from its protobuf serialization.
pub fn read_model(mut reader: impl Read) -> Result<ModelProto, ExportError> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    ModelProto::decode(buffer.as_slice()).map_err(Into::into)
}

/// Writes an onnx model as its protobuf serialization.
pub fn write_model(model: &ModelProto, mut writer: impl Write) -> Result<(), ExportError> {
    let mut buffer = Vec::with_capacity(model.encoded_len());
    model.encode(&mut buffer)?;
    writer.write_all(&buffer).map_err(Into::into)
}

/// Restricts the declared outputs to the logits and renames it if necessary.
///
/// Prefers an output already named accordingly, otherwise the primary (first) output is taken.
fn select_logits_output(graph: &mut GraphProto) -> Result<(), ExportError> {
    if graph.output.is_empty() {
        return Err(ExportError::NoOutputs);
    }

    let index = graph
        .output
        .iter()
        .position(|output| output.name == LOGITS)
        .unwrap_or(0);
    let mut kept = graph.output.remove(index);
    rename_references(graph, &kept.name.clone(), LOGITS);
    kept.name = LOGITS.to_string();
    graph.output = vec![kept];

    Ok(())
}

/// Drops all nodes which do not contribute to the declared outputs.
///
/// Initializers and intermediate value infos without remaining references are dropped as well.
/// The relative order of the kept nodes is preserved.
fn prune_unreachable(graph: &mut GraphProto) -> ExportSummary {
    let mut needed = graph
        .output
        .iter()
        .map(|output| output.name.clone())
        .collect::<HashSet<_>>();

    // nodes are topologically sorted in a valid onnx graph
    let mut kept = vec![false; graph.node.len()];
    for (index, node) in graph.node.iter().enumerate().rev() {
        if node.output.iter().any(|output| needed.contains(output)) {
            kept[index] = true;
            needed.extend(node.input.iter().cloned());
        }
    }

    let total = graph.node.len();
    let mut index = 0;
    graph.node.retain(|_| {
        let keep = kept[index];
        index += 1;
        keep
    });

    let initializers = graph.initializer.len();
    graph
        .initializer
        .retain(|initializer| needed.contains(&initializer.name));
    graph.value_info.retain(|info| needed.contains(&info.name));

    ExportSummary {
        kept_nodes: graph.node.len(),
        pruned_nodes: total - graph.node.len(),
        pruned_initializers: initializers - graph.initializer.len(),
    }
}

/// Renames the two data inputs to the declared contract names.
///
/// Inputs backed by an initializer don't count as data inputs.
fn rename_inputs(graph: &mut GraphProto) -> Result<(), ExportError> {
    let initializers = graph
        .initializer
        .iter()
        .map(|initializer| initializer.name.clone())
        .collect::<HashSet<_>>();
    let data_inputs = (0..graph.input.len())
        .filter(|index| !initializers.contains(&graph.input[*index].name))
        .collect::<Vec<_>>();
    if data_inputs.len() != 2 {
        return Err(ExportError::Inputs(data_inputs.len()));
    }

    for (index, name) in data_inputs.into_iter().zip(&[INPUT_IDS, ATTENTION_MASK]) {
        let old = graph.input[index].name.clone();
        if old != *name {
            rename_references(graph, &old, name);
            graph.input[index].name = name.to_string();
        }
    }

    Ok(())
}

/// Renames all node references to a tensor.
fn rename_references(graph: &mut GraphProto, old: &str, new: &str) {
    for node in graph.node.iter_mut() {
        for input in node.input.iter_mut() {
            if input == old {
                *input = new.to_string();
            }
        }
        for output in node.output.iter_mut() {
            if output == old {
                *output = new.to_string();
            }
        }
    }
}

/// Declares the dynamic batch axis on the named tensors.
///
/// The inputs additionally get the fixed token size as their second axis, the remaining output
/// axes (the number of classes) are left untouched.
fn declare_axes(graph: &mut GraphProto, token_size: usize) -> Result<(), ExportError> {
    let initializers = graph
        .initializer
        .iter()
        .map(|initializer| initializer.name.clone())
        .collect::<HashSet<_>>();

    for input in graph.input.iter_mut() {
        if initializers.contains(&input.name) {
            continue;
        }
        let tensor = tensor_type_mut(input)?;
        if tensor.elem_type == 0 {
            tensor.elem_type = INT64;
        }
        tensor.shape = Some(TensorShapeProto {
            dim: vec![dim_param(BATCH_DIM), dim_value(token_size as i64)],
        });
    }

    for output in graph.output.iter_mut() {
        let tensor = tensor_type_mut(output)?;
        let shape = tensor.shape.get_or_insert_with(TensorShapeProto::default);
        if shape.dim.is_empty() {
            shape.dim.push(dim_param(BATCH_DIM));
        } else {
            shape.dim[0] = dim_param(BATCH_DIM);
        }
    }

    Ok(())
}

/// Declares the operator set version for the default domain.
fn stamp_opset(model: &mut ModelProto) {
    if let Some(opset) = model
        .opset_import
        .iter_mut()
        .find(|opset| opset.domain.is_empty())
    {
        opset.version = OPSET_VERSION;
    } else {
        model.opset_import.push(OperatorSetIdProto {
            domain: String::new(),
            version: OPSET_VERSION,
        });
    }
}

/// Gets the mutable tensor type of a tensor declaration.
fn tensor_type_mut(info: &mut ValueInfoProto) -> Result<&mut type_proto::Tensor, ExportError> {
    let value = info
        .r#type
        .get_or_insert_with(TypeProto::default)
        .value
        .get_or_insert_with(|| type_proto::Value::TensorType(type_proto::Tensor::default()));
    match value {
        type_proto::Value::TensorType(tensor) => Ok(tensor),
        _ => Err(ExportError::TensorType(info.name.clone())),
    }
}

/// Creates a named dynamic dimension.
fn dim_param(name: &str) -> Dimension {
    Dimension {
        value: Some(dimension::Value::DimParam(name.to_string())),
        ..Dimension::default()
    }
}

/// Creates a fixed dimension.
fn dim_value(value: i64) -> Dimension {
    Dimension {
        value: Some(dimension::Value::DimValue(value)),
        ..Dimension::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{tiny_model_proto, TINY_NUM_CLASSES, TINY_TOKEN_SIZE};

    fn rewritten() -> (ModelProto, ExportSummary) {
        let mut model = tiny_model_proto();
        let summary = Export::new(TINY_TOKEN_SIZE).unwrap().rewrite(&mut model).unwrap();
        (model, summary)
    }

    fn dims(info: &ValueInfoProto) -> Vec<Option<dimension::Value>> {
        match info.r#type.as_ref().unwrap().value.as_ref().unwrap() {
            type_proto::Value::TensorType(tensor) => tensor
                .shape
                .as_ref()
                .unwrap()
                .dim
                .iter()
                .map(|dim| dim.value.clone())
                .collect(),
            _ => panic!("non-tensor type"),
        }
    }

    #[test]
    fn test_token_size_too_small() {
        assert!(matches!(Export::new(1).unwrap_err(), ExportError::TokenSize));
    }

    #[test]
    fn test_single_logits_output() {
        let (model, _) = rewritten();
        let graph = model.graph.as_ref().unwrap();
        assert_eq!(graph.output.len(), 1);
        assert_eq!(graph.output[0].name, LOGITS);
        assert_eq!(
            dims(&graph.output[0]),
            [
                Some(dimension::Value::DimParam(BATCH_DIM.to_string())),
                Some(dimension::Value::DimValue(TINY_NUM_CLASSES as i64)),
            ],
        );
    }

    #[test]
    fn test_inputs_renamed_with_dynamic_batch() {
        let (model, _) = rewritten();
        let graph = model.graph.as_ref().unwrap();
        assert_eq!(graph.input.len(), 2);
        assert_eq!(graph.input[0].name, INPUT_IDS);
        assert_eq!(graph.input[1].name, ATTENTION_MASK);
        for input in &graph.input {
            assert_eq!(
                dims(input),
                [
                    Some(dimension::Value::DimParam(BATCH_DIM.to_string())),
                    Some(dimension::Value::DimValue(TINY_TOKEN_SIZE as i64)),
                ],
            );
        }
    }

    #[test]
    fn test_references_follow_renames() {
        let (model, _) = rewritten();
        let graph = model.graph.as_ref().unwrap();
        assert!(graph
            .node
            .iter()
            .any(|node| node.input.iter().any(|input| input == INPUT_IDS)));
        assert!(graph
            .node
            .iter()
            .any(|node| node.input.iter().any(|input| input == ATTENTION_MASK)));
        assert!(graph
            .node
            .iter()
            .any(|node| node.output.iter().any(|output| output == LOGITS)));
    }

    #[test]
    fn test_dead_branch_pruned() {
        let (model, summary) = rewritten();
        let graph = model.graph.as_ref().unwrap();
        // the debug identity branch is unreachable from the logits
        assert_eq!(summary.pruned_nodes, 1);
        assert_eq!(summary.pruned_initializers, 0);
        assert_eq!(summary.kept_nodes, graph.node.len());
        assert!(graph.node.iter().all(|node| node.op_type != "Identity"));
    }

    #[test]
    fn test_opset_stamped() {
        let (model, _) = rewritten();
        let opset = model
            .opset_import
            .iter()
            .find(|opset| opset.domain.is_empty())
            .unwrap();
        assert_eq!(opset.version, OPSET_VERSION);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let (mut model, _) = rewritten();
        let summary = Export::new(TINY_TOKEN_SIZE)
            .unwrap()
            .rewrite(&mut model)
            .unwrap();
        assert_eq!(summary.pruned_nodes, 0);
        let graph = model.graph.as_ref().unwrap();
        assert_eq!(graph.output[0].name, LOGITS);
        assert_eq!(graph.input[0].name, INPUT_IDS);
    }

    #[test]
    fn test_rewritten_model_still_loads() {
        let (model, _) = rewritten();
        let mut bytes = Vec::new();
        write_model(&model, &mut bytes).unwrap();
        let reread = read_model(bytes.as_slice()).unwrap();
        assert_eq!(reread.graph.as_ref().unwrap().output[0].name, LOGITS);

        let model = crate::model::Model::new(bytes.as_slice(), TINY_TOKEN_SIZE).unwrap();
        assert_eq!(model.num_classes(), TINY_NUM_CLASSES);
    }

    #[test]
    fn test_missing_graph() {
        let mut model = ModelProto::default();
        assert!(matches!(
            Export::new(TINY_TOKEN_SIZE).unwrap().rewrite(&mut model).unwrap_err(),
            ExportError::MissingGraph,
        ));
    }

    #[test]
    fn test_no_outputs() {
        let mut model = tiny_model_proto();
        model.graph.as_mut().unwrap().output.clear();
        assert!(matches!(
            Export::new(TINY_TOKEN_SIZE).unwrap().rewrite(&mut model).unwrap_err(),
            ExportError::NoOutputs,
        ));
    }

    #[test]
    fn test_wrong_input_count() {
        let mut model = tiny_model_proto();
        model.graph.as_mut().unwrap().input.pop();
        assert!(matches!(
            Export::new(TINY_TOKEN_SIZE).unwrap().rewrite(&mut model).unwrap_err(),
            ExportError::Inputs(1),
        ));
    }
}
