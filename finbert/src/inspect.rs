use std::fmt;

use displaydoc::Display;
use thiserror::Error;
use tract_onnx::pb::{tensor_shape_proto::dimension, type_proto, ModelProto, ValueInfoProto};

/// The potential errors of the inspection.
#[derive(Debug, Display, Error)]
pub enum InspectError {
    /// The onnx model declares no graph
    MissingGraph,
}

/// A declared output tensor of an onnx graph.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputInfo {
    /// The tensor name.
    pub name: String,
    /// The element type name.
    pub elem_type: String,
    /// The declared axes, either fixed sizes or dimension parameters.
    pub dims: Vec<String>,
}

/// Describes the declared outputs of an onnx model.
pub fn describe_outputs(model: &ModelProto) -> Result<Vec<OutputInfo>, InspectError> {
    let graph = model.graph.as_ref().ok_or(InspectError::MissingGraph)?;
    Ok(graph.output.iter().map(OutputInfo::new).collect())
}

impl OutputInfo {
    fn new(info: &ValueInfoProto) -> Self {
        let tensor = info.r#type.as_ref().and_then(|ty| match ty.value.as_ref() {
            Some(type_proto::Value::TensorType(tensor)) => Some(tensor),
            _ => None,
        });
        let elem_type = tensor
            .map(|tensor| elem_type_name(tensor.elem_type))
            .unwrap_or_else(|| "unknown".to_string());
        let dims = tensor
            .and_then(|tensor| tensor.shape.as_ref())
            .map(|shape| {
                shape
                    .dim
                    .iter()
                    .map(|dim| match dim.value.as_ref() {
                        Some(dimension::Value::DimValue(value)) => value.to_string(),
                        Some(dimension::Value::DimParam(param)) => param.clone(),
                        None => "?".to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        OutputInfo {
            name: info.name.clone(),
            elem_type,
            dims,
        }
    }
}

impl fmt::Display for OutputInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dims.is_empty() {
            write!(f, "{} ({})", self.name, self.elem_type)
        } else {
            write!(
                f,
                "{} ({} [{}])",
                self.name,
                self.elem_type,
                self.dims.join(", "),
            )
        }
    }
}

/// Maps an onnx element type to its readable name.
fn elem_type_name(elem_type: i32) -> String {
    let name = match elem_type {
        1 => "float32",
        2 => "uint8",
        3 => "int8",
        4 => "uint16",
        5 => "int16",
        6 => "int32",
        7 => "int64",
        8 => "string",
        9 => "bool",
        10 => "float16",
        11 => "float64",
        12 => "uint32",
        13 => "uint64",
        _ => return format!("unknown({})", elem_type),
    };
    name.to_string()
}
