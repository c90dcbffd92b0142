//! JSON render graph descriptions.
//!
//! ```json
//! {
//!     "name": "deferred",
//!     "passes": [
//!         {
//!             "name": "gbuffer",
//!             "outputs": [
//!                 { "type": "attachment", "name": "albedo", "format": "rgba8_unorm",
//!                   "op": "clear", "scale": [1.0, 1.0], "clear_color": [0, 0, 0, 1] },
//!                 { "type": "attachment", "name": "depth", "format": "d32_float",
//!                   "op": "clear", "scale": [1.0, 1.0] }
//!             ]
//!         },
//!         {
//!             "name": "lighting",
//!             "type": "compute",
//!             "inputs": [ { "type": "texture", "name": "albedo" } ],
//!             "outputs": [ { "type": "attachment", "name": "lit", "format": "rgba16_float",
//!                            "op": "dont_care", "scale": [1.0, 1.0] } ]
//!         }
//!     ]
//! }
//! ```

use serde::Deserialize;

use super::{
    GraphError, NodeCreation, NodeType, ResourceInputCreation, ResourceOutputCreation,
    ResourceType,
};
use crate::resources::RenderPassOperation;
use crate::types::TextureFormat;

#[derive(Debug, Deserialize)]
struct GraphJson {
    #[serde(default)]
    name: Option<String>,
    passes: Vec<PassJson>,
}

#[derive(Debug, Deserialize)]
struct PassJson {
    name: String,
    #[serde(default)]
    enabled: Option<EnabledJson>,
    #[serde(default, rename = "type")]
    node_type: Option<String>,
    #[serde(default)]
    inputs: Vec<InputJson>,
    outputs: Vec<OutputJson>,
}

/// `enabled` is written either as a boolean or as 0/1.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnabledJson {
    Bool(bool),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct InputJson {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct OutputJson {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    op: Option<String>,
    #[serde(default)]
    scale: Option<Vec<f32>>,
    #[serde(default)]
    clear_color: Option<Vec<f32>>,
    #[serde(default)]
    clear_depth: Option<f32>,
    #[serde(default)]
    clear_stencil: Option<u32>,
    #[serde(default)]
    size: Option<u64>,
}

/// A parsed graph description.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDescription {
    pub name: Option<String>,
    /// Nodes in declaration order.
    pub nodes: Vec<NodeCreation>,
}

impl GraphDescription {
    /// Parses a JSON description.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidDescription`] for malformed JSON or missing
    /// attachment fields, [`GraphError::UnknownResourceType`] and
    /// [`GraphError::UnknownFormat`] for unrecognised names.
    pub fn parse(json: &str) -> Result<Self, GraphError> {
        let graph: GraphJson = serde_json::from_str(json)
            .map_err(|err| GraphError::InvalidDescription(err.to_string()))?;

        let nodes = graph
            .passes
            .iter()
            .map(parse_pass)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: graph.name,
            nodes,
        })
    }
}

fn parse_pass(pass: &PassJson) -> Result<NodeCreation, GraphError> {
    let node_type = pass
        .node_type
        .as_deref()
        .map_or(NodeType::Graphics, NodeType::from_name);
    let enabled = match pass.enabled {
        None => true,
        Some(EnabledJson::Bool(enabled)) => enabled,
        Some(EnabledJson::Number(value)) => value != 0,
    };

    let mut creation = NodeCreation::new(pass.name.clone(), node_type).with_enabled(enabled);
    for input in &pass.inputs {
        let resource_type = parse_resource_type(&input.resource_type)?;
        creation = creation.with_input(ResourceInputCreation::new(resource_type, &input.name));
    }
    for output in &pass.outputs {
        creation = creation.with_output(parse_output(&pass.name, output)?);
    }
    Ok(creation)
}

fn parse_output(pass: &str, output: &OutputJson) -> Result<ResourceOutputCreation, GraphError> {
    let resource_type = parse_resource_type(&output.resource_type)?;
    let mut creation = ResourceOutputCreation::new(resource_type, &output.name);

    if let Some(format) = &output.format {
        creation.info.format =
            TextureFormat::from_name(format).ok_or_else(|| GraphError::UnknownFormat(format.clone()))?;
    }
    if let Some(scale) = &output.scale {
        let &[scale_x, scale_y] = scale.as_slice() else {
            return Err(GraphError::InvalidDescription(format!(
                "output {} of pass {pass}: scale needs two values, got {}",
                output.name,
                scale.len()
            )));
        };
        creation.info.scale = [scale_x, scale_y];
    }
    if let Some(size) = output.size {
        creation.info.buffer_size = size;
    }

    if resource_type != ResourceType::Attachment {
        return Ok(creation);
    }

    let missing = |field: &str| {
        GraphError::InvalidDescription(format!(
            "attachment {} of pass {pass} is missing `{field}`",
            output.name
        ))
    };
    if output.format.is_none() {
        return Err(missing("format"));
    }
    if output.scale.is_none() {
        return Err(missing("scale"));
    }
    let op = output.op.as_deref().ok_or_else(|| missing("op"))?;
    creation.info.load_op = parse_operation(op)?;

    if creation.info.format.has_depth() {
        creation.info.clear_values[0] = output.clear_depth.unwrap_or(1.0);
        creation.info.clear_values[1] = output.clear_stencil.unwrap_or(0) as f32;
    } else {
        match output.clear_color.as_deref() {
            // Missing trailing components clear to zero.
            Some(values @ [_, ..]) if values.len() <= 4 => {
                creation.info.clear_values = [0.0; 4];
                creation.info.clear_values[..values.len()].copy_from_slice(values);
            }
            Some(other) => {
                return Err(GraphError::InvalidDescription(format!(
                    "attachment {} of pass {pass}: clear_color needs one to four values, got {}",
                    output.name,
                    other.len()
                )));
            }
            None if creation.info.load_op == RenderPassOperation::Clear => {
                log::error!(
                    "Render graph: attachment {} of pass {pass} clears without clear_color, using zero",
                    output.name
                );
            }
            None => {}
        }
    }
    Ok(creation)
}

fn parse_resource_type(name: &str) -> Result<ResourceType, GraphError> {
    ResourceType::from_name(name).ok_or_else(|| GraphError::UnknownResourceType(name.to_string()))
}

/// Accepts `clear`, `load`, `dont_care` and the Vulkan load-op enumerants.
fn parse_operation(name: &str) -> Result<RenderPassOperation, GraphError> {
    match name {
        "clear" | "VK_ATTACHMENT_LOAD_OP_CLEAR" => Ok(RenderPassOperation::Clear),
        "load" | "VK_ATTACHMENT_LOAD_OP_LOAD" => Ok(RenderPassOperation::Load),
        "dont_care" | "VK_ATTACHMENT_LOAD_OP_DONT_CARE" => Ok(RenderPassOperation::DontCare),
        _ => Err(GraphError::InvalidDescription(format!(
            "unknown attachment operation {name}"
        ))),
    }
}
