use crate::api::error::ApiError;
use crate::model::{AssociationEdge, DefinitionRegistry, EntityDefinition, Id};
use itertools::Itertools;
use std::sync::Arc;

/// One hop in a resolved URL-to-schema chain. The root segment carries no
/// edge; every later segment records the association that was traversed to
/// reach it. For many-to-many hops `definition` is the reference-side
/// definition, never the junction.
#[derive(Debug, Clone)]
pub struct PathSegment {
    pub entity: String,
    pub value: Option<Id>,
    pub definition: Arc<EntityDefinition>,
    pub edge: Option<AssociationEdge>,
}

/// URL path names use kebab-case; entity names use snake_case.
fn url_to_snake_case(name: &str) -> String {
    name.replace('-', "_")
}

/// URL path names use kebab-case; association properties use camelCase.
fn url_to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (index, part) in name.split('-').enumerate() {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if index > 0 => {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
            Some(first) => {
                out.extend(first.to_lowercase());
                out.push_str(chars.as_str());
            }
            None => {}
        }
    }
    out
}

/// Parse a slash-delimited resource path into an ordered segment chain,
/// validating every hop against the registry. Alternating tokens pair up as
/// (association name, identifier); empty tokens are dropped before pairing.
///
/// The walk is an explicit loop with a "current definition" accumulator, so
/// resolution depth never turns into recursion depth.
pub fn resolve(
    registry: &DefinitionRegistry,
    root_entity: &str,
    path: &str,
) -> Result<Vec<PathSegment>, ApiError> {
    let combined = format!("{}/{}", root_entity, path.trim_start_matches('/'));
    let tokens: Vec<&str> = combined.split('/').filter(|t| !t.is_empty()).collect();

    let mut pairs = tokens
        .chunks(2)
        .map(|pair| (pair[0], pair.get(1).map(|v| v.to_string())));

    let (first, root_value) = pairs.next().ok_or_else(|| ApiError::DefinitionNotFound {
        entity: root_entity.to_string(),
    })?;
    let root_name = url_to_snake_case(first);
    let root = registry
        .get(&root_name)
        .ok_or_else(|| ApiError::DefinitionNotFound {
            entity: root_name.clone(),
        })?;

    let mut segments = vec![PathSegment {
        entity: root_name,
        value: root_value,
        definition: root.clone(),
        edge: None,
    }];
    let mut current = root;

    for (token, value) in pairs {
        let property = url_to_camel_case(token);
        let Some(edge) = current.association(&property) else {
            let path = segments
                .iter()
                .map(|segment| segment.entity.as_str())
                .chain(std::iter::once(property.as_str()))
                .join(".");
            return Err(ApiError::PathNotFound { path });
        };
        let edge = edge.clone();

        // Many-to-many advances to the far side of the junction; every other
        // kind advances to its reference definition.
        let next = registry.get(edge.reference_entity()).ok_or_else(|| {
            ApiError::Unsupported(format!(
                "association {} references unregistered entity {}",
                property,
                edge.reference_entity()
            ))
        })?;

        segments.push(PathSegment {
            entity: property,
            value,
            definition: next.clone(),
            edge: Some(edge),
        });
        current = next;
    }

    Ok(segments)
}
