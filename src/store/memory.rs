use crate::model::{
    generate_id, AssociationEdge, Criteria, DefinitionRegistry, DeleteResult, Direction,
    EntityDefinition, EntityRow, Filter, Id, Payload, SearchResult, WrittenResult,
};
use crate::store::traits::{Repository, Store};
use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory store backing the repository seam. Rows are plain property
/// maps; equality filters understand direct properties as well as one-hop
/// association paths (`<assocProperty>.id`), which is exactly what the
/// dispatcher's reverse-association filters produce.
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<DefinitionRegistry>,
    tables: RwLock<HashMap<String, Vec<EntityRow>>>,
}

impl MemoryStore {
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                tables: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Insert a raw row, bypassing write events. Seeding only.
    pub fn insert_row(&self, entity: &str, row: EntityRow) {
        self.inner
            .tables
            .write()
            .entry(entity.to_string())
            .or_default()
            .push(row);
    }
}

impl Store for MemoryStore {
    fn repository(&self, entity: &str) -> Option<Arc<dyn Repository>> {
        let definition = self.inner.registry.get(entity)?;
        Some(Arc::new(MemoryRepository {
            definition,
            inner: self.inner.clone(),
        }))
    }
}

struct MemoryRepository {
    definition: Arc<EntityDefinition>,
    inner: Arc<Inner>,
}

/// Normalize a JSON value for equality checks: strings compare by content,
/// everything else by its JSON rendering. Query parameters always arrive as
/// strings, so `"42"` matches a numeric `42` column.
fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    a == b || value_key(a) == value_key(b)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        (Some(_), None) => return Ordering::Greater,
        (None, Some(_)) => return Ordering::Less,
        (None, None) => return Ordering::Equal,
    };
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => value_key(a).cmp(&value_key(b)),
    }
}

impl MemoryRepository {
    fn row_id(row: &EntityRow) -> Option<&Value> {
        row.get("id")
    }

    fn matches_filter(&self, tables: &HashMap<String, Vec<EntityRow>>, row: &EntityRow, filter: &Filter) -> bool {
        let Filter::Equals { field, value } = filter;

        // Filters may be prefixed with the entity name (`product.name`).
        let field = field
            .strip_prefix(&format!("{}.", self.definition.entity_name))
            .unwrap_or(field);

        match field.split_once('.') {
            None => row.get(field).is_some_and(|v| value_eq(v, value)),
            Some((property, "id")) => self.matches_association(tables, row, property, value),
            Some(_) => false,
        }
    }

    fn matches_association(
        &self,
        tables: &HashMap<String, Vec<EntityRow>>,
        row: &EntityRow,
        property: &str,
        target_id: &Value,
    ) -> bool {
        let Some(edge) = self.definition.association(property) else {
            return false;
        };
        let registry = &self.inner.registry;

        match edge {
            AssociationEdge::ManyToOne { storage_name, .. } => {
                let Some(fk) = self.definition.field_by_storage_name(storage_name) else {
                    return false;
                };
                row.get(&fk.property_name)
                    .is_some_and(|v| value_eq(v, target_id))
            }
            AssociationEdge::OneToMany {
                reference_entity,
                reference_field,
            }
            | AssociationEdge::TranslationSet {
                reference_entity,
                reference_field,
                ..
            } => {
                let Some(reference) = registry.get(reference_entity) else {
                    return false;
                };
                let Some(fk) = reference.field_by_storage_name(reference_field) else {
                    return false;
                };
                let Some(own_id) = Self::row_id(row) else {
                    return false;
                };
                tables
                    .get(reference_entity)
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                    .iter()
                    .any(|child| {
                        child.get("id").is_some_and(|v| value_eq(v, target_id))
                            && child
                                .get(&fk.property_name)
                                .is_some_and(|v| value_eq(v, own_id))
                    })
            }
            AssociationEdge::ManyToMany {
                mapping_entity,
                mapping_local_column,
                mapping_reference_column,
                ..
            } => {
                let Some(mapping) = registry.get(mapping_entity) else {
                    return false;
                };
                let (Some(local), Some(reference)) = (
                    mapping.field_by_storage_name(mapping_local_column),
                    mapping.field_by_storage_name(mapping_reference_column),
                ) else {
                    return false;
                };
                let Some(own_id) = Self::row_id(row) else {
                    return false;
                };
                tables
                    .get(mapping_entity)
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                    .iter()
                    .any(|link| {
                        link.get(&local.property_name)
                            .is_some_and(|v| value_eq(v, own_id))
                            && link
                                .get(&reference.property_name)
                                .is_some_and(|v| value_eq(v, target_id))
                    })
            }
        }
    }

    /// Split a write payload into scalar columns and many-to-many link
    /// instructions. Link entries accept `[{"id": ..}, ..]` or `{"id": ..}`.
    fn split_payload(&self, payload: Payload) -> (EntityRow, Vec<(AssociationEdge, Vec<Id>)>) {
        let mut row = EntityRow::new();
        let mut links = Vec::new();

        for (key, value) in payload {
            match self.definition.association(&key) {
                Some(edge @ AssociationEdge::ManyToMany { .. }) => {
                    let ids = match &value {
                        Value::Array(items) => items.iter().filter_map(link_id).collect(),
                        single => link_id(single).into_iter().collect(),
                    };
                    links.push((edge.clone(), ids));
                }
                _ => {
                    row.insert(key, value);
                }
            }
        }

        (row, links)
    }

    /// Attach requested association values to result rows: to-one edges as
    /// an object (or null), to-many edges as an array of rows. Unknown
    /// property names are ignored.
    fn hydrate(
        &self,
        tables: &HashMap<String, Vec<EntityRow>>,
        rows: &mut [EntityRow],
        associations: &[String],
    ) {
        for property in associations {
            let Some(edge) = self.definition.association(property) else {
                continue;
            };
            for row in rows.iter_mut() {
                let value = self.association_value(tables, row, edge);
                row.insert(property.clone(), value);
            }
        }
    }

    fn association_value(
        &self,
        tables: &HashMap<String, Vec<EntityRow>>,
        row: &EntityRow,
        edge: &AssociationEdge,
    ) -> Value {
        let registry = &self.inner.registry;

        match edge {
            AssociationEdge::ManyToOne {
                reference_entity,
                storage_name,
            } => {
                let target = self
                    .definition
                    .field_by_storage_name(storage_name)
                    .and_then(|fk| row.get(&fk.property_name));
                let Some(target) = target else {
                    return Value::Null;
                };
                tables
                    .get(reference_entity)
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                    .iter()
                    .find(|r| r.get("id").is_some_and(|v| value_eq(v, target)))
                    .map(|r| Value::Object(r.clone()))
                    .unwrap_or(Value::Null)
            }
            AssociationEdge::OneToMany {
                reference_entity,
                reference_field,
            }
            | AssociationEdge::TranslationSet {
                reference_entity,
                reference_field,
                ..
            } => {
                let foreign_key = registry
                    .get(reference_entity)
                    .and_then(|r| r.field_by_storage_name(reference_field).cloned());
                let (Some(foreign_key), Some(own_id)) = (foreign_key, Self::row_id(row)) else {
                    return Value::Array(Vec::new());
                };
                Value::Array(
                    tables
                        .get(reference_entity)
                        .map(Vec::as_slice)
                        .unwrap_or_default()
                        .iter()
                        .filter(|child| {
                            child
                                .get(&foreign_key.property_name)
                                .is_some_and(|v| value_eq(v, own_id))
                        })
                        .cloned()
                        .map(Value::Object)
                        .collect(),
                )
            }
            AssociationEdge::ManyToMany {
                reference_entity,
                mapping_entity,
                mapping_local_column,
                mapping_reference_column,
            } => {
                let columns = registry.get(mapping_entity).and_then(|mapping| {
                    Some((
                        mapping
                            .field_by_storage_name(mapping_local_column)?
                            .property_name
                            .clone(),
                        mapping
                            .field_by_storage_name(mapping_reference_column)?
                            .property_name
                            .clone(),
                    ))
                });
                let (Some((local, reference)), Some(own_id)) = (columns, Self::row_id(row)) else {
                    return Value::Array(Vec::new());
                };
                let linked: Vec<&Value> = tables
                    .get(mapping_entity)
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                    .iter()
                    .filter(|link| link.get(&local).is_some_and(|v| value_eq(v, own_id)))
                    .filter_map(|link| link.get(&reference))
                    .collect();
                Value::Array(
                    tables
                        .get(reference_entity)
                        .map(Vec::as_slice)
                        .unwrap_or_default()
                        .iter()
                        .filter(|r| {
                            r.get("id")
                                .is_some_and(|id| linked.iter().any(|l| value_eq(l, id)))
                        })
                        .cloned()
                        .map(Value::Object)
                        .collect(),
                )
            }
        }
    }

    fn apply_links(
        &self,
        tables: &mut HashMap<String, Vec<EntityRow>>,
        own_id: &Value,
        links: Vec<(AssociationEdge, Vec<Id>)>,
    ) -> Result<()> {
        for (edge, ids) in links {
            let AssociationEdge::ManyToMany {
                mapping_entity,
                mapping_local_column,
                mapping_reference_column,
                ..
            } = edge
            else {
                continue;
            };
            let mapping = self
                .inner
                .registry
                .get(&mapping_entity)
                .ok_or_else(|| anyhow!("unknown mapping entity {mapping_entity}"))?;
            let local = mapping
                .field_by_storage_name(&mapping_local_column)
                .ok_or_else(|| anyhow!("unknown mapping column {mapping_local_column}"))?
                .property_name
                .clone();
            let reference = mapping
                .field_by_storage_name(&mapping_reference_column)
                .ok_or_else(|| anyhow!("unknown mapping column {mapping_reference_column}"))?
                .property_name
                .clone();

            let table = tables.entry(mapping_entity).or_default();
            for id in ids {
                let target = Value::String(id);
                let exists = table.iter().any(|link| {
                    link.get(&local).is_some_and(|v| value_eq(v, own_id))
                        && link.get(&reference).is_some_and(|v| value_eq(v, &target))
                });
                // Link upserts are idempotent.
                if !exists {
                    let mut link = EntityRow::new();
                    link.insert(local.clone(), own_id.clone());
                    link.insert(reference.clone(), target);
                    table.push(link);
                }
            }
        }
        Ok(())
    }
}

fn link_id(value: &Value) -> Option<Id> {
    match value {
        Value::Object(map) => map.get("id").map(|id| value_key(id)),
        Value::String(id) => Some(id.clone()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl Repository for MemoryRepository {
    async fn search(&self, criteria: &Criteria) -> Result<SearchResult> {
        let tables = self.inner.tables.read();
        let mut rows: Vec<EntityRow> = tables
            .get(&self.definition.entity_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(|row| {
                criteria
                    .filters
                    .iter()
                    .all(|filter| self.matches_filter(&tables, row, filter))
            })
            .cloned()
            .collect();

        for sorting in criteria.sort.iter().rev() {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&sorting.field), b.get(&sorting.field));
                match sorting.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let total = rows.len();
        if let Some(limit) = criteria.limit {
            let offset = criteria
                .page
                .map(|p| p.saturating_sub(1).saturating_mul(limit))
                .unwrap_or(0);
            rows = rows.into_iter().skip(offset).take(limit).collect();
        }

        self.hydrate(&tables, &mut rows, &criteria.associations);

        Ok(SearchResult { rows, total })
    }

    async fn read(&self, ids: &[Id]) -> Result<Vec<EntityRow>> {
        let tables = self.inner.tables.read();
        let rows = tables
            .get(&self.definition.entity_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(|row| {
                row.get("id")
                    .is_some_and(|v| ids.iter().any(|id| value_key(v) == *id))
            })
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn create(&self, payloads: Vec<Payload>) -> Result<WrittenResult> {
        let mut tables = self.inner.tables.write();
        let mut ids = Vec::new();

        for payload in payloads {
            let (mut row, links) = self.split_payload(payload);
            let id = match row.get("id") {
                Some(id) => value_key(id),
                None => generate_id(),
            };
            row.insert("id".to_string(), Value::String(id.clone()));
            let own_id = Value::String(id.clone());

            // A known id finds the existing row and merges into it; the
            // primary key is never duplicated.
            {
                let table = tables
                    .entry(self.definition.entity_name.clone())
                    .or_default();
                match table
                    .iter_mut()
                    .find(|r| r.get("id").is_some_and(|v| value_eq(v, &own_id)))
                {
                    Some(existing) => {
                        for (key, value) in row {
                            existing.insert(key, value);
                        }
                    }
                    None => table.push(row),
                }
            }
            self.apply_links(&mut tables, &own_id, links)?;
            ids.push(id);
        }

        Ok(WrittenResult::single(&self.definition.entity_name, ids))
    }

    async fn update(&self, payloads: Vec<Payload>) -> Result<WrittenResult> {
        let mut tables = self.inner.tables.write();
        let mut ids = Vec::new();

        for payload in payloads {
            let (row, links) = self.split_payload(payload);
            let id = row
                .get("id")
                .map(value_key)
                .ok_or_else(|| anyhow!("update payload is missing an id"))?;
            let own_id = Value::String(id.clone());

            {
                let table = tables
                    .entry(self.definition.entity_name.clone())
                    .or_default();
                let existing = table
                    .iter_mut()
                    .find(|r| r.get("id").is_some_and(|v| value_eq(v, &own_id)))
                    .ok_or_else(|| {
                        anyhow!(
                            "{} with id {} does not exist",
                            self.definition.entity_name,
                            id
                        )
                    })?;
                for (key, value) in row {
                    existing.insert(key, value);
                }
            }
            self.apply_links(&mut tables, &own_id, links)?;
            ids.push(id);
        }

        Ok(WrittenResult::single(&self.definition.entity_name, ids))
    }

    async fn delete(&self, primary_keys: Vec<Payload>) -> Result<DeleteResult> {
        let mut tables = self.inner.tables.write();
        let table = tables
            .entry(self.definition.entity_name.clone())
            .or_default();
        let mut errors = Vec::new();

        for key_map in primary_keys {
            let before = table.len();
            table.retain(|row| {
                !key_map
                    .iter()
                    .all(|(key, value)| row.get(key).is_some_and(|v| value_eq(v, value)))
            });
            if table.len() == before {
                errors.push(format!(
                    "no {} row matched {}",
                    self.definition.entity_name,
                    Value::Object(key_map)
                ));
            }
        }

        Ok(DeleteResult { errors })
    }

    async fn clone_entity(&self, id: &Id) -> Result<WrittenResult> {
        let mut tables = self.inner.tables.write();
        let table = tables
            .entry(self.definition.entity_name.clone())
            .or_default();
        let target = Value::String(id.clone());

        let Some(source) = table
            .iter()
            .find(|row| row.get("id").is_some_and(|v| value_eq(v, &target)))
            .cloned()
        else {
            // No written event: the caller reports NoEntityCloned.
            return Ok(WrittenResult::default());
        };

        let mut copy = source;
        let new_id = generate_id();
        copy.insert("id".to_string(), Value::String(new_id.clone()));
        table.push(copy);

        Ok(WrittenResult::single(
            &self.definition.entity_name,
            vec![new_id],
        ))
    }
}
