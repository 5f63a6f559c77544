use crate::model::EntityDefinition;
use std::collections::HashMap;
use std::sync::Arc;

/// Closed mapping from entity names to their definitions. Built once at
/// startup and shared immutably across requests.
#[derive(Debug, Default, Clone)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, Arc<EntityDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: EntityDefinition) {
        self.definitions
            .insert(definition.entity_name.clone(), Arc::new(definition));
    }

    pub fn with(mut self, definition: EntityDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn get(&self, entity_name: &str) -> Option<Arc<EntityDefinition>> {
        self.definitions.get(entity_name).cloned()
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}
