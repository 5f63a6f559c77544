use crate::api::handlers::AppState;
use crate::model::{
    AssociationEdge, DataType, DefinitionRegistry, EntityDefinition, EntityRow, Field,
};
use crate::store::memory::MemoryStore;
use serde_json::json;
use std::sync::Arc;

/// Demo commerce schema: products with a manufacturer (many-to-one), unit
/// prices (one-to-many), categories (many-to-many over a junction) and a
/// translation set keyed by language.
pub fn demo_registry() -> DefinitionRegistry {
    DefinitionRegistry::new()
        .with(EntityDefinition::new(
            "product",
            vec![
                Field::primary_key("id", "id", DataType::String),
                Field::scalar("name", "name", DataType::String),
                Field::scalar("price", "price", DataType::Number),
                Field::scalar("manufacturerId", "manufacturer_id", DataType::String),
                Field::association(
                    "manufacturer",
                    "manufacturer_id",
                    AssociationEdge::ManyToOne {
                        reference_entity: "product_manufacturer".into(),
                        storage_name: "manufacturer_id".into(),
                    },
                ),
                Field::association(
                    "unitPrices",
                    "unit_prices",
                    AssociationEdge::OneToMany {
                        reference_entity: "product_price".into(),
                        reference_field: "product_id".into(),
                    },
                ),
                Field::association(
                    "categories",
                    "categories",
                    AssociationEdge::ManyToMany {
                        reference_entity: "category".into(),
                        mapping_entity: "product_category".into(),
                        mapping_local_column: "product_id".into(),
                        mapping_reference_column: "category_id".into(),
                    },
                ),
                Field::association(
                    "translations",
                    "translations",
                    AssociationEdge::TranslationSet {
                        reference_entity: "product_translation".into(),
                        reference_field: "product_id".into(),
                        language_field: "language_id".into(),
                    },
                ),
            ],
        ))
        .with(EntityDefinition::new(
            "product_manufacturer",
            vec![
                Field::primary_key("id", "id", DataType::String),
                Field::scalar("name", "name", DataType::String),
                Field::association(
                    "products",
                    "products",
                    AssociationEdge::OneToMany {
                        reference_entity: "product".into(),
                        reference_field: "manufacturer_id".into(),
                    },
                ),
            ],
        ))
        .with(EntityDefinition::new(
            "product_price",
            vec![
                Field::primary_key("id", "id", DataType::String),
                Field::scalar("productId", "product_id", DataType::String),
                Field::scalar("price", "price", DataType::Number),
                Field::association(
                    "product",
                    "product_id",
                    AssociationEdge::ManyToOne {
                        reference_entity: "product".into(),
                        storage_name: "product_id".into(),
                    },
                ),
            ],
        ))
        .with(EntityDefinition::new(
            "category",
            vec![
                Field::primary_key("id", "id", DataType::String),
                Field::scalar("name", "name", DataType::String),
                Field::association(
                    "products",
                    "products",
                    AssociationEdge::ManyToMany {
                        reference_entity: "product".into(),
                        mapping_entity: "product_category".into(),
                        mapping_local_column: "category_id".into(),
                        mapping_reference_column: "product_id".into(),
                    },
                ),
            ],
        ))
        .with(EntityDefinition::new(
            "product_category",
            vec![
                Field::primary_key("productId", "product_id", DataType::String),
                Field::primary_key("categoryId", "category_id", DataType::String),
            ],
        ))
        .with(EntityDefinition::new(
            "product_translation",
            vec![
                Field::primary_key("productId", "product_id", DataType::String),
                Field::primary_key("languageId", "language_id", DataType::String),
                Field::scalar("name", "name", DataType::String),
            ],
        ))
        .with(EntityDefinition::new(
            "language",
            vec![
                Field::primary_key("id", "id", DataType::String),
                Field::scalar("name", "name", DataType::String),
            ],
        ))
}

fn row(value: serde_json::Value) -> EntityRow {
    value
        .as_object()
        .expect("seed rows are JSON objects")
        .clone()
}

/// Load a small, self-consistent data set into the store.
pub fn load_seed_data(store: &MemoryStore) {
    store.insert_row(
        "product",
        row(json!({"id": "P1", "name": "Hammer", "price": 9, "manufacturerId": "M1"})),
    );
    store.insert_row(
        "product",
        row(json!({"id": "P2", "name": "Screwdriver", "price": 5, "manufacturerId": "M1"})),
    );
    store.insert_row(
        "product_manufacturer",
        row(json!({"id": "M1", "name": "Acme Tools"})),
    );
    store.insert_row(
        "product_price",
        row(json!({"id": "PR1", "productId": "P1", "price": 8})),
    );
    store.insert_row("category", row(json!({"id": "C1", "name": "tools"})));
    store.insert_row("category", row(json!({"id": "C2", "name": "sale"})));
    store.insert_row(
        "product_category",
        row(json!({"productId": "P1", "categoryId": "C1"})),
    );
    store.insert_row("language", row(json!({"id": "L1", "name": "German"})));
    store.insert_row(
        "product_translation",
        row(json!({"productId": "P1", "languageId": "L1", "name": "Der Hammer"})),
    );
}

/// Registry plus seeded store, ready to serve.
pub fn demo_store(registry: &DefinitionRegistry) -> MemoryStore {
    let store = MemoryStore::new(Arc::new(registry.clone()));
    load_seed_data(&store);
    store
}

/// Complete application state for the demo binary and the HTTP tests.
pub fn demo_state() -> AppState<MemoryStore> {
    let registry = Arc::new(demo_registry());
    let store = MemoryStore::new(registry.clone());
    load_seed_data(&store);
    AppState::new(registry, Arc::new(store))
}
