// Wed Oct 14 2026 - Alex

use crate::database::DatabaseError;
use crate::schema::TypeSchema;
use ahash::AHashMap;
use std::sync::Arc;

/// Source of layouts for already-identified types.
pub trait TypeSchemaRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<TypeSchema>>;
}

/// Registry filled once at startup from generated tables or a JSON export.
#[derive(Default)]
pub struct StaticSchemaRegistry {
    schemas: AHashMap<String, Arc<TypeSchema>>,
}

impl StaticSchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: TypeSchema) {
        self.schemas.insert(schema.name.clone(), Arc::new(schema));
    }

    pub fn with(mut self, schema: TypeSchema) -> Self {
        self.register(schema);
        self
    }

    /// Parses a JSON array of schemas. Method tables cannot be expressed in JSON and stay empty.
    pub fn from_json(json: &str) -> Result<Self, DatabaseError> {
        let schemas: Vec<TypeSchema> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema);
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl TypeSchemaRegistry for StaticSchemaRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<TypeSchema>> {
        self.schemas.get(name).cloned()
    }
}
