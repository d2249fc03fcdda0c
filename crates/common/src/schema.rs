//! Model descriptors
//!
//! Every model declares its fields in a [`ModelSchema`]: serialized name,
//! kind, and the directives the generator honours. Preset defaults are not
//! declared here; they come from the model's `Default` implementation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::Category;

/// Lazily produces the schema of a nested model
pub type SchemaFn = fn() -> ModelSchema;

/// Declared type of a field
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    Flag,
    Number,
    /// A single nested model
    Model(SchemaFn),
    /// A list of nested models
    ModelList(SchemaFn),
    /// A list of primitives
    List,
}

/// A single field of a model and its directives
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Filled with a random token when nothing else applies
    pub random: bool,
    /// May stay null when there is no override and no default
    pub optional: bool,
    /// Takes the next value from the override list
    pub parameterizable: bool,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            random: false,
            optional: false,
            parameterizable: false,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn flag(name: &'static str) -> Self {
        Self::new(name, FieldKind::Flag)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn model<M: Model>(name: &'static str) -> Self {
        Self::new(name, FieldKind::Model(M::schema))
    }

    pub fn model_list<M: Model>(name: &'static str) -> Self {
        Self::new(name, FieldKind::ModelList(M::schema))
    }

    pub fn list(name: &'static str) -> Self {
        Self::new(name, FieldKind::List)
    }

    pub fn random(mut self) -> Self {
        self.random = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn param(mut self) -> Self {
        self.parameterizable = true;
        self
    }
}

/// Declarative description of a model type
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: &'static str,
    fields: Vec<Field>,
    defaults: fn() -> serde_json::Result<Value>,
}

impl ModelSchema {
    /// Start a schema for `T`; its `Default` provides the preset values
    pub fn of<T: Model>(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            defaults: default_value::<T>,
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Zero-argument construction of the model as a JSON object
    pub fn instantiate(&self) -> Result<Map<String, Value>> {
        let value = (self.defaults)().map_err(|e| Error::Instantiate {
            model: self.name.to_string(),
            reason: e.to_string(),
        })?;

        match value {
            Value::Object(map) => Ok(map),
            other => Err(Error::Instantiate {
                model: self.name.to_string(),
                reason: format!("default value is not an object: {}", other),
            }),
        }
    }
}

fn default_value<T: Model>() -> serde_json::Result<Value> {
    serde_json::to_value(T::default())
}

/// A domain model the generator can populate
pub trait Model: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    fn schema() -> ModelSchema;
}

/// A model that is a top-level resource of the build server API
pub trait Entity: Model {
    const CATEGORY: Category;
}
