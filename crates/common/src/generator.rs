//! Test data generator
//!
//! Populates a model from its [`ModelSchema`] and an ordered list of
//! override values. Fields are resolved in declaration order; the first
//! matching rule wins:
//!
//! 1. optional, no pending override and no preset default: null
//! 2. override-eligible with an override left: take it verbatim
//! 3. random text: fresh random token
//! 4. text, flag or number: keep the preset default, else null when optional
//! 5. model list: keep the default, else one generated model unless optional
//! 6. primitive list: keep the default, else null when optional, else empty
//! 7. nested model: keep the default, else a generated model unless optional
//!
//! Only override-eligible fields consume overrides, so the override
//! branches of rules 4 to 7 are covered by rule 2.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::random::random_string;
use crate::schema::{Field, FieldKind, Model, ModelSchema, SchemaFn};

/// Models generated so far, in generation order.
///
/// A nested model that has to be generated reuses the first known instance
/// of the same model, so a bundle's build configuration points at the
/// bundle's own project.
#[derive(Debug, Clone, Default)]
pub struct KnownModels {
    models: Vec<(&'static str, Value)>,
}

impl KnownModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, model: &'static str, value: Value) {
        self.models.push((model, value));
    }

    /// First known instance of a model
    pub fn find(&self, model: &str) -> Option<&Value> {
        self.models
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, value)| value)
    }

    /// First known instance of `T`, decoded
    pub fn get<T: Model>(&self) -> Option<Result<T>> {
        let schema = T::schema();
        self.find(schema.name())
            .map(|value| serde_json::from_value(value.clone()).map_err(Error::from))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.models.iter().map(|(name, value)| (*name, value))
    }
}

/// Position in the override list of one top-level generate call
struct Cursor<'a> {
    values: &'a [Value],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(values: &'a [Value]) -> Self {
        Self { values, position: 0 }
    }

    fn pending(&self, field: &Field) -> bool {
        field.parameterizable && self.position < self.values.len()
    }

    fn take(&mut self, field: &Field) -> Option<Value> {
        if !self.pending(field) {
            return None;
        }
        let value = self.values[self.position].clone();
        self.position += 1;
        Some(value)
    }

    fn consumed(&self) -> usize {
        self.position
    }
}

/// What to do with a field after resolution
enum Resolved {
    /// Keep the value of the default instance
    Keep,
    Set(Value),
}

/// Generate a `T`, taking overrides positionally for override-eligible fields
pub fn generate<T: Model>(known: &mut KnownModels, overrides: &[Value]) -> Result<T> {
    let schema = T::schema();
    let value = populate(known, &schema, overrides)?;
    decode(&schema, value)
}

/// Generate a `T` with no overrides and nothing known
pub fn generate_default<T: Model>() -> Result<T> {
    generate(&mut KnownModels::new(), &[])
}

/// Populate every nested model field of a bundle type.
///
/// Each field is generated with no overrides, in declaration order, sharing
/// one [`KnownModels`].
pub fn generate_bundle<B: Model>() -> Result<B> {
    let schema = B::schema();
    let mut object = schema.instantiate()?;
    let mut known = KnownModels::new();

    for field in schema.fields() {
        if let FieldKind::Model(nested) = field.kind {
            let value = populate(&mut known, &nested(), &[])?;
            object.insert(field.name.to_string(), value);
        }
    }

    debug!(bundle = schema.name(), models = known.len(), "Generated test data bundle");
    decode(&schema, Value::Object(object))
}

fn populate(known: &mut KnownModels, schema: &ModelSchema, overrides: &[Value]) -> Result<Value> {
    let mut object: Map<String, Value> = schema.instantiate()?;
    let mut cursor = Cursor::new(overrides);

    for field in schema.fields() {
        let preset = object.get(field.name).ok_or_else(|| {
            Error::field(schema.name(), field.name, "not present on the default instance")
        })?;
        let has_default = !preset.is_null();

        if let Resolved::Set(value) = resolve(known, field, has_default, &mut cursor)? {
            object.insert(field.name.to_string(), value);
        }
    }

    debug!(
        model = schema.name(),
        overrides = overrides.len(),
        consumed = cursor.consumed(),
        "Generated model"
    );

    let value = Value::Object(object);
    known.push(schema.name(), value.clone());
    Ok(value)
}

fn resolve(
    known: &mut KnownModels,
    field: &Field,
    has_default: bool,
    cursor: &mut Cursor<'_>,
) -> Result<Resolved> {
    if field.optional && !cursor.pending(field) && !has_default {
        return Ok(Resolved::Set(Value::Null));
    }

    if let Some(value) = cursor.take(field) {
        return Ok(Resolved::Set(value));
    }

    if field.random && matches!(field.kind, FieldKind::Text) {
        return Ok(Resolved::Set(Value::String(random_string())));
    }

    if has_default {
        return Ok(Resolved::Keep);
    }

    let resolved = match field.kind {
        FieldKind::Text | FieldKind::Flag | FieldKind::Number => {
            if field.optional {
                Resolved::Set(Value::Null)
            } else {
                Resolved::Keep
            }
        }
        FieldKind::ModelList(nested) => {
            if field.optional {
                Resolved::Set(Value::Null)
            } else {
                Resolved::Set(Value::Array(vec![nested_model(known, nested)?]))
            }
        }
        FieldKind::List => {
            if field.optional {
                Resolved::Set(Value::Null)
            } else {
                Resolved::Set(Value::Array(Vec::new()))
            }
        }
        FieldKind::Model(nested) => {
            if field.optional {
                Resolved::Set(Value::Null)
            } else {
                Resolved::Set(nested_model(known, nested)?)
            }
        }
    };

    Ok(resolved)
}

fn nested_model(known: &mut KnownModels, nested: SchemaFn) -> Result<Value> {
    let schema = nested();
    if let Some(existing) = known.find(schema.name()) {
        return Ok(existing.clone());
    }
    populate(known, &schema, &[])
}

fn decode<T: Model>(schema: &ModelSchema, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Instantiate {
        model: schema.name().to_string(),
        reason: e.to_string(),
    })
}
