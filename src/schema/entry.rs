//! Entries and field tokens.
//!
//! An [`Entry`] carries one value per top-level field of the model that
//! created it. It remembers the model and schema ids it was created against so
//! that writers can reject entries of a different schema version.

use super::field::FieldKind;
use super::value::Value;
use crate::common::{Error, IdGenerator, ModelId, Result, SchemaId};

/// Handle to a top-level field of an entry.
///
/// Only valid for entries of the schema it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldToken {
    index: usize,
    schema_id: SchemaId,
}

impl FieldToken {
    pub(crate) fn new(index: usize, schema_id: SchemaId) -> Self {
        Self { index, schema_id }
    }

    /// Position among the top-level fields.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Binding {
    name: String,
    type_name: String,
    kind: FieldKind,
    /// `None` until a bare binding is bound.
    value: Option<Value>,
}

/// One row's worth of top-level field values.
///
/// # Example
/// ```
/// use columnardb::schema::{Field, SchemaModel};
/// use columnardb::Value;
///
/// let mut model = SchemaModel::create();
/// model.add_field(Field::new("pt", "float").unwrap()).unwrap();
/// model.freeze();
///
/// let mut entry = model.create_entry().unwrap();
/// let token = model.token("pt").unwrap();
/// entry.bind(token, Value::Float(42.0)).unwrap();
/// assert_eq!(entry.get(token).unwrap(), &Value::Float(42.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    ids: &'static IdGenerator,
    model_id: ModelId,
    schema_id: SchemaId,
    bindings: Vec<Binding>,
}

impl Entry {
    pub(crate) fn new(ids: &'static IdGenerator, model_id: ModelId, schema_id: SchemaId) -> Self {
        Self {
            ids,
            model_id,
            schema_id,
            bindings: Vec::new(),
        }
    }

    pub(crate) fn add_value(
        &mut self,
        name: &str,
        type_name: &str,
        kind: FieldKind,
        value: Option<Value>,
    ) {
        self.bindings.push(Binding {
            name: name.to_string(),
            type_name: type_name.to_string(),
            kind,
            value,
        });
    }

    pub(crate) fn restamp(&mut self, model_id: ModelId, schema_id: SchemaId) {
        self.model_id = model_id;
        self.schema_id = schema_id;
    }

    /// Generator the model and schema ids were drawn from.
    pub(crate) fn id_generator(&self) -> &'static IdGenerator {
        self.ids
    }

    #[inline]
    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    #[inline]
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    /// Number of top-level values.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Token of the top-level field called `name`.
    pub fn token(&self, name: &str) -> Result<FieldToken> {
        self.bindings
            .iter()
            .position(|b| b.name == name)
            .map(|index| FieldToken::new(index, self.schema_id))
            .ok_or_else(|| Error::NoSuchField(name.to_string()))
    }

    fn binding(&self, token: FieldToken) -> Result<&Binding> {
        self.ensure_token(token)?;
        Ok(&self.bindings[token.index])
    }

    fn binding_mut(&mut self, token: FieldToken) -> Result<&mut Binding> {
        self.ensure_token(token)?;
        Ok(&mut self.bindings[token.index])
    }

    fn ensure_token(&self, token: FieldToken) -> Result<()> {
        if token.schema_id != self.schema_id || token.index >= self.bindings.len() {
            return Err(Error::StaleToken {
                token_schema: token.schema_id.0,
                entry_schema: self.schema_id.0,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// The value behind `token`.
    pub fn get(&self, token: FieldToken) -> Result<&Value> {
        let binding = self.binding(token)?;
        binding
            .value
            .as_ref()
            .ok_or_else(|| Error::UnboundValue(binding.name.clone()))
    }

    /// Mutable access to the value behind `token`.
    pub fn get_mut(&mut self, token: FieldToken) -> Result<&mut Value> {
        let binding = self.binding_mut(token)?;
        match &mut binding.value {
            Some(value) => Ok(value),
            None => Err(Error::UnboundValue(binding.name.clone())),
        }
    }

    /// Bind `value` to the field behind `token`, replacing any previous value.
    pub fn bind(&mut self, token: FieldToken, value: Value) -> Result<()> {
        let binding = self.binding_mut(token)?;
        if !value.fits(binding.kind) {
            return Err(Error::ValueTypeMismatch {
                field: binding.name.clone(),
                type_name: binding.type_name.clone(),
            });
        }
        binding.value = Some(value);
        Ok(())
    }

    /// Bind by field name.
    pub fn bind_by_name(&mut self, name: &str, value: Value) -> Result<()> {
        let token = self.token(name)?;
        self.bind(token, value)
    }

    /// Drop the value behind `token`, leaving the field unbound.
    pub fn unbind(&mut self, token: FieldToken) -> Result<Option<Value>> {
        Ok(self.binding_mut(token)?.value.take())
    }

    pub fn is_bound(&self, token: FieldToken) -> Result<bool> {
        Ok(self.binding(token)?.value.is_some())
    }

    /// Name of the first field without a value, if any.
    pub fn first_unbound(&self) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.value.is_none())
            .map(|b| b.name.as_str())
    }

    /// Field names and values in top-level order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.bindings
            .iter()
            .map(|b| (b.name.as_str(), b.value.as_ref()))
    }
}
