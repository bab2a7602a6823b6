//! Dataset descriptors.
//!
//! A [`Descriptor`] is the serializable summary of a dataset: its name, the
//! feature flags it uses, its field tree and its entry count. Field 0 is the
//! zero field. Fields added after the header was written form the *schema
//! extension*; each of them records the first entry it is populated from.

use std::collections::{HashMap, HashSet};

use super::feature::FeatureFlags;
use crate::common::{Error, Result};
use crate::schema::{
    ensure_array_size, validate_field_name, Changeset, Field, FieldId, FieldKind, FieldTree,
    PrimitiveType, SchemaModel, Structure, CARDINALITY_TYPE_NAME, MAX_ARRAY_ELEMENTS,
};

/// One field of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    id: u64,
    parent_id: u64,
    name: String,
    type_name: String,
    structure: Structure,
    repetition: u64,
    projection_source: Option<u64>,
    first_entry: Option<u64>,
    children: Vec<u64>,
}

impl FieldDescriptor {
    /// Describe a top-level field. The id is assigned by the builder.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        structure: Structure,
    ) -> Self {
        Self {
            id: 0,
            parent_id: 0,
            name: name.into(),
            type_name: type_name.into(),
            structure,
            repetition: 0,
            projection_source: None,
            first_entry: None,
            children: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: u64) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_repetition(mut self, repetition: u64) -> Self {
        self.repetition = repetition;
        self
    }

    pub fn with_projection_source(mut self, source_id: u64) -> Self {
        self.projection_source = Some(source_id);
        self
    }

    pub fn with_first_entry(mut self, first_entry: u64) -> Self {
        self.first_entry = Some(first_entry);
        self
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Parent field id. The zero field is its own parent.
    #[inline]
    pub fn parent_id(&self) -> u64 {
        self.parent_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn structure(&self) -> Structure {
        self.structure
    }

    #[inline]
    pub fn repetition(&self) -> u64 {
        self.repetition
    }

    pub fn projection_source(&self) -> Option<u64> {
        self.projection_source
    }

    #[inline]
    pub fn is_projected(&self) -> bool {
        self.projection_source.is_some()
    }

    /// First entry that carries this field, for schema extension fields.
    pub fn first_entry(&self) -> Option<u64> {
        self.first_entry
    }

    pub fn children(&self) -> &[u64] {
        &self.children
    }

    /// The concrete field kind this descriptor stands for.
    pub fn kind(&self) -> Result<FieldKind> {
        Ok(match self.structure {
            Structure::Leaf if self.repetition > 0 => FieldKind::Array(self.repetition),
            Structure::Leaf if self.type_name == CARDINALITY_TYPE_NAME => FieldKind::Cardinality,
            Structure::Leaf => PrimitiveType::from_type_name(&self.type_name)
                .map(FieldKind::Primitive)
                .ok_or_else(|| Error::UnknownType(self.type_name.clone()))?,
            Structure::Record => FieldKind::Record,
            Structure::Collection => FieldKind::Collection,
            Structure::Variant => FieldKind::Variant,
            Structure::Unsplit => FieldKind::Unsplit,
        })
    }
}

/// Immutable description of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    description: String,
    features: FeatureFlags,
    fields: Vec<FieldDescriptor>,
    n_header_fields: usize,
    n_entries: u64,
}

impl Descriptor {
    fn empty() -> Self {
        let mut zero = FieldDescriptor::new("", "", Structure::Record);
        zero.id = 0;
        Self {
            name: String::new(),
            description: String::new(),
            features: FeatureFlags::new(),
            fields: vec![zero],
            n_header_fields: 1,
            n_entries: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn features(&self) -> &FeatureFlags {
        &self.features
    }

    pub fn n_entries(&self) -> u64 {
        self.n_entries
    }

    pub fn field_zero(&self) -> &FieldDescriptor {
        &self.fields[0]
    }

    pub fn field(&self, id: u64) -> Option<&FieldDescriptor> {
        usize::try_from(id).ok().and_then(|i| self.fields.get(i))
    }

    /// Number of fields, including the zero field.
    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    /// Fields written with the header, without the zero field.
    pub fn header_fields(&self) -> &[FieldDescriptor] {
        &self.fields[1..self.n_header_fields]
    }

    /// Fields added after the header was written.
    pub fn extension_fields(&self) -> &[FieldDescriptor] {
        &self.fields[self.n_header_fields..]
    }

    /// Resolve a dotted path from the zero field.
    pub fn find_field_id(&self, path: &str) -> Option<u64> {
        if path.is_empty() {
            return None;
        }
        let mut current = 0u64;
        for segment in path.split('.') {
            current = self
                .field(current)?
                .children
                .iter()
                .copied()
                .find(|&c| self.field(c).is_some_and(|f| f.name == segment))?;
        }
        Some(current)
    }

    pub fn field_by_name(&self, path: &str) -> Option<&FieldDescriptor> {
        self.find_field_id(path).and_then(|id| self.field(id))
    }

    /// Dotted path of a field. Empty for the zero field.
    pub fn qualified_name(&self, id: u64) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        while current != 0 {
            let Some(field) = self.field(current) else {
                break;
            };
            parts.push(field.name.as_str());
            current = field.parent_id;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Rebuild the subtree rooted at `id` as a detached field.
    pub fn to_field(&self, id: u64) -> Result<Field> {
        let fd = self
            .field(id)
            .ok_or_else(|| Error::InvalidDescriptor(format!("no field with id {}", id)))?;
        let children = fd
            .children
            .iter()
            .map(|&c| self.to_field(c))
            .collect::<Result<Vec<_>>>()?;
        let kind = fd.kind()?;
        if let (FieldKind::Array(n), Some(item)) = (kind, children.first()) {
            ensure_array_size(item, n).map_err(|e| Error::InvalidDescriptor(e.to_string()))?;
        }
        Ok(Field::from_parts(
            fd.name.clone(),
            fd.type_name.clone(),
            kind,
            children,
        ))
    }

    /// Rebuild a frozen model with default entry from the descriptor.
    ///
    /// Schema extension fields become regular fields of the model.
    pub fn create_model(&self) -> Result<SchemaModel> {
        let mut model = SchemaModel::create();
        model.set_description(self.description.clone())?;

        let top_level = &self.field_zero().children;
        for &id in top_level {
            if !self.fields[id as usize].is_projected() {
                model.add_field(self.to_field(id)?)?;
            }
        }
        for &id in top_level {
            if !self.fields[id as usize].is_projected() {
                continue;
            }
            let mut sources = HashMap::new();
            for target in self.subtree(id) {
                if let Some(source) = self.fields[target as usize].projection_source {
                    sources.insert(self.qualified_name(target), self.qualified_name(source));
                }
            }
            model.add_projected_field(self.to_field(id)?, |name| {
                sources.get(name).cloned().unwrap_or_default()
            })?;
        }

        model.freeze();
        Ok(model)
    }

    fn subtree(&self, id: u64) -> Vec<u64> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(field) = self.field(next) {
                stack.extend(field.children.iter().rev().copied());
            }
        }
        out
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles and validates a [`Descriptor`].
///
/// # Example
/// ```
/// use columnardb::format::{DescriptorBuilder, FieldDescriptor};
/// use columnardb::schema::Structure;
///
/// let mut builder = DescriptorBuilder::new();
/// builder.set_name("events");
/// let pt = builder
///     .add_field(FieldDescriptor::new("pt", "float", Structure::Leaf))
///     .unwrap();
/// let descriptor = builder.build().unwrap();
/// assert_eq!(descriptor.find_field_id("pt"), Some(pt));
/// ```
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    descriptor: Descriptor,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self {
            descriptor: Descriptor::empty(),
        }
    }

    /// Start from the fields and projected fields of `model`.
    ///
    /// All fields end up in the header.
    pub fn from_model(model: &SchemaModel) -> Result<Self> {
        let mut builder = Self::new();
        builder.set_description(model.description());
        builder.add_model_fields(model, &model.tree().top_level().to_vec(), &[], None)?;
        builder.seal_header();
        Ok(builder)
    }

    /// Append the fields of a committed schema update as extension fields
    /// populated from `first_entry` on.
    pub fn extend_from_changeset(&mut self, changeset: &Changeset<'_>, first_entry: u64) -> Result<()> {
        let mut staged = self.clone();
        staged.add_model_fields(
            changeset.model(),
            changeset.added_fields(),
            changeset.added_projected_fields(),
            Some(first_entry),
        )?;
        *self = staged;
        Ok(())
    }

    fn add_model_fields(
        &mut self,
        model: &SchemaModel,
        fields: &[FieldId],
        projected: &[FieldId],
        first_entry: Option<u64>,
    ) -> Result<()> {
        let no_source = |_: &Descriptor, _: FieldId| -> Result<Option<u64>> { Ok(None) };
        for &id in fields {
            self.add_subtree(model.tree(), id, 0, &no_source, first_entry)?;
        }

        let table = model.projected_fields();
        let resolve = |descriptor: &Descriptor, target: FieldId| -> Result<Option<u64>> {
            let source = table.source_of(target).ok_or_else(|| {
                Error::InvalidDescriptor("projected field without source".to_string())
            })?;
            let path = model.tree().node(source).qualified_name();
            descriptor
                .find_field_id(path)
                .map(Some)
                .ok_or_else(|| Error::InvalidDescriptor(format!("unknown projection source {}", path)))
        };
        for &id in projected {
            self.add_subtree(table.tree(), id, 0, &resolve, first_entry)?;
        }
        Ok(())
    }

    fn add_subtree(
        &mut self,
        tree: &FieldTree,
        id: FieldId,
        parent: u64,
        resolve: &dyn Fn(&Descriptor, FieldId) -> Result<Option<u64>>,
        first_entry: Option<u64>,
    ) -> Result<u64> {
        let node = tree.node(id);
        let mut fd = FieldDescriptor::new(node.name(), node.type_name(), node.structure())
            .with_parent(parent)
            .with_repetition(node.repetition());
        if let Some(source) = resolve(&self.descriptor, id)? {
            fd = fd.with_projection_source(source);
        }
        if let Some(first) = first_entry {
            fd = fd.with_first_entry(first);
        }

        let desc_id = self.add_field(fd)?;
        for &child in node.children() {
            self.add_subtree(tree, child, desc_id, resolve, first_entry)?;
        }
        Ok(desc_id)
    }

    // ========================================================================
    // Setters
    // ========================================================================

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.descriptor.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.descriptor.description = description.into();
    }

    pub fn set_feature(&mut self, flag: u32) {
        self.descriptor.features.insert(flag);
    }

    pub fn set_n_entries(&mut self, n_entries: u64) {
        self.descriptor.n_entries = n_entries;
    }

    /// Add a field below its parent and return the id it was given.
    pub fn add_field(&mut self, mut field: FieldDescriptor) -> Result<u64> {
        validate_field_name(&field.name)
            .map_err(|e| Error::InvalidDescriptor(e.to_string()))?;

        let id = self.descriptor.fields.len() as u64;
        let parent = self.descriptor.field(field.parent_id).ok_or_else(|| {
            Error::InvalidDescriptor(format!(
                "field '{}' has unknown parent {}",
                field.name, field.parent_id
            ))
        })?;
        if parent
            .children
            .iter()
            .any(|&c| self.descriptor.fields[c as usize].name == field.name)
        {
            return Err(Error::InvalidDescriptor(format!(
                "duplicate field name '{}' below field {}",
                field.name, field.parent_id
            )));
        }
        if field.repetition > 0 && field.structure != Structure::Leaf {
            return Err(Error::InvalidDescriptor(format!(
                "field '{}' repeats but is not a leaf",
                field.name
            )));
        }
        if field.repetition > MAX_ARRAY_ELEMENTS {
            return Err(Error::InvalidDescriptor(format!(
                "field '{}' repeats {} times, more than {}",
                field.name, field.repetition, MAX_ARRAY_ELEMENTS
            )));
        }
        if let Some(source) = field.projection_source {
            match self.descriptor.field(source) {
                Some(s) if source != 0 && !s.is_projected() => {}
                _ => {
                    return Err(Error::InvalidDescriptor(format!(
                        "field '{}' projects invalid source {}",
                        field.name, source
                    )))
                }
            }
        }

        field.id = id;
        field.children.clear();
        let parent_id = field.parent_id as usize;
        self.descriptor.fields.push(field);
        self.descriptor.fields[parent_id].children.push(id);
        Ok(id)
    }

    /// Mark all fields added so far as header fields.
    pub fn seal_header(&mut self) {
        self.descriptor.n_header_fields = self.descriptor.fields.len();
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check the rules that span several fields.
    pub fn ensure_valid(&self) -> Result<()> {
        let d = &self.descriptor;
        let mut top_names = HashSet::new();
        for &id in &d.field_zero().children {
            if !top_names.insert(d.fields[id as usize].name.as_str()) {
                return Err(Error::InvalidDescriptor(format!(
                    "duplicate top-level field '{}'",
                    d.fields[id as usize].name
                )));
            }
        }

        for fd in &d.fields[1..] {
            let n_children = fd.children.len();
            let kind = fd
                .kind()
                .map_err(|e| Error::InvalidDescriptor(e.to_string()))?;
            let ok = match kind {
                FieldKind::Primitive(_) | FieldKind::Cardinality | FieldKind::Unsplit => {
                    n_children == 0
                }
                FieldKind::Collection | FieldKind::Array(_) => n_children == 1,
                FieldKind::Variant => n_children >= 1,
                FieldKind::Record => true,
            };
            if !ok {
                return Err(Error::InvalidDescriptor(format!(
                    "field '{}' of structure {} has {} sub-fields",
                    d.qualified_name(fd.id),
                    fd.structure,
                    n_children
                )));
            }
            if fd.first_entry.is_some() && (fd.id as usize) < d.n_header_fields {
                return Err(Error::InvalidDescriptor(format!(
                    "header field '{}' has a first entry",
                    fd.name
                )));
            }
        }
        Ok(())
    }

    /// The descriptor as assembled so far.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn build(self) -> Result<Descriptor> {
        self.ensure_valid()?;
        Ok(self.descriptor)
    }
}

impl Default for DescriptorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
