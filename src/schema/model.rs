//! SchemaModel - the field tree of a dataset plus its lifecycle.
//!
//! A model is built while *unfrozen*: fields and projected fields can be
//! added. Freezing fixes the schema; only then can entries, tokens and bulks
//! be created. Unfreezing a frozen model draws new model and schema ids, so
//! everything issued before becomes stale.

use std::collections::HashSet;

use tracing::debug;

use super::bulk::Bulk;
use super::entry::{Entry, FieldToken};
use super::field::{validate_field_name, Field};
use super::projected::ProjectedFields;
use super::tree::{FieldId, FieldNode, FieldTree};
use crate::common::config::{ImplicitMt, WriteOptions};
use crate::common::{Error, IdGenerator, ModelId, Result, SchemaId};

/// The schema of a dataset.
///
/// # Ids
/// - `model_id` identifies this in-memory instance. It is 0 only while an
///   [`Updater`](super::Updater) has an update open.
/// - `schema_id` identifies the shape of the field tree. It changes on
///   [`unfreeze`](SchemaModel::unfreeze), never on re-freeze.
///
/// # Example
/// ```
/// use columnardb::schema::{Field, SchemaModel};
///
/// let mut model = SchemaModel::create();
/// model.add_field(Field::new("pt", "float").unwrap()).unwrap();
/// model.add_field(Field::new("jets", "std::vector<float>").unwrap()).unwrap();
/// model
///     .add_projected_field(Field::cardinality("njets").unwrap(), |_| "jets".to_string())
///     .unwrap();
/// model.freeze();
///
/// let entry = model.create_entry().unwrap();
/// assert_eq!(entry.len(), 2);
/// assert!(model.find_field("jets._0").is_some());
/// ```
#[derive(Debug)]
pub struct SchemaModel {
    tree: FieldTree,
    projected: ProjectedFields,
    default_entry: Option<Entry>,
    /// Top-level names, shared by regular and projected fields.
    field_names: HashSet<String>,
    description: String,
    frozen: bool,
    model_id: ModelId,
    schema_id: SchemaId,
    ids: &'static IdGenerator,
}

impl SchemaModel {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Create an empty model with a default entry.
    pub fn create() -> Self {
        Self::create_with(IdGenerator::global())
    }

    /// Create an empty model without a default entry.
    pub fn create_bare() -> Self {
        Self::create_bare_with(IdGenerator::global())
    }

    /// Like [`create`](Self::create), drawing ids from `ids`.
    pub fn create_with(ids: &'static IdGenerator) -> Self {
        let mut model = Self::create_bare_with(ids);
        model.default_entry = Some(Entry::new(ids, model.model_id, model.schema_id));
        model
    }

    /// Like [`create_bare`](Self::create_bare), drawing ids from `ids`.
    pub fn create_bare_with(ids: &'static IdGenerator) -> Self {
        let model_id = ids.next_model_id();
        Self {
            tree: FieldTree::new(),
            projected: ProjectedFields::new(),
            default_entry: None,
            field_names: HashSet::new(),
            description: String::new(),
            frozen: false,
            model_id,
            schema_id: model_id.into(),
            ids,
        }
    }

    /// Deep copy with a new model id.
    ///
    /// A frozen model's copy keeps the schema id, so entries of one are
    /// schema-compatible with the other. An unfrozen model's copy gets a
    /// schema id equal to its new model id.
    pub fn clone_model(&self) -> SchemaModel {
        let model_id = self.ids.next_model_id();
        let schema_id = if self.frozen {
            self.schema_id
        } else {
            model_id.into()
        };

        let tree = self.tree.clone();
        let projected = self.projected.rewire(&self.tree, &tree);
        let mut clone = SchemaModel {
            tree,
            projected,
            default_entry: None,
            field_names: self.field_names.clone(),
            description: self.description.clone(),
            frozen: self.frozen,
            model_id,
            schema_id,
            ids: self.ids,
        };
        if self.default_entry.is_some() {
            clone.default_entry = Some(clone.new_entry(true));
        }

        debug!(from = self.model_id.0, to = model_id.0, "cloned model");
        clone
    }

    // ========================================================================
    // State
    // ========================================================================

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub fn is_bare(&self) -> bool {
        self.default_entry.is_none()
    }

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

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<()> {
        self.ensure_not_frozen()?;
        self.description = description.into();
        Ok(())
    }

    /// Fix the schema. Freezing a frozen model does nothing.
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!(model = self.model_id.0, fields = self.tree.len(), "froze model");
        }
        self.frozen = true;
    }

    /// Make the model mutable again under new ids.
    ///
    /// No-op on an unfrozen model.
    pub fn unfreeze(&mut self) {
        if !self.frozen {
            return;
        }
        self.model_id = self.ids.next_model_id();
        self.schema_id = self.model_id.into();
        if let Some(entry) = &mut self.default_entry {
            entry.restamp(self.model_id, self.schema_id);
        }
        self.frozen = false;
        debug!(model = self.model_id.0, "unfroze model");
    }

    /// Swap the model id with `id`. Used to open and close update windows.
    pub(crate) fn swap_model_id(&mut self, id: &mut ModelId) {
        std::mem::swap(&mut self.model_id, id);
    }

    fn ensure_not_frozen(&self) -> Result<()> {
        if self.frozen {
            return Err(Error::ModelFrozen);
        }
        Ok(())
    }

    fn ensure_frozen(&self, action: &'static str) -> Result<()> {
        if !self.frozen {
            return Err(Error::ModelNotFrozen(action));
        }
        Ok(())
    }

    fn ensure_valid_field_name(&self, name: &str) -> Result<()> {
        validate_field_name(name)?;
        if self.field_names.contains(name) {
            return Err(Error::DuplicateFieldName(name.to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Attach a top-level field.
    pub fn add_field(&mut self, field: Field) -> Result<FieldId> {
        self.ensure_not_frozen()?;
        self.ensure_valid_field_name(field.name())?;
        validate_subtree_names(&field)?;

        let name = field.name().to_string();
        let id = self.tree.attach(FieldId::ZERO, field);
        if self.default_entry.is_some() {
            let value = self.tree.default_value(id);
            let node = self.tree.node(id);
            if let Some(entry) = &mut self.default_entry {
                entry.add_value(node.name(), node.type_name(), node.kind(), Some(value));
            }
        }
        debug!(model = self.model_id.0, field = %name, "added field");
        self.field_names.insert(name);
        Ok(id)
    }

    /// Attach a top-level projected field.
    ///
    /// `mapping` receives the qualified name of the field and of each of its
    /// descendants and returns the qualified name of the source field in this
    /// model. Either the whole subtree is added or nothing is.
    ///
    /// Returns the id of the field in the
    /// [projected tree](ProjectedFields::tree).
    pub fn add_projected_field<F>(&mut self, field: Field, mapping: F) -> Result<FieldId>
    where
        F: Fn(&str) -> String,
    {
        self.ensure_not_frozen()?;
        validate_subtree_names(&field)?;
        let name = field.name().to_string();

        let staged = self.projected.stage(field, &mapping, &self.tree)?;
        self.ensure_valid_field_name(&name)?;
        staged.validate(&self.tree)?;

        let id = self.projected.commit(staged);
        debug!(model = self.model_id.0, field = %name, "added projected field");
        self.field_names.insert(name);
        Ok(id)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// The field tree, regardless of the frozen state.
    pub fn tree(&self) -> &FieldTree {
        &self.tree
    }

    /// The field tree of a frozen model.
    pub fn field_zero(&self) -> Result<&FieldTree> {
        self.ensure_frozen("get zero field")?;
        Ok(&self.tree)
    }

    pub fn projected_fields(&self) -> &ProjectedFields {
        &self.projected
    }

    /// Resolve a dotted path. Never fails; missing fields give `None`.
    pub fn find_field(&self, path: &str) -> Option<FieldId> {
        self.tree.find(path)
    }

    /// Resolve a dotted path, failing with [`Error::NoSuchField`].
    pub fn get_field(&self, path: &str) -> Result<&FieldNode> {
        self.find_field(path)
            .map(|id| self.tree.node(id))
            .ok_or_else(|| Error::NoSuchField(path.to_string()))
    }

    /// Token of a top-level field.
    pub fn token(&self, name: &str) -> Result<FieldToken> {
        self.ensure_frozen("get token")?;
        self.tree
            .top_level()
            .iter()
            .position(|&id| self.tree.node(id).name() == name)
            .map(|index| FieldToken::new(index, self.schema_id))
            .ok_or_else(|| Error::NoSuchField(name.to_string()))
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// The default entry of a frozen, non-bare model.
    pub fn default_entry(&self) -> Result<&Entry> {
        self.ensure_frozen("get default entry")?;
        self.default_entry.as_ref().ok_or(Error::BareModel)
    }

    /// Mutable default entry.
    pub fn default_entry_mut(&mut self) -> Result<&mut Entry> {
        self.default_entry.as_mut().ok_or(Error::BareModel)
    }

    /// New entry holding default values.
    pub fn create_entry(&self) -> Result<Entry> {
        self.ensure_frozen("create entry")?;
        Ok(self.new_entry(true))
    }

    /// New entry whose values are all unbound.
    pub fn create_bare_entry(&self) -> Result<Entry> {
        self.ensure_frozen("create entry")?;
        Ok(self.new_entry(false))
    }

    fn new_entry(&self, with_values: bool) -> Entry {
        let mut entry = Entry::new(self.ids, self.model_id, self.schema_id);
        for &id in self.tree.top_level() {
            let node = self.tree.node(id);
            let value = with_values.then(|| self.tree.default_value(id));
            entry.add_value(node.name(), node.type_name(), node.kind(), value);
        }
        entry
    }

    /// Bulk value array for the field at `path`.
    pub fn create_bulk(&self, path: &str) -> Result<Bulk> {
        self.ensure_frozen("create bulk")?;
        let id = self
            .find_field(path)
            .ok_or_else(|| Error::NoSuchField(path.to_string()))?;
        Ok(Bulk::new(
            self.tree.node(id).qualified_name().to_string(),
            self.tree.default_value(id),
        ))
    }

    // ========================================================================
    // Planning
    // ========================================================================

    /// Rough upper bound of the memory a writer of this model needs.
    ///
    /// Counts page buffers for every column, bounded by the page buffer
    /// budget. Buffered writes add the initial pages and a compressed
    /// cluster, and compression on worker threads another two clusters.
    pub fn estimate_write_memory_usage(&self, options: &WriteOptions) -> usize {
        let mut n_columns = 0usize;
        let mut min_page_buffer = 0usize;
        for id in self.tree.iter() {
            for column in self.tree.node(id).column_types() {
                n_columns += 1;
                min_page_buffer += options.initial_elements_per_page() * column.size();
            }
        }

        let mut bytes = options
            .page_buffer_budget()
            .min(n_columns.saturating_mul(options.max_unzipped_page_size()));

        if options.use_buffered_write() {
            bytes += min_page_buffer;
            bytes += options.approx_zipped_cluster_size();
            if options.compression() != 0 && options.implicit_mt() == ImplicitMt::Default {
                bytes += 2 * options.approx_zipped_cluster_size();
            }
        }
        bytes
    }
}

fn validate_subtree_names(field: &Field) -> Result<()> {
    validate_field_name(field.name())?;
    field.children().iter().try_for_each(validate_subtree_names)
}
