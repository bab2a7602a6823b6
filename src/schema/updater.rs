//! Schema updates of a model that is already being written.
//!
//! ```text
//!   Writer ──create_model_updater()──► Updater
//!                                        │ begin_update()   unfreeze, model id := 0
//!                                        │ add_field() ...  staged in the changeset
//!                                        │ commit_update()  freeze, restore model id
//!                                        ▼
//!             DescriptorBuilder::extend_from_changeset + Sink::update_schema
//! ```
//!
//! While an update is open the model id is 0, which makes the writer refuse
//! to fill entries.

use tracing::info;

use super::field::Field;
use super::model::SchemaModel;
use super::tree::FieldId;
use super::writer::Writer;
use crate::common::{ModelId, Result};
use crate::format::Sink;

/// Fields added by one committed update.
#[derive(Debug)]
pub struct Changeset<'a> {
    model: &'a SchemaModel,
    added_fields: Vec<FieldId>,
    added_projected_fields: Vec<FieldId>,
}

impl<'a> Changeset<'a> {
    /// The updated model.
    pub fn model(&self) -> &'a SchemaModel {
        self.model
    }

    /// Top-level fields added to the field tree.
    pub fn added_fields(&self) -> &[FieldId] {
        &self.added_fields
    }

    /// Top-level fields added to the projected tree.
    pub fn added_projected_fields(&self) -> &[FieldId] {
        &self.added_projected_fields
    }

    pub fn is_empty(&self) -> bool {
        self.added_fields.is_empty() && self.added_projected_fields.is_empty()
    }
}

/// Adds fields to the model of a running [`Writer`].
///
/// Dropping an updater with an open update leaves the model unfrozen with
/// model id 0; the writer then refuses to fill or commit.
pub struct Updater<'w, S: Sink> {
    writer: &'w mut Writer<S>,
    stashed_model_id: ModelId,
    in_update: bool,
    added_fields: Vec<FieldId>,
    added_projected_fields: Vec<FieldId>,
}

impl<'w, S: Sink> Updater<'w, S> {
    pub(super) fn new(writer: &'w mut Writer<S>) -> Self {
        Self {
            writer,
            stashed_model_id: ModelId::ZERO,
            in_update: false,
            added_fields: Vec::new(),
            added_projected_fields: Vec::new(),
        }
    }

    /// Open the model for changes. No-op if an update is already open.
    pub fn begin_update(&mut self) {
        if self.in_update {
            return;
        }
        let model = &mut self.writer.model;
        model.unfreeze();
        self.stashed_model_id = ModelId::ZERO;
        model.swap_model_id(&mut self.stashed_model_id);
        self.in_update = true;
    }

    #[inline]
    pub fn is_updating(&self) -> bool {
        self.in_update
    }

    /// Add a top-level field. Fails with
    /// [`ModelFrozen`](crate::Error::ModelFrozen) outside an update.
    pub fn add_field(&mut self, field: Field) -> Result<FieldId> {
        let id = self.writer.model.add_field(field)?;
        self.added_fields.push(id);
        Ok(id)
    }

    /// Add a top-level projected field. See
    /// [`SchemaModel::add_projected_field`].
    pub fn add_projected_field<F>(&mut self, field: Field, mapping: F) -> Result<FieldId>
    where
        F: Fn(&str) -> String,
    {
        let id = self.writer.model.add_projected_field(field, mapping)?;
        self.added_projected_fields.push(id);
        Ok(id)
    }

    /// Close the update and publish the new fields.
    ///
    /// The new fields are populated from the writer's current entry count on.
    /// No-op without an open update.
    pub fn commit_update(&mut self) -> Result<()> {
        if !self.in_update {
            return Ok(());
        }
        let writer = &mut *self.writer;
        writer.model.freeze();
        writer.model.swap_model_id(&mut self.stashed_model_id);
        self.in_update = false;

        let changeset = Changeset {
            model: &writer.model,
            added_fields: std::mem::take(&mut self.added_fields),
            added_projected_fields: std::mem::take(&mut self.added_projected_fields),
        };
        if changeset.is_empty() {
            return Ok(());
        }

        let first_entry = writer.n_entries;
        writer.builder.extend_from_changeset(&changeset, first_entry)?;
        writer.sink.update_schema(&changeset, first_entry)?;
        info!(
            fields = changeset.added_fields().len(),
            projected = changeset.added_projected_fields().len(),
            first_entry,
            "committed schema update"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Error, IdGenerator};
    use crate::format::{MemorySink, Source};

    static IDS: IdGenerator = IdGenerator::new();

    fn writer() -> Writer<MemorySink> {
        let mut model = SchemaModel::create_with(&IDS);
        model.add_field(Field::new("pt", "float").unwrap()).unwrap();
        Writer::new(model, MemorySink::new(), "events").unwrap()
    }

    #[test]
    fn test_add_outside_update_fails() {
        let mut writer = writer();
        let mut updater = writer.create_model_updater();
        assert!(matches!(
            updater.add_field(Field::new("eta", "float").unwrap()),
            Err(Error::ModelFrozen)
        ));
    }

    #[test]
    fn test_update_window_zeroes_model_id() {
        let mut writer = writer();
        let before = writer.model().model_id();
        {
            let mut updater = writer.create_model_updater();
            updater.begin_update();
            updater.begin_update();
            assert!(updater.is_updating());
            assert_eq!(updater.writer.model.model_id(), ModelId::ZERO);
            updater.commit_update().unwrap();
            updater.commit_update().unwrap();
        }
        let after = writer.model().model_id();
        assert!(after.is_valid());
        assert_ne!(after, before);
        assert!(writer.model().is_frozen());
        assert!(writer.sink.schema_updates().is_empty());
    }

    #[test]
    fn test_abandoned_update_blocks_fill() {
        let mut writer = writer();
        let entry = writer.create_entry().unwrap();
        {
            let mut updater = writer.create_model_updater();
            updater.begin_update();
        }
        assert!(matches!(writer.fill(&entry), Err(Error::UpdateInProgress)));
        assert!(matches!(writer.fill_default(), Err(Error::UpdateInProgress)));
    }

    #[test]
    fn test_committed_fields_extend_descriptor() {
        let mut writer = writer();
        writer.fill_default().unwrap();
        writer.fill_default().unwrap();

        let old_entry = writer.create_entry().unwrap();
        {
            let mut updater = writer.create_model_updater();
            updater.begin_update();
            updater.add_field(Field::new("eta", "float").unwrap()).unwrap();
            updater
                .add_projected_field(Field::new("pt2", "float").unwrap(), |_| "pt".into())
                .unwrap();
            updater.commit_update().unwrap();
        }

        assert!(matches!(writer.fill(&old_entry), Err(Error::StaleEntry { .. })));
        writer.fill_default().unwrap();

        let updates = writer.sink.schema_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].first_entry, 2);
        assert_eq!(updates[0].added_fields, vec!["eta".to_string()]);
        assert_eq!(updates[0].added_projected_fields, vec!["pt2".to_string()]);

        let mut source = writer.commit().unwrap().into_source();
        source.attach().unwrap();
        let descriptor = source.descriptor().unwrap();
        assert_eq!(descriptor.n_entries(), 3);
        let eta = descriptor.field_by_name("eta").unwrap();
        assert_eq!(eta.first_entry(), Some(2));
        let pt2 = descriptor.field_by_name("pt2").unwrap();
        assert_eq!(pt2.projection_source(), descriptor.find_field_id("pt"));
    }
}
