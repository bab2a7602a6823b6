//! Writer - the front end that fills entries of a frozen model into a sink.
//!
//! The writer owns the model. Creating it freezes the model and writes the
//! header; committing it writes the footer. Between the two, entries are
//! checked against the model and counted; their values go nowhere because
//! column encoding is outside this crate.

use tracing::{debug, info};

use super::entry::Entry;
use super::model::SchemaModel;
use super::updater::Updater;
use crate::common::{Error, ModelId, Result};
use crate::format::{Descriptor, DescriptorBuilder, SerializationContext, Serializer, Sink};

/// Writes entries of one model into a [`Sink`].
///
/// # Example
/// ```
/// use columnardb::format::MemorySink;
/// use columnardb::schema::{Field, SchemaModel, Writer};
///
/// let mut model = SchemaModel::create();
/// model.add_field(Field::new("pt", "float").unwrap()).unwrap();
///
/// let mut writer = Writer::new(model, MemorySink::new(), "events").unwrap();
/// writer.fill_default().unwrap();
/// let sink = writer.commit().unwrap();
/// assert!(sink.footer().is_some());
/// ```
pub struct Writer<S: Sink> {
    pub(super) model: SchemaModel,
    pub(super) sink: S,
    pub(super) builder: DescriptorBuilder,
    context: SerializationContext,
    pub(super) n_entries: u64,
}

impl<S: Sink> Writer<S> {
    /// Freeze `model`, derive its descriptor and write the header to `sink`.
    pub fn new(mut model: SchemaModel, mut sink: S, name: impl Into<String>) -> Result<Self> {
        model.freeze();
        let mut builder = DescriptorBuilder::from_model(&model)?;
        builder.set_name(name);
        builder.ensure_valid()?;

        let sizing = Serializer::serialize_header(None, builder.descriptor())?;
        let mut header = vec![0u8; sizing.header_size()];
        let context = Serializer::serialize_header(Some(&mut header), builder.descriptor())?;
        sink.write_header(&header, header.len())?;

        info!(
            name = builder.descriptor().name(),
            model = model.model_id().0,
            header_bytes = header.len(),
            "opened writer"
        );
        Ok(Self {
            model,
            sink,
            builder,
            context,
            n_entries: 0,
        })
    }

    pub fn model(&self) -> &SchemaModel {
        &self.model
    }

    /// The descriptor as it will be written, minus the entry count.
    pub fn descriptor(&self) -> &Descriptor {
        self.builder.descriptor()
    }

    /// Entries filled so far.
    #[inline]
    pub fn n_entries(&self) -> u64 {
        self.n_entries
    }

    pub fn create_entry(&self) -> Result<Entry> {
        self.model.create_entry()
    }

    pub fn default_entry_mut(&mut self) -> Result<&mut Entry> {
        self.model.default_entry_mut()
    }

    /// Append one entry.
    pub fn fill(&mut self, entry: &Entry) -> Result<()> {
        self.check_entry(entry)?;
        self.n_entries += 1;
        Ok(())
    }

    /// Append the model's default entry.
    pub fn fill_default(&mut self) -> Result<()> {
        self.ensure_no_update()?;
        self.check_entry(self.model.default_entry()?)?;
        self.n_entries += 1;
        Ok(())
    }

    fn ensure_no_update(&self) -> Result<()> {
        if self.model.model_id() == ModelId::ZERO {
            return Err(Error::UpdateInProgress);
        }
        Ok(())
    }

    fn check_entry(&self, entry: &Entry) -> Result<()> {
        self.ensure_no_update()?;
        if entry.id_generator() != self.model.id_generator()
            || entry.model_id() != self.model.model_id()
            || entry.schema_id() != self.model.schema_id()
        {
            return Err(Error::StaleEntry {
                entry_model: entry.model_id().0,
                entry_schema: entry.schema_id().0,
                model: self.model.model_id().0,
                schema: self.model.schema_id().0,
            });
        }
        if let Some(name) = entry.first_unbound() {
            return Err(Error::UnboundValue(name.to_string()));
        }
        Ok(())
    }

    /// Start a schema update. See [`Updater`].
    pub fn create_model_updater(&mut self) -> Updater<'_, S> {
        Updater::new(self)
    }

    /// Write the footer and hand back the sink.
    pub fn commit(mut self) -> Result<S> {
        self.ensure_no_update()?;
        self.builder.set_n_entries(self.n_entries);
        let descriptor = self.builder.build()?;

        let size = Serializer::serialize_footer(None, &descriptor, &self.context)?;
        let mut footer = vec![0u8; size];
        Serializer::serialize_footer(Some(&mut footer), &descriptor, &self.context)?;
        self.sink.write_footer(&footer, footer.len())?;

        debug!(
            entries = self.n_entries,
            extension_fields = descriptor.extension_fields().len(),
            "committed writer"
        );
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::IdGenerator;
    use crate::format::{MemorySink, Source};
    use crate::schema::{Field, Value};

    static IDS: IdGenerator = IdGenerator::new();

    fn writer() -> Writer<MemorySink> {
        let mut model = SchemaModel::create_with(&IDS);
        model.add_field(Field::new("pt", "float").unwrap()).unwrap();
        model
            .add_field(Field::new("jets", "std::vector<float>").unwrap())
            .unwrap();
        Writer::new(model, MemorySink::new(), "events").unwrap()
    }

    #[test]
    fn test_new_writes_header() {
        let writer = writer();
        assert!(writer.model().is_frozen());
        assert_eq!(writer.descriptor().name(), "events");
        assert!(!writer.sink.header().is_empty());
        assert!(writer.sink.footer().is_none());
    }

    #[test]
    fn test_fill_counts_entries() {
        let mut writer = writer();
        let mut entry = writer.create_entry().unwrap();
        entry.bind_by_name("pt", Value::Float(3.5)).unwrap();
        writer.fill(&entry).unwrap();
        writer.fill_default().unwrap();
        assert_eq!(writer.n_entries(), 2);
    }

    #[test]
    fn test_fill_rejects_foreign_entry() {
        let mut writer = writer();
        let mut other = SchemaModel::create_with(&IDS);
        other.add_field(Field::new("pt", "float").unwrap()).unwrap();
        other.freeze();

        let entry = other.create_entry().unwrap();
        assert!(matches!(writer.fill(&entry), Err(Error::StaleEntry { .. })));
        assert_eq!(writer.n_entries(), 0);
    }

    #[test]
    fn test_fill_rejects_entry_of_other_generator() {
        static OURS: IdGenerator = IdGenerator::new();
        static THEIRS: IdGenerator = IdGenerator::new();

        let build = |ids: &'static IdGenerator| {
            let mut model = SchemaModel::create_with(ids);
            model.add_field(Field::new("pt", "float").unwrap()).unwrap();
            model
        };
        let mut writer = Writer::new(build(&OURS), MemorySink::new(), "events").unwrap();
        let mut other = build(&THEIRS);
        other.freeze();

        let entry = other.create_entry().unwrap();
        assert_eq!(entry.model_id(), writer.model().model_id());
        assert_eq!(entry.schema_id(), writer.model().schema_id());
        assert!(matches!(writer.fill(&entry), Err(Error::StaleEntry { .. })));

        let own = writer.create_entry().unwrap();
        writer.fill(&own).unwrap();
        assert_eq!(writer.n_entries(), 1);
    }

    #[test]
    fn test_fill_rejects_unbound_values() {
        let mut writer = writer();
        let entry = writer.model().create_bare_entry().unwrap();
        assert!(matches!(
            writer.fill(&entry),
            Err(Error::UnboundValue(name)) if name == "pt"
        ));
    }

    #[test]
    fn test_commit_round_trips() {
        let mut writer = writer();
        for _ in 0..3 {
            writer.fill_default().unwrap();
        }
        let mut source = writer.commit().unwrap().into_source();
        source.attach().unwrap();

        let descriptor = source.descriptor().unwrap();
        assert_eq!(descriptor.n_entries(), 3);
        assert_eq!(descriptor.name(), "events");
        assert!(descriptor.field_by_name("jets._0").is_some());
    }
}
