//! Write-side collaborators.
//!
//! A [`Sink`] receives the serialized header once, a notification for every
//! committed schema update, and the serialized footer at the end.

use std::path::Path;

use tracing::debug;

use super::source::MemorySource;
use crate::common::Result;
use crate::schema::Changeset;
use crate::storage::ContainerWriter;

/// Destination of a dataset being written.
pub trait Sink {
    /// Store the serialized header. `declared_len` is its uncompressed size.
    fn write_header(&mut self, data: &[u8], declared_len: usize) -> Result<()>;

    /// A schema update was committed; its fields are populated from entry
    /// `n_entries` on.
    fn update_schema(&mut self, changeset: &Changeset<'_>, n_entries: u64) -> Result<()>;

    /// Store the serialized footer.
    fn write_footer(&mut self, data: &[u8], declared_len: usize) -> Result<()>;
}

/// Summary of one schema update seen by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaUpdate {
    pub first_entry: u64,
    pub added_fields: Vec<String>,
    pub added_projected_fields: Vec<String>,
}

impl SchemaUpdate {
    fn from_changeset(changeset: &Changeset<'_>, first_entry: u64) -> Self {
        let model = changeset.model();
        let tree = model.tree();
        let projected = model.projected_fields().tree();
        Self {
            first_entry,
            added_fields: changeset
                .added_fields()
                .iter()
                .map(|&id| tree.node(id).qualified_name().to_string())
                .collect(),
            added_projected_fields: changeset
                .added_projected_fields()
                .iter()
                .map(|&id| projected.node(id).qualified_name().to_string())
                .collect(),
        }
    }
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    header: Vec<u8>,
    footer: Option<Vec<u8>>,
    schema_updates: Vec<SchemaUpdate>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// The footer, once the writer committed.
    pub fn footer(&self) -> Option<&[u8]> {
        self.footer.as_deref()
    }

    pub fn schema_updates(&self) -> &[SchemaUpdate] {
        &self.schema_updates
    }

    /// Hand the stored envelopes to a reader. A missing footer makes the
    /// source fail to attach.
    pub fn into_source(self) -> MemorySource {
        MemorySource::new(self.header, self.footer.unwrap_or_default())
    }
}

impl Sink for MemorySink {
    fn write_header(&mut self, data: &[u8], _declared_len: usize) -> Result<()> {
        self.header = data.to_vec();
        Ok(())
    }

    fn update_schema(&mut self, changeset: &Changeset<'_>, n_entries: u64) -> Result<()> {
        self.schema_updates
            .push(SchemaUpdate::from_changeset(changeset, n_entries));
        Ok(())
    }

    fn write_footer(&mut self, data: &[u8], _declared_len: usize) -> Result<()> {
        self.footer = Some(data.to_vec());
        Ok(())
    }
}

/// Sink writing header and footer frames into a container file.
pub struct FileSink {
    container: ContainerWriter,
}

impl FileSink {
    /// Create the file. Fails if it already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            container: ContainerWriter::create(path)?,
        })
    }
}

impl Sink for FileSink {
    fn write_header(&mut self, data: &[u8], declared_len: usize) -> Result<()> {
        self.container.append_frame(data, declared_len)
    }

    fn update_schema(&mut self, changeset: &Changeset<'_>, n_entries: u64) -> Result<()> {
        // The extension travels in the footer.
        debug!(
            fields = changeset.added_fields().len(),
            projected = changeset.added_projected_fields().len(),
            first_entry = n_entries,
            "schema update"
        );
        Ok(())
    }

    fn write_footer(&mut self, data: &[u8], declared_len: usize) -> Result<()> {
        self.container.append_frame(data, declared_len)
    }
}
