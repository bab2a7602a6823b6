//! Read-side collaborators.
//!
//! A [`Source`] is unusable until [`attach`](Source::attach) succeeded.
//! Attaching decodes header and footer; an unknown feature flag in either
//! stops it before any field or page is exposed.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::descriptor::Descriptor;
use super::serializer::Serializer;
use crate::buffer::PagePool;
use crate::common::{Error, Result};
use crate::storage::page::HeapPageAllocator;
use crate::storage::ContainerReader;

/// Origin of a dataset being read.
pub trait Source {
    /// Decode and validate the stored descriptor.
    fn attach(&mut self) -> Result<()>;

    /// The descriptor. Fails with [`Error::NotAttached`] before `attach`.
    fn descriptor(&self) -> Result<&Descriptor>;

    /// The pool serving this source's pages. Fails with
    /// [`Error::NotAttached`] before `attach`.
    fn page_pool(&self) -> Result<&PagePool>;
}

/// State shared by the sources once attached.
struct Attached {
    descriptor: Descriptor,
    pool: PagePool,
}

impl Attached {
    fn decode(header: &[u8], footer: &[u8]) -> Result<Self> {
        let (mut builder, context) = Serializer::deserialize_header(header)?;
        if footer.is_empty() {
            return Err(Error::InvalidFormat("missing footer".to_string()));
        }
        Serializer::deserialize_footer(footer, &mut builder, &context)?;
        let descriptor = builder.build()?;

        info!(
            name = descriptor.name(),
            fields = descriptor.n_fields(),
            entries = descriptor.n_entries(),
            "attached source"
        );
        Ok(Self {
            descriptor,
            pool: PagePool::with_allocator(Arc::new(HeapPageAllocator::new())),
        })
    }
}

fn attached(state: &Option<Attached>) -> Result<&Attached> {
    state.as_ref().ok_or(Error::NotAttached)
}

/// Source over envelopes held in memory.
pub struct MemorySource {
    header: Vec<u8>,
    footer: Vec<u8>,
    state: Option<Attached>,
}

impl MemorySource {
    pub fn new(header: Vec<u8>, footer: Vec<u8>) -> Self {
        Self {
            header,
            footer,
            state: None,
        }
    }
}

impl Source for MemorySource {
    fn attach(&mut self) -> Result<()> {
        if self.state.is_none() {
            self.state = Some(Attached::decode(&self.header, &self.footer)?);
        }
        Ok(())
    }

    fn descriptor(&self) -> Result<&Descriptor> {
        attached(&self.state).map(|a| &a.descriptor)
    }

    fn page_pool(&self) -> Result<&PagePool> {
        attached(&self.state).map(|a| &a.pool)
    }
}

/// Source over a container file written by a
/// [`FileSink`](super::FileSink).
pub struct FileSource {
    container: ContainerReader,
    state: Option<Attached>,
}

impl FileSource {
    /// Open the file and load its frames. Nothing is decoded yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            container: ContainerReader::open(path)?,
            state: None,
        })
    }
}

impl Source for FileSource {
    fn attach(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        let header = self
            .container
            .frame(0)
            .ok_or_else(|| Error::InvalidFormat("missing header frame".to_string()))?;
        let footer = self
            .container
            .frame(1)
            .map(|f| f.data.as_slice())
            .unwrap_or_default();
        self.state = Some(Attached::decode(&header.data, footer)?);
        Ok(())
    }

    fn descriptor(&self) -> Result<&Descriptor> {
        attached(&self.state).map(|a| &a.descriptor)
    }

    fn page_pool(&self) -> Result<&PagePool> {
        attached(&self.state).map(|a| &a.pool)
    }
}
