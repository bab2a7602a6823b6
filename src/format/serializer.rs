//! Header and footer serialization.
//!
//! Both header and footer travel in the same envelope:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     magic ("CDBH" header, "CDBF" footer)
//! 4       2     format version (little-endian)
//! 6       n     payload
//! 6+n     4     CRC32 of bytes 0..6+n (little-endian)
//! ```
//!
//! The payload of both starts with the feature flag words. On read, the
//! envelope is verified first, then the flags, then everything else.
//!
//! Serialization is two-pass: call with `None` to learn the size, allocate,
//! then call again with the buffer.

use tracing::warn;

use super::codec::{ByteReader, ByteWriter};
use super::descriptor::{Descriptor, DescriptorBuilder, FieldDescriptor};
use super::feature::SUPPORTED_FEATURES;
use crate::common::{Error, Result};
use crate::schema::Structure;

pub const HEADER_MAGIC: &[u8; 4] = b"CDBH";
pub const FOOTER_MAGIC: &[u8; 4] = b"CDBF";
pub const FORMAT_VERSION: u16 = 1;

const ENVELOPE_PREFIX: usize = 4 + 2;
const CHECKSUM_SIZE: usize = 4;
const NO_SOURCE: u64 = u64::MAX;

/// What the footer needs to know about the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializationContext {
    header_size: usize,
    header_checksum: u32,
}

impl SerializationContext {
    /// Size of the serialized header in bytes.
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Checksum of the header. Zero after a sizing pass.
    pub fn header_checksum(&self) -> u32 {
        self.header_checksum
    }
}

/// Encodes descriptors into headers and footers and back.
pub struct Serializer;

impl Serializer {
    /// Serialize the header fields of `descriptor`.
    ///
    /// With `None`, only computes the size.
    pub fn serialize_header(
        buffer: Option<&mut [u8]>,
        descriptor: &Descriptor,
    ) -> Result<SerializationContext> {
        let header_checksum = write_envelope(buffer, HEADER_MAGIC, |w| {
            write_header_payload(w, descriptor)
        })?;
        let header_size = envelope_size(|w| write_header_payload(w, descriptor));
        Ok(SerializationContext {
            header_size,
            header_checksum,
        })
    }

    /// Serialize the entry count and schema extension of `descriptor`.
    ///
    /// With `None`, only computes the size. Returns the size either way.
    pub fn serialize_footer(
        buffer: Option<&mut [u8]>,
        descriptor: &Descriptor,
        context: &SerializationContext,
    ) -> Result<usize> {
        write_envelope(buffer, FOOTER_MAGIC, |w| {
            write_footer_payload(w, descriptor, context)
        })?;
        Ok(envelope_size(|w| write_footer_payload(w, descriptor, context)))
    }

    /// Decode a header into a builder holding its fields.
    ///
    /// Fails with [`Error::UnsupportedFeature`] before looking at the fields
    /// if the header uses a feature this reader does not know.
    pub fn deserialize_header(data: &[u8]) -> Result<(DescriptorBuilder, SerializationContext)> {
        let (payload, checksum) = open_envelope(data, HEADER_MAGIC)?;
        let mut reader = ByteReader::new(payload);

        let features = reader.read_feature_flags()?;
        if let Err(err) = features.ensure_supported(SUPPORTED_FEATURES) {
            warn!(error = %err, "refusing header");
            return Err(err);
        }

        let mut builder = DescriptorBuilder::new();
        for flag in features.iter() {
            builder.set_feature(flag);
        }
        builder.set_name(reader.read_string()?);
        builder.set_description(reader.read_string()?);

        let n_fields = reader.read_u32()?;
        for _ in 0..n_fields {
            let field = read_field(&mut reader)?;
            builder.add_field(field)?;
        }
        builder.seal_header();
        ensure_consumed(&reader)?;

        Ok((
            builder,
            SerializationContext {
                header_size: data.len(),
                header_checksum: checksum,
            },
        ))
    }

    /// Decode a footer into `builder`, which must come from the matching
    /// header.
    pub fn deserialize_footer(
        data: &[u8],
        builder: &mut DescriptorBuilder,
        context: &SerializationContext,
    ) -> Result<()> {
        let (payload, _) = open_envelope(data, FOOTER_MAGIC)?;
        let mut reader = ByteReader::new(payload);

        let features = reader.read_feature_flags()?;
        if let Err(err) = features.ensure_supported(SUPPORTED_FEATURES) {
            warn!(error = %err, "refusing footer");
            return Err(err);
        }

        let header_checksum = reader.read_u32()?;
        if header_checksum != context.header_checksum {
            return Err(Error::ChecksumMismatch {
                stored: header_checksum,
                computed: context.header_checksum,
            });
        }

        builder.set_n_entries(reader.read_u64()?);
        let n_fields = reader.read_u32()?;
        for _ in 0..n_fields {
            let field = read_field(&mut reader)?;
            let first_entry = reader.read_u64()?;
            builder.add_field(field.with_first_entry(first_entry))?;
        }
        ensure_consumed(&reader)
    }
}

// ============================================================================
// Envelope
// ============================================================================

fn envelope_size(payload: impl FnOnce(&mut ByteWriter<'_>)) -> usize {
    let mut sizing = ByteWriter::sizing();
    payload(&mut sizing);
    ENVELOPE_PREFIX + sizing.position() + CHECKSUM_SIZE
}

/// Write magic, version, payload and checksum. Returns the checksum, or 0
/// for a sizing pass.
fn write_envelope(
    buffer: Option<&mut [u8]>,
    magic: &[u8; 4],
    payload: impl Fn(&mut ByteWriter<'_>),
) -> Result<u32> {
    let Some(buffer) = buffer else {
        return Ok(0);
    };

    let needed = envelope_size(&payload);
    if buffer.len() < needed {
        return Err(Error::BufferTooSmall {
            needed,
            available: buffer.len(),
        });
    }

    let body_end = needed - CHECKSUM_SIZE;
    {
        let mut writer = ByteWriter::new(&mut buffer[..body_end]);
        writer.write_bytes(magic);
        writer.write_u16(FORMAT_VERSION);
        payload(&mut writer);
    }
    let checksum = crc32fast::hash(&buffer[..body_end]);
    buffer[body_end..needed].copy_from_slice(&checksum.to_le_bytes());
    Ok(checksum)
}

/// Verify an envelope and return its payload and checksum.
fn open_envelope<'a>(data: &'a [u8], magic: &[u8; 4]) -> Result<(&'a [u8], u32)> {
    if data.len() < ENVELOPE_PREFIX + CHECKSUM_SIZE {
        return Err(Error::InvalidFormat(format!(
            "envelope too short: {} bytes",
            data.len()
        )));
    }
    if &data[..4] != magic {
        return Err(Error::InvalidFormat(format!(
            "bad magic {:?}, expected {:?}",
            &data[..4],
            magic
        )));
    }

    let body_end = data.len() - CHECKSUM_SIZE;
    let mut stored = [0u8; 4];
    stored.copy_from_slice(&data[body_end..]);
    let stored = u32::from_le_bytes(stored);
    let computed = crc32fast::hash(&data[..body_end]);
    if stored != computed {
        return Err(Error::ChecksumMismatch { stored, computed });
    }

    let version = ByteReader::new(&data[4..ENVELOPE_PREFIX]).read_u16()?;
    if version > FORMAT_VERSION {
        return Err(Error::InvalidFormat(format!(
            "format version {} is newer than {}",
            version, FORMAT_VERSION
        )));
    }
    Ok((&data[ENVELOPE_PREFIX..body_end], stored))
}

fn ensure_consumed(reader: &ByteReader<'_>) -> Result<()> {
    if !reader.is_empty() {
        return Err(Error::InvalidFormat("trailing bytes in payload".to_string()));
    }
    Ok(())
}

// ============================================================================
// Payloads
// ============================================================================

fn write_header_payload(w: &mut ByteWriter<'_>, descriptor: &Descriptor) {
    w.write_feature_flags(descriptor.features());
    w.write_str(descriptor.name());
    w.write_str(descriptor.description());

    let fields = descriptor.header_fields();
    w.write_u32(fields.len() as u32);
    for field in fields {
        write_field(w, field);
    }
}

fn write_footer_payload(
    w: &mut ByteWriter<'_>,
    descriptor: &Descriptor,
    context: &SerializationContext,
) {
    w.write_feature_flags(descriptor.features());
    w.write_u32(context.header_checksum);
    w.write_u64(descriptor.n_entries());

    let fields = descriptor.extension_fields();
    w.write_u32(fields.len() as u32);
    for field in fields {
        write_field(w, field);
        w.write_u64(field.first_entry().unwrap_or(0));
    }
}

fn write_field(w: &mut ByteWriter<'_>, field: &FieldDescriptor) {
    w.write_u64(field.parent_id());
    w.write_str(field.name());
    w.write_str(field.type_name());
    w.write_u8(field.structure() as u8);
    w.write_u64(field.repetition());
    w.write_u64(field.projection_source().unwrap_or(NO_SOURCE));
}

fn read_field(r: &mut ByteReader<'_>) -> Result<FieldDescriptor> {
    let parent_id = r.read_u64()?;
    let name = r.read_string()?;
    let type_name = r.read_string()?;
    let structure_code = r.read_u8()?;
    let structure = Structure::from_u8(structure_code).ok_or_else(|| {
        Error::InvalidFormat(format!("unknown field structure {}", structure_code))
    })?;
    let repetition = r.read_u64()?;
    let source = r.read_u64()?;

    let mut field = FieldDescriptor::new(name, type_name, structure)
        .with_parent(parent_id)
        .with_repetition(repetition);
    if source != NO_SOURCE {
        field = field.with_projection_source(source);
    }
    Ok(field)
}
