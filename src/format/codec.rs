//! Little-endian primitives for descriptor envelopes.
//!
//! [`ByteWriter`] runs in two modes: without a buffer it only counts bytes,
//! which gives the sizing pass of the serializer for free.

use super::feature::FeatureFlags;
use crate::common::{Error, Result};

/// Sequential writer over an optional buffer.
pub(crate) struct ByteWriter<'a> {
    buffer: Option<&'a mut [u8]>,
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    /// Counting writer.
    pub fn sizing() -> Self {
        Self {
            buffer: None,
            pos: 0,
        }
    }

    /// Writer into `buffer`. The caller sizes the buffer beforehand; bytes
    /// past its end are dropped.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer: Some(buffer),
            pos: 0,
        }
    }

    /// Bytes written (or counted) so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let start = self.pos;
        let end = start + bytes.len();
        if let Some(dst) = self
            .buffer
            .as_deref_mut()
            .and_then(|b| b.get_mut(start..end))
        {
            dst.copy_from_slice(bytes);
        }
        self.pos = end;
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Length-prefixed UTF-8.
    pub fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    pub fn write_feature_flags(&mut self, flags: &FeatureFlags) {
        for word in flags.to_words() {
            self.write_u64(word);
        }
    }
}

/// Sequential reader over a byte slice.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "unexpected end of data: need {} bytes at offset {}, have {}",
                    n,
                    self.pos,
                    self.data.len()
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::InvalidFormat("string is not valid UTF-8".to_string()))
    }

    pub fn read_feature_flags(&mut self) -> Result<FeatureFlags> {
        let mut words = Vec::new();
        loop {
            let word = self.read_u64()?;
            words.push(word);
            if !FeatureFlags::has_continuation(word) {
                break;
            }
        }
        Ok(FeatureFlags::from_words(&words))
    }
}
