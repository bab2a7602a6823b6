//! Single-file container for serialized envelopes.
//!
//! [`ContainerWriter`] and [`ContainerReader`] are the thinnest possible
//! framing that lets a header and a footer travel through a file. Column data
//! and cluster layout are not stored here.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crate::common::{Error, Result};

/// Magic bytes at the start of every container file.
pub const CONTAINER_MAGIC: &[u8; 4] = b"CDB1";

/// Frame prefix: stored length (u32 LE) + declared length (u32 LE).
const FRAME_PREFIX_SIZE: usize = 8;

/// Appends frames to a new container file.
///
/// # File Layout
/// ```text
/// ┌────────┬──────────────────────────┬──────────────────────────┐
/// │ "CDB1" │ frame 0 (header)         │ frame 1 (footer)         │
/// │ 4 B    │ len | declared | bytes   │ len | declared | bytes   │
/// └────────┴──────────────────────────┴──────────────────────────┘
/// ```
///
/// `declared` is the length of the envelope before any compression. This
/// crate never compresses, so both lengths are equal in files it writes.
///
/// # Durability
/// Every frame is followed by `fsync()`.
pub struct ContainerWriter {
    file: File,
    frame_count: u32,
}

impl ContainerWriter {
    /// Create a new container file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(CONTAINER_MAGIC)?;

        Ok(Self {
            file,
            frame_count: 0,
        })
    }

    /// Append one frame.
    pub fn append_frame(&mut self, data: &[u8], declared_len: usize) -> Result<()> {
        let len = u32::try_from(data.len())
            .map_err(|_| Error::InvalidFormat(format!("frame of {} bytes", data.len())))?;
        let declared = u32::try_from(declared_len)
            .map_err(|_| Error::InvalidFormat(format!("frame of {} bytes", declared_len)))?;

        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&declared.to_le_bytes())?;
        self.file.write_all(data)?;
        self.file.sync_all()?; // fsync for durability

        self.frame_count += 1;
        Ok(())
    }

    /// Number of frames written so far.
    #[inline]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }
}

/// A frame read back from a container.
#[derive(Debug, Clone)]
pub struct ContainerFrame {
    pub data: Vec<u8>,
    pub declared_len: usize,
}

/// Reads all frames of a container file.
#[derive(Debug)]
pub struct ContainerReader {
    frames: Vec<ContainerFrame>,
}

impl ContainerReader {
    /// Open an existing container file and load its frames.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist, lacks the magic bytes or
    /// ends in the middle of a frame.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).open(&path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Parse frames from an in-memory copy of a container.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CONTAINER_MAGIC.len() || &bytes[..4] != CONTAINER_MAGIC {
            return Err(Error::InvalidFormat("not a container file".to_string()));
        }

        let mut frames = Vec::new();
        let mut pos = CONTAINER_MAGIC.len();
        while pos < bytes.len() {
            if bytes.len() - pos < FRAME_PREFIX_SIZE {
                return Err(Error::InvalidFormat("truncated frame prefix".to_string()));
            }
            let len = u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
                as usize;
            let declared_len = u32::from_le_bytes([
                bytes[pos + 4],
                bytes[pos + 5],
                bytes[pos + 6],
                bytes[pos + 7],
            ]) as usize;
            pos += FRAME_PREFIX_SIZE;

            if bytes.len() - pos < len {
                return Err(Error::InvalidFormat("truncated frame".to_string()));
            }
            frames.push(ContainerFrame {
                data: bytes[pos..pos + len].to_vec(),
                declared_len,
            });
            pos += len;
        }

        Ok(Self { frames })
    }

    /// Get a frame by position.
    pub fn frame(&self, index: usize) -> Option<&ContainerFrame> {
        self.frames.get(index)
    }

    /// Number of frames in the file.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
