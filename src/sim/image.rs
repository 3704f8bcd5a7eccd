//! Code image container.
//!
//! Layout (little-endian):
//!
//! | offset | size       | field                    |
//! |--------|------------|--------------------------|
//! | 0      | 4          | magic `b"RISU"`          |
//! | 4      | 4          | encoding version         |
//! | 8      | 8          | entry point              |
//! | 16     | 8          | code length in bytes     |
//! | 24     | 8          | data length in bytes     |
//! | 32     | code_len   | code                     |
//! | ..     | data_len   | initialized data         |
//!
//! Code is loaded at `CODE_START`. The entry point must be an instruction
//! inside the code segment.

use crate::common::constants::{CODE_START, INSTRUCTION_SIZE};
use crate::common::{HostError, HostResult};
use crate::isa::opcodes::ENCODING_VERSION;
use std::path::Path;

/// Image magic number.
pub const IMAGE_MAGIC: [u8; 4] = *b"RISU";

const HEADER_SIZE: usize = 32;

/// A loadable program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeImage {
    pub version: u32,
    pub entry: u64,
    pub code: Vec<u8>,
    pub data: Vec<u8>,
}

impl CodeImage {
    /// Builds an image from instruction words and data, entering at the
    /// first instruction.
    pub fn new(words: &[u32], data: Vec<u8>) -> Self {
        Self {
            version: ENCODING_VERSION,
            entry: CODE_START,
            code: words.iter().flat_map(|w| w.to_le_bytes()).collect(),
            data,
        }
    }

    /// Builds an image from instruction words without data.
    pub fn from_words(words: &[u32]) -> Self {
        Self::new(words, Vec::new())
    }

    /// First address past the code segment.
    pub fn code_end(&self) -> u64 {
        CODE_START + self.code.len() as u64
    }

    /// Checks the version and entry point.
    pub fn validate(&self) -> HostResult<()> {
        if self.version != ENCODING_VERSION {
            return Err(HostError::InvalidImage(format!(
                "encoding version {} (expected {})",
                self.version, ENCODING_VERSION
            )));
        }
        if self.code.is_empty() || self.code.len() as u64 % INSTRUCTION_SIZE != 0 {
            return Err(HostError::InvalidImage(format!(
                "code segment of {} bytes is not a whole number of instructions",
                self.code.len()
            )));
        }
        if self.entry < CODE_START
            || self.entry >= self.code_end()
            || self.entry % INSTRUCTION_SIZE != 0
        {
            return Err(HostError::InvalidImage(format!(
                "entry point {:#x} outside code segment",
                self.entry
            )));
        }
        Ok(())
    }

    /// Serializes the image.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.code.len() + self.data.len());
        out.extend_from_slice(&IMAGE_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.entry.to_le_bytes());
        out.extend_from_slice(&(self.code.len() as u64).to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.code);
        out.extend_from_slice(&self.data);
        out
    }

    /// Parses and validates an image.
    pub fn from_bytes(bytes: &[u8]) -> HostResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(HostError::InvalidImage(format!(
                "{} bytes is shorter than the header",
                bytes.len()
            )));
        }
        if bytes[0..4] != IMAGE_MAGIC {
            return Err(HostError::InvalidImage("bad magic".to_string()));
        }

        let u32_at = |at: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&bytes[at..at + 4]);
            u32::from_le_bytes(b)
        };
        let u64_at = |at: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(b)
        };

        let version = u32_at(4);
        let entry = u64_at(8);
        let code_len = u64_at(16);
        let data_len = u64_at(24);

        let body = (bytes.len() - HEADER_SIZE) as u64;
        if code_len > body || data_len > body - code_len {
            return Err(HostError::InvalidImage(format!(
                "segments of {} + {} bytes exceed the {} bytes present",
                code_len, data_len, body
            )));
        }

        let code_end = HEADER_SIZE + code_len as usize;
        let data_end = code_end + data_len as usize;
        let image = Self {
            version,
            entry,
            code: bytes[HEADER_SIZE..code_end].to_vec(),
            data: bytes[code_end..data_end].to_vec(),
        };
        image.validate()?;
        Ok(image)
    }

    /// Reads and parses an image file.
    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Writes the image to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> HostResult<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}
