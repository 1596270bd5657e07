//! Packet reader/writer primitives for the framed binary protocol.
//!
//! All integers are little-endian. Strings are `u16` length-prefixed UTF-8;
//! opaque argument lists are a `u16` count of `u32` length-prefixed byte
//! strings; the keyed data blob is a `u32` length-prefixed postcard map.

use crate::value::FieldValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors produced while reading or writing wire data.
#[derive(Debug, Error)]
pub enum WireError {
    /// Payload ended before the expected field.
    #[error("unexpected end of payload (needed {needed} more bytes)")]
    UnexpectedEof {
        /// How many bytes were missing.
        needed: usize,
    },
    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// A postcard-encoded value failed to encode or decode.
    #[error("value codec failed: {0}")]
    Value(#[from] postcard::Error),
}

/// Sequential reader over a borrowed payload.
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::UnexpectedEof {
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    /// Read a one-byte boolean (zero is false).
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a little-endian `f32`.
    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_var_str(&mut self) -> Result<String, WireError> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }

    /// Read an opaque positional argument list.
    pub fn read_args(&mut self) -> Result<Vec<Vec<u8>>, WireError> {
        let count = self.read_u16()? as usize;
        let mut args = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let len = self.read_u32()? as usize;
            args.push(self.take(len)?.to_vec());
        }
        Ok(args)
    }

    /// Read the keyed client-data blob.
    pub fn read_data(&mut self) -> Result<HashMap<String, FieldValue>, WireError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(postcard::from_bytes(bytes)?)
    }
}

/// Writer building an owned payload buffer.
#[derive(Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    /// Start with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the writer, returning the payload.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Write one byte.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Write a one-byte boolean.
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    /// Write a little-endian `u16`.
    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian `u32`.
    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian `u64`.
    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian `f32`.
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_var_str(&mut self, v: &str) {
        self.write_u16(v.len() as u16);
        self.buf.extend_from_slice(v.as_bytes());
    }

    /// Write an opaque positional argument list.
    pub fn write_args(&mut self, args: &[Vec<u8>]) {
        self.write_u16(args.len() as u16);
        for arg in args {
            self.write_u32(arg.len() as u32);
            self.buf.extend_from_slice(arg);
        }
    }

    /// Write the keyed client-data blob.
    pub fn write_data(&mut self, data: &HashMap<String, FieldValue>) -> Result<(), WireError> {
        let bytes = postcard::to_allocvec(data)?;
        self.write_u32(bytes.len() as u32);
        self.buf.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Encode one method argument to its opaque wire form.
pub fn pack_arg<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    Ok(postcard::to_allocvec(value)?)
}

/// Decode one opaque argument into the type its position declares.
pub fn unpack_arg<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    Ok(postcard::from_bytes(bytes)?)
}
