// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet framing for the Minecraft Java protocol.
//!
//! # Wire Format
//!
//! Without compression:
//!
//! ```text
//! +-----------------+----------------+------------------+
//! | Length (VarInt) | ID (VarInt)    | Payload          |
//! +-----------------+----------------+------------------+
//! ```
//!
//! After `Set Compression` with threshold `T`:
//!
//! ```text
//! +-----------------+-----------------------+----------------------------+
//! | Length (VarInt) | Data Length (VarInt)  | ID + Payload (zlib if >0)  |
//! +-----------------+-----------------------+----------------------------+
//! ```
//!
//! `Data Length` is 0 for packets sent uncompressed (smaller than `T`),
//! otherwise the uncompressed size of `ID + Payload`.

use super::ProtocolError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Maximum bytes in a VarInt.
pub const MAX_VARINT_LEN: usize = 5;

/// Default maximum packet size, compressed or not (8 MiB).
pub const DEFAULT_MAX_PACKET_SIZE: usize = 8 * 1024 * 1024;

/// A decoded packet: ID plus raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a packet.
    pub fn new(id: i32, payload: Vec<u8>) -> Self {
        Self { id, payload }
    }

    /// Reader over the payload.
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader::new(&self.payload)
    }
}

// ============================================================================
// VarInt
// ============================================================================

/// Append `value` as a VarInt.
pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut v = value as u32;
    loop {
        if v & !0x7f == 0 {
            buf.push(v as u8);
            return;
        }
        buf.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
}

/// Encoded size of `value`.
pub fn varint_len(value: i32) -> usize {
    let mut v = value as u32;
    let mut len = 1;
    while v & !0x7f != 0 {
        v >>= 7;
        len += 1;
    }
    len
}

/// Decode a VarInt from the start of `bytes`. Returns value and bytes used.
pub fn read_varint(bytes: &[u8]) -> Result<(i32, usize), ProtocolError> {
    let mut value: u32 = 0;
    for (i, byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value as i32, i + 1));
        }
    }
    if bytes.len() >= MAX_VARINT_LEN {
        Err(ProtocolError::VarIntTooLong)
    } else {
        Err(ProtocolError::UnexpectedEof)
    }
}

/// Read a VarInt from a stream. `Ok(None)` on a clean EOF before the first
/// byte.
pub async fn read_varint_async<R>(reader: &mut R) -> Result<Option<i32>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = match reader.read_u8().await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && i == 0 => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some(value as i32));
        }
    }
    Err(ProtocolError::VarIntTooLong)
}

// ============================================================================
// Field writer / reader
// ============================================================================

/// Builds a packet payload.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn varint(&mut self, value: i32) -> &mut Self {
        write_varint(&mut self.buf, value);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        write_varint(&mut self.buf, value.len() as i32);
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(u8::from(value));
        self
    }

    pub fn finish(&mut self, id: i32) -> Packet {
        Packet::new(id, std::mem::take(&mut self.buf))
    }
}

/// Cursor over a packet payload.
#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn varint(&mut self) -> Result<i32, ProtocolError> {
        let (value, used) = read_varint(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    pub fn string(&mut self, max_chars: usize) -> Result<String, ProtocolError> {
        let len = self.varint()?;
        let len = usize::try_from(len)
            .map_err(|_| ProtocolError::InvalidString(format!("negative length {}", len)))?;
        if len > max_chars * 4 {
            return Err(ProtocolError::InvalidString(format!(
                "length {} exceeds {} characters",
                len, max_chars
            )));
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ProtocolError::InvalidString(e.to_string()))
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.u8()? != 0)
    }

    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_be_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    pub fn uuid(&mut self) -> Result<[u8; 16], ProtocolError> {
        self.array()
    }
}

// ============================================================================
// Framing
// ============================================================================

/// Length-prefixed packet codec with optional zlib compression.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    /// Compression threshold, once the server enabled it.
    threshold: Option<usize>,

    /// Maximum accepted size (anti-OOM protection).
    max_size: usize,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_SIZE)
    }
}

impl PacketCodec {
    /// Uncompressed codec with the given size limit.
    pub fn new(max_size: usize) -> Self {
        Self {
            threshold: None,
            max_size,
        }
    }

    /// Current compression threshold.
    pub fn threshold(&self) -> Option<usize> {
        self.threshold
    }

    /// Apply a `Set Compression` threshold. Negative disables compression.
    pub fn set_threshold(&mut self, threshold: i32) {
        self.threshold = usize::try_from(threshold).ok();
    }

    /// Encode a packet into one frame.
    pub fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
        let mut body = Vec::with_capacity(varint_len(packet.id) + packet.payload.len());
        write_varint(&mut body, packet.id);
        body.extend_from_slice(&packet.payload);

        let inner = match self.threshold {
            None => body,
            Some(threshold) if body.len() < threshold => {
                let mut inner = Vec::with_capacity(body.len() + 1);
                write_varint(&mut inner, 0);
                inner.extend_from_slice(&body);
                inner
            }
            Some(_) => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&body)?;
                let compressed = encoder.finish()?;

                let mut inner = Vec::with_capacity(compressed.len() + MAX_VARINT_LEN);
                write_varint(&mut inner, body.len() as i32);
                inner.extend_from_slice(&compressed);
                inner
            }
        };

        if inner.len() > self.max_size {
            return Err(ProtocolError::TooLarge(inner.len(), self.max_size));
        }

        let mut frame = Vec::with_capacity(inner.len() + MAX_VARINT_LEN);
        write_varint(&mut frame, inner.len() as i32);
        frame.extend_from_slice(&inner);
        Ok(frame)
    }

    /// Read one packet. `Ok(None)` if the peer closed between frames.
    pub async fn read<R>(&self, reader: &mut R) -> Result<Option<Packet>, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let Some(len) = read_varint_async(reader).await? else {
            return Ok(None);
        };
        let len = self.checked_len(len)?;
        if len == 0 {
            return Err(ProtocolError::Malformed("empty frame".into()));
        }

        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame).await?;

        self.decode_frame(&frame).map(Some)
    }

    /// Decode the body of one frame (everything after the length prefix).
    pub fn decode_frame(&self, frame: &[u8]) -> Result<Packet, ProtocolError> {
        let data = match self.threshold {
            None => frame.to_vec(),
            Some(_) => {
                let (data_len, used) = read_varint(frame)?;
                let data_len = self.checked_len(data_len)?;
                let rest = &frame[used..];

                if data_len == 0 {
                    rest.to_vec()
                } else {
                    let mut out = Vec::with_capacity(data_len);
                    ZlibDecoder::new(rest)
                        .take(data_len as u64 + 1)
                        .read_to_end(&mut out)
                        .map_err(|e| ProtocolError::Compression(e.to_string()))?;
                    if out.len() != data_len {
                        return Err(ProtocolError::Compression(format!(
                            "declared {} bytes, inflated {}",
                            data_len,
                            out.len()
                        )));
                    }
                    out
                }
            }
        };

        let (id, used) = read_varint(&data)?;
        Ok(Packet::new(id, data[used..].to_vec()))
    }

    fn checked_len(&self, len: i32) -> Result<usize, ProtocolError> {
        let len = usize::try_from(len)
            .map_err(|_| ProtocolError::Malformed(format!("negative length {}", len)))?;
        if len > self.max_size {
            return Err(ProtocolError::TooLarge(len, self.max_size));
        }
        Ok(len)
    }
}
