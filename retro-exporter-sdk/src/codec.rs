//! Wire codec for frames.
//!
//! Each frame is encoded as a MessagePack map with named fields:
//!
//! ```text
//! { "t": <int64>, "v": { <key>: <bool | float | int>, ... } }
//! ```
//!
//! MessagePack values carry their own type and length, so records are
//! self-delimiting. A datagram is the plain concatenation of N records with
//! no outer length prefix; a receiver decodes records until the datagram is
//! exhausted.

use std::io::Cursor;

use retro_exporter_types::Frame;
use serde::Deserialize;

use crate::error::{EmitterError, Result};

/// Serialize one frame into a self-delimiting record.
pub fn encode_frame(frame: &Frame) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(frame).map_err(|e| EmitterError::Encode(e.to_string()))
}

/// Decode a single record.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    rmp_serde::from_slice(bytes).map_err(|e| EmitterError::Decode(e.to_string()))
}

/// Decode a datagram as a sequence of independently framed records.
///
/// Fails if any record is malformed or the datagram ends mid-record.
pub fn decode_datagram(bytes: &[u8]) -> Result<Vec<Frame>> {
    let mut cursor = Cursor::new(bytes);
    let mut frames = Vec::new();

    while (cursor.position() as usize) < bytes.len() {
        let mut de = rmp_serde::Deserializer::new(&mut cursor);
        let frame = Frame::deserialize(&mut de).map_err(|e| EmitterError::Decode(e.to_string()))?;
        frames.push(frame);
    }

    Ok(frames)
}
