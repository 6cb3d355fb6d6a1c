//! Record codecs
//!
//! Both codecs use the serde field names from `docmerge_core::Record`
//! (`url`, `pub_date`, `fetch_time`, `text`, `first_fetch_time`), so a
//! JSON message and a MessagePack message describe the same document.
//! MessagePack is written as a map (`to_vec_named`), not a positional array.

use std::sync::Arc;

use docmerge_core::{Decoder, Encoder, Error, Record, Result};

use crate::config::CodecKind;

/// JSON text, one object per message
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Decoder for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

impl Encoder for JsonCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| Error::Encode(e.to_string()))
    }
}

/// MessagePack map, one per message
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackCodec;

impl Decoder for MsgpackCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

impl Encoder for MsgpackCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(record).map_err(|e| Error::Encode(e.to_string()))
    }
}

impl CodecKind {
    /// Decoder for this wire format
    pub fn decoder(self) -> Arc<dyn Decoder> {
        match self {
            CodecKind::Json => Arc::new(JsonCodec),
            CodecKind::Msgpack => Arc::new(MsgpackCodec),
        }
    }

    /// Encoder for this wire format
    pub fn encoder(self) -> Arc<dyn Encoder> {
        match self {
            CodecKind::Json => Arc::new(JsonCodec),
            CodecKind::Msgpack => Arc::new(MsgpackCodec),
        }
    }
}
