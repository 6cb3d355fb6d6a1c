//! Pipeline engine for docmerge
//!
//! This crate wires the lower layers into a runnable service:
//! - config: `docmerge.toml` plus environment overrides
//! - store: backend selection (in-process or PostgreSQL)
//! - codec: JSON and MessagePack record codecs
//! - framing: line and length-prefixed message streams
//! - pipeline: decode → reconcile → encode → forward loop
//!
//! The engine is the only component that reads configuration; everything
//! below it is constructed from explicit settings.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod framing;
pub mod pipeline;
pub mod store;

pub use codec::{JsonCodec, MsgpackCodec};
pub use config::{BackendKind, CodecKind, DocmergeConfig, ErrorPolicy, CONFIG_FILE_NAME};
pub use framing::{
    FramedSink, FramedSource, Framing, IterSource, LineSink, LineSource, Sink, Source,
    MAX_FRAME_LEN,
};
pub use pipeline::{Pipeline, PipelineStats};
pub use store::open_store;
