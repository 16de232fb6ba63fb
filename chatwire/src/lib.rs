#![doc = include_str!("../README.md")]

pub mod assembler;
pub mod client;
pub mod config;
pub mod controller;
pub mod decoder;
pub(crate) mod error;
pub mod frame;
pub mod parser;
pub mod pipeline;
pub mod streaming;
pub mod transport;

pub use assembler::MessageAssembler;
pub use client::HttpTransport;
pub use config::{ConfigError, DEFAULT_ENDPOINT, DEFAULT_MAX_FRAME_BYTES, StreamConfig};
pub use controller::{NoopSink, RenderSink, StartOutcome, StreamController};
pub use decoder::ByteDecoder;
pub use frame::{Frame, FrameKind, FrameSplitter};
pub use parser::parse_event;
pub use pipeline::ChunkPipeline;
pub use streaming::stream_deltas;
pub use transport::{ByteStream, StreamRequest, Transport};

// Re-export the data model for convenience
pub use chatwire_types::{
    DecodeError, Delta, Message, MessageId, ParseError, ReferenceItem, Role, SessionEvent,
    SessionId, SessionStatus, Snapshot, StreamError, TransportError,
};
