//! Agent SSE stream handling
//!
//! The agent answers with `data: {json}` lines terminated by `data: [DONE]`
//! or connection close.
//!
//! # Module structure
//! - `decoder` - body chunks to JSON payloads (LineBuffer, decode_stream)
//! - `events` - typed view of payload content items (StreamEvent)
//! - `accumulator` - fold of payloads into text, citations and SQL

mod accumulator;
mod decoder;
mod events;

pub use accumulator::EventAccumulator;
pub use decoder::{
    decode_line, decode_stream, parse_sse_line, LineBuffer, PayloadStream, SseLine, DONE_SENTINEL,
};
pub use events::{locate_delta, parse_events, StreamEvent, ToolResultItem};
