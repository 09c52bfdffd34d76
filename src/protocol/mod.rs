//! Wire protocol
//!
//! The protocol is server→client only: subscribers connect and read, they
//! never send application data. Every message on the wire is one frame:
//!
//! ```text
//! ┌────────────────────┬──────────────────────────────┐
//! │ header (4 bytes)   │ body (header value bytes)    │
//! │ ASCII decimal      │ serialized DetectionList     │
//! │ space-padded, e.g. │ (see codec module for the    │
//! │ "  42"             │  field layout)               │
//! └────────────────────┴──────────────────────────────┘
//! ```
//!
//! The body must be shorter than [`constants::MAX_BODY_LENGTH`]; a snapshot
//! that serializes larger than that is dropped whole rather than truncated.

pub mod codec;
pub mod constants;
pub mod framing;

pub use codec::{decode_detection_list, encode_detection_list, CodecError};
pub use framing::{decode_header, Frame, FrameError};
