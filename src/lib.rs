//! Detection-event broadcast server
//!
//! `detcast-rs` delivers detection snapshots produced by a video-analysis
//! pipeline to any number of TCP subscribers. The producer hands a
//! [`DetectionList`] to [`BroadcastServer::publish`] and never blocks; the
//! server serializes the snapshot once, wraps it in a length-prefixed
//! [`Frame`], and fans the same frame out to every connected subscriber.
//!
//! # Architecture
//!
//! ```text
//!  producer thread                 broadcast worker (current-thread runtime)
//!  ───────────────                 ─────────────────────────────────────────
//!  publish(list) ──command──►  SubscriberRegistry
//!                              ├── accept loop (paused at capacity)
//!                              ├── encode list ──► one shared Frame
//!                              └── fan-out
//!                                   │        │
//!                                   ▼        ▼
//!                              [Subscriber] [Subscriber]
//!                              write queue  write queue
//!                                   │        │
//!                                   ▼        ▼
//!                                  TCP      TCP
//! ```
//!
//! All registry and subscriber state lives on a single event-loop worker;
//! the producer reaches it only through a command channel. Frames use
//! [`bytes::Bytes`], so fan-out clones are reference-counted rather than
//! copied.
//!
//! # Wire protocol
//!
//! Each message is a 4-byte ASCII decimal length header followed by the
//! serialized detection list. See [`protocol`] for the framing rules and
//! the body layout.

pub mod detections;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use detections::{BoundingBox, Detection, DetectionList, MetaInfo};
pub use error::{Error, Result};
pub use protocol::framing::Frame;
pub use registry::{RegistryHandle, SubscriberRegistry};
pub use server::{BroadcastServer, ServerConfig};
pub use stats::BroadcastStats;
