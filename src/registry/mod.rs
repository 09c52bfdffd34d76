//! Subscriber registry
//!
//! The registry owns every subscriber connection, the TCP accept loop, and
//! the admission-control state machine that bounds how many subscribers may
//! be attached at once.
//!
//! # Architecture
//!
//! ```text
//!                     SubscriberRegistry (one event-loop task)
//!                  ┌──────────────────────────────────────────┐
//!   commands ────► │ mailbox ─┐                               │
//!   (producer,     │          ├─ select! ── accept loop       │
//!    write loops)  │          │            (armed only while  │
//!                  │          │             Listening)        │
//!                  │ subscribers: HashMap<SubscriberId, _>    │
//!                  └───────────┬──────────────────────────────┘
//!                              │ Frame.clone()  (refcounted)
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//!         [Subscriber]    [Subscriber]    [Subscriber]
//!         write loop      write loop      write loop
//! ```
//!
//! # Ownership
//!
//! The registry holds the only strong ownership of each subscriber. A
//! removed subscriber's write loop is stopped and its socket closed
//! immediately; nothing can reach it afterwards. Ordering is guaranteed per
//! subscriber (frames arrive in publish order) but not across subscribers:
//! writes to different sockets complete, or fail, independently.

pub mod store;
pub mod subscriber;

pub use store::{Admission, RegistryHandle, SubscriberRegistry};
pub use subscriber::SubscriberId;
