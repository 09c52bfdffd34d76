//! Protocol constants

/// Length of the ASCII decimal frame header, in bytes
pub const HEADER_LENGTH: usize = 4;

/// Maximum frame body length; encoding fails at or above this size
pub const MAX_BODY_LENGTH: usize = 1024;

/// Default TCP port for the broadcast server
pub const DEFAULT_PORT: u16 = 9000;
