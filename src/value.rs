//! Byte View Module
//!
//! Immutable view over a cached byte payload with an optional expiry instant.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

// == Byte View ==
/// An immutable handle over a byte payload and its expiry.
///
/// Clones share the same underlying buffer; the buffer itself can never be
/// mutated. Replacing a value means storing a new `ByteView`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteView {
    /// The stored payload
    bytes: Bytes,
    /// Expiry deadline in nanoseconds since the Unix epoch, `None` = never
    expires_at: Option<i64>,
}

impl ByteView {
    // == Constructors ==
    /// Creates a view over `bytes` that never expires.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            expires_at: None,
        }
    }

    /// Creates a view that expires at an absolute deadline
    /// (nanoseconds since the Unix epoch).
    pub fn expiring(bytes: impl Into<Bytes>, deadline_nanos: i64) -> Self {
        Self {
            bytes: bytes.into(),
            expires_at: Some(deadline_nanos),
        }
    }

    /// Creates a view that expires `ttl` from now.
    pub fn with_ttl(bytes: impl Into<Bytes>, ttl: Duration) -> Self {
        Self::expiring(bytes, unix_nanos_now() + ttl.as_nanos() as i64)
    }

    // == Accessors ==
    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Expiry deadline in nanoseconds since the Unix epoch, if any.
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    /// Expiry deadline as the wire encodes it: nanoseconds since the Unix
    /// epoch, with `0` meaning "no expiry".
    pub fn expire_unix_nanos(&self) -> i64 {
        self.expires_at.unwrap_or(0)
    }

    /// Returns true if this view's deadline has passed at `now_nanos`.
    pub fn is_expired_at(&self, now_nanos: i64) -> bool {
        match self.expires_at {
            Some(deadline) => deadline < now_nanos,
            None => false,
        }
    }

    /// The payload as an immutable byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the payload out into a fresh buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

// == Utility Functions ==
/// Returns the current Unix timestamp in nanoseconds.
pub fn unix_nanos_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_nanos() as i64
}
