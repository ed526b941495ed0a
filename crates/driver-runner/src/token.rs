//! Single-use start tokens.
//!
//! A token is handed to the launcher when a driver component is created and
//! must come back, untouched, in the matching start request. Only its kernel
//! object id is remembered by the runner.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Numbered-handle id under which the start token travels.
///
/// Encodes handle type `User0` with argument zero.
pub const TOKEN_ID: u32 = 0xF0;

static NEXT_KOID: AtomicU64 = AtomicU64::new(1);

/// Kernel object id identifying a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Koid(u64);

impl Koid {
    /// Raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Koid {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unforgeable, non-clonable start token.
#[derive(Debug, PartialEq, Eq)]
pub struct Token {
    koid: Koid,
}

impl Token {
    /// Mints a token with a process-unique id.
    #[must_use]
    pub fn create() -> Self {
        Self {
            koid: Koid(NEXT_KOID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// Id of the underlying object.
    #[must_use]
    pub const fn koid(&self) -> Koid {
        self.koid
    }
}

/// A handle passed to a component at startup.
#[derive(Debug, PartialEq, Eq)]
pub struct HandleInfo {
    /// The handle, if it survived transit.
    pub handle: Option<Token>,
    /// Slot the handle is delivered in.
    pub id: u32,
}

impl HandleInfo {
    /// Wraps a start token in its numbered-handle slot.
    #[must_use]
    pub const fn token(token: Token) -> Self {
        Self {
            handle: Some(token),
            id: TOKEN_ID,
        }
    }
}
