//! Crate-level behavioural tests and shared test support.

pub(crate) mod support;
