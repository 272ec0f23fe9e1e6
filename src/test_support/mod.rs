//! Shared helpers for unit tests that need real sockets.

pub mod socket_guard;
