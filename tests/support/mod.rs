//! Shared utilities for integration tests.

pub mod socket_guard;
