//! Third-party copy server library
//!
//! This library exposes the server's internal modules for integration testing.

pub mod connection;
pub mod constants;
pub mod transfer_manager;
pub mod transfers;
