//! CLI command implementations.

pub mod contacts;
pub mod group;
pub mod init;
pub mod send;
pub mod status;
