//! CLI command implementations.

pub mod files;
pub mod hash;
pub mod inspect;
pub mod verify;
