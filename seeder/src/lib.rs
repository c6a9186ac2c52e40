//! copro-seed - idempotent initialisation of the Copro Connect database
//!
//! Creates the default administrator account and imports the resident seed
//! file on first run, leaving already-populated collections untouched.

pub mod config;
pub mod credentials;
pub mod entity;
pub mod error;
pub mod residents;
pub mod schema;
pub mod seed;
pub mod store;

pub use error::SeedError;
