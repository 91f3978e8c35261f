//! Matrix homeserver registration client.

mod client;
mod types;

pub use client::{HomeserverClient, REGISTER_PATH};
pub use types::*;
