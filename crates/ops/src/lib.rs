#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package fetch operations
//!
//! This crate sequences a fetch: manifest retrieval and verification,
//! precheck, then concurrent download and verification of every part.
//! `fetch_package` is the entry point; the lower-level steps are exported
//! for callers that already hold a trusted manifest.

mod context;
mod fetch;
mod parts;
mod verify;

pub use context::{OpsContextBuilder, OpsCtx};
pub use fetch::{fetch_package, FetchRequest};
pub use parts::{fetch_all_parts, part_timeout};
pub use verify::verify_part;
