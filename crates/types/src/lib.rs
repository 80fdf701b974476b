#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for pkgfetch
//!
//! This crate provides the data model shared by the fetch pipeline: the
//! signed package manifest, its part descriptors and the credential table
//! used to authenticate requests.

pub mod credentials;
pub mod manifest;

pub use credentials::{Credential, Credentials};
pub use manifest::{Manifest, Meta, Part, PartSource, ProvidedImage, Provides};
