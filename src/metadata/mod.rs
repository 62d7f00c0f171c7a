//! ECMA-335 metadata decoding and the native type graph built from it.
//!
//! Loading proceeds bottom-up through the submodules:
//!
//! - [`root`] and [`streams`] locate the `#~`, `#Strings` and `#Blob` streams
//! - [`tables`] decodes the raw table rows
//! - [`signatures`] and [`customattributes`] decode the blobs those rows reference
//! - the builder turns rows into the [`graph::Metadata`] arena of [`typesystem`] entities,
//!   splits architecture variants and computes struct layouts
//!
//! [`winmd::WinmdFile`] ties the decoding layer together and is the only input the builder sees.
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdscope::{LoaderConfig, Metadata};
//! use std::path::Path;
//!
//! let metadata = Metadata::load_with_config(
//!     Path::new("Windows.Win32.winmd"),
//!     LoaderConfig::without_exemptions(),
//! )?;
//! println!("metadata version {}", metadata.version());
//! for namespace in metadata.namespaces() {
//!     println!("{}: {} types", namespace.name, namespace.types().len());
//! }
//! # Ok::<(), winmdscope::Error>(())
//! ```

/// Loader knobs
pub mod config;
/// Custom attribute blob decoding
pub mod customattributes;
/// The type graph arena
pub mod graph;
/// The metadata root and stream directory
pub mod root;
/// Type and method signature decoding
pub mod signatures;
/// Metadata streams (tables, strings, blobs)
pub mod streams;
/// Raw metadata table rows
pub mod tables;
/// Entities of the type graph
pub mod typesystem;
/// Row-level access to a decoded metadata file
pub mod winmd;

pub(crate) mod builder;
pub(crate) mod layout;
pub(crate) mod variants;
