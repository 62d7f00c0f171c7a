// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # winmdscope
//!
//! A reader for Windows metadata (`.winmd`) files that turns the ECMA-335 tables describing
//! native Win32 APIs into a cross-referenced type graph, ready for binding generators.
//!
//! ## Features
//!
//! - **Memory-mapped input** - the file is mapped once and decoded in place
//! - **Native type graph** - structs, unions, enums, function pointers, COM interfaces, aliases,
//!   pointers and fixed arrays, all referenced by stable ids into one arena
//! - **Struct layout** - sizes, alignments, member offsets, padding and flexible array members
//!   computed for 64-bit targets
//! - **Architecture variants** - types and functions declared differently for X64 and ARM64
//!   are split into per-architecture copies, along with every struct depending on them
//! - **Scopes** - select structs, enums, interfaces, functions and constants by name and
//!   expand the selection to everything it references
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use winmdscope::prelude::*;
//! use std::{collections::BTreeSet, path::Path};
//!
//! let metadata = Metadata::load(Path::new("Windows.Win32.winmd"))?;
//!
//! let mut report = |event: &Event| eprintln!("{event}");
//! let mut scope = Scope::new(&metadata, &mut report);
//! scope.add_functions(&BTreeSet::from(["CreateFileW".to_string()]));
//! scope.build_transitive_scope()?;
//!
//! for id in scope.transitive_types() {
//!     println!("{}", metadata.get_type(*id).name);
//! }
//! # Ok::<(), winmdscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`File`] provides byte access to the PE image and locates the CLI metadata
//! - [`metadata`] decodes streams, tables and blobs and builds the [`Metadata`] graph
//! - [`scope`] resolves user selections against a built graph
//!
//! Loading is all-or-nothing: malformed input returns an [`Error`] and no graph.

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use winmdscope::prelude::*;
///
/// let metadata = Metadata::load("Windows.Win32.winmd".as_ref())?;
/// let guid = metadata.get_type(metadata.guid_type());
/// assert_eq!(guid.name, "Guid");
/// # Ok::<(), winmdscope::Error>(())
/// ```
pub mod prelude;

/// Decoding of ECMA-335 metadata and construction of the native type graph
///
/// # Key Components
///
/// - [`metadata::root`] - Metadata root and stream directory
/// - [`metadata::streams`] - The `#~`, `#Strings` and `#Blob` streams
/// - [`metadata::tables`] - Raw rows of the consumed tables
/// - [`metadata::signatures`] - Field, method and delegate signatures
/// - [`metadata::customattributes`] - Custom attribute blobs
/// - [`metadata::typesystem`] - Types, methods and constants of the graph
/// - [`metadata::graph`] - The [`Metadata`] arena and its queries
pub mod metadata;

/// Name-based selections over a loaded graph
pub mod scope;

/// `winmdscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `winmdscope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use winmdscope::{Error, Metadata};
///
/// match Metadata::load(std::path::Path::new("broken.winmd")) {
///     Ok(metadata) => println!("loaded {}", metadata.version()),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// The loaded type graph and the knobs used to build it.
pub use metadata::{config::LoaderConfig, graph::Metadata};

/// Scope resolution over a loaded graph.
pub use scope::Scope;

/// Metadata streams for direct access to the decoded heaps and tables.
pub use metadata::streams::{Blob, StreamHeader, Strings, TablesHeader};

/// Low-level file and byte parsing utilities.
///
/// # Example
///
/// ```rust
/// use winmdscope::Parser;
///
/// let data = [0x81, 0x80, 0x07];
/// let mut parser = Parser::new(&data);
/// assert_eq!(parser.read_compressed_uint()?, 0x0180);
/// assert_eq!(parser.read_le::<u8>()?, 0x07);
/// # Ok::<(), winmdscope::Error>(())
/// ```
pub use file::{parser::Parser, File};
