//! Metadata streams (ECMA-335 II.24.2).
//!
//! Only the three streams native metadata needs are decoded: the `#~` tables, the `#Strings`
//! identifiers and the `#Blob` heap. `#GUID` and `#US` are ignored.

mod blob;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use tablesheader::TablesHeader;
