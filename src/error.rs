use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every failure this library can return.
///
/// Loading a metadata file is all-or-nothing: any violation of the binary format's own
/// consistency rules surfaces as [`Error::Malformed`] or [`Error::OutOfBounds`] and aborts the
/// load, there is no partially built graph. Requests against an already loaded graph fail with
/// [`Error::InvalidScope`] and leave the graph untouched.
///
/// # Error Categories
///
/// ## File Parsing Errors
/// - [`Error::Malformed`] - Corrupted or inconsistent file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond a buffer or blob boundary
/// - [`Error::NotSupported`] - Metadata feature outside the supported encoding
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem errors while opening or mapping the input
///
/// ## Request Errors
/// - [`Error::InvalidScope`] - A transitive scope was requested while invalid names are recorded
///
/// # Examples
///
/// ```rust,no_run
/// use winmdscope::{Error, Metadata};
/// use std::path::Path;
///
/// match Metadata::load(Path::new("Windows.Win32.winmd")) {
///     Ok(metadata) => println!("{} types", metadata.types().count()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed metadata: {} ({}:{})", message, file, line);
///     }
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be decoded.
    ///
    /// The error carries the source location where the inconsistency was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// Description of what was malformed
        message: String,
        /// The source file in which this error occurred
        file: &'static str,
        /// The source line in which this error occurred
        line: u32,
    },

    /// A read past the end of a buffer or a bounded blob was attempted.
    #[error("Out of bound read would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occurred
        file: &'static str,
        /// The source line in which this error occurred
        line: u32,
    },

    /// The metadata uses a feature outside the supported encoding (generics,
    /// multi-dimensional arrays, debug tables, ...).
    #[error("This metadata feature is not supported - {0}")]
    NotSupported(String),

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// Wrapper for filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A transitive scope was requested while some requested names are invalid.
    #[error("Invalid scope - {0}")]
    InvalidScope(String),
}
