//! Error Types
//!
//! Data-driven runtime conditions (masked alpha cutoff, absent light probe,
//! absent shadow-casting light) are normal control flow and never surface
//! here. [`LustreError`] covers the failures the program cache can report
//! when a generated shader references resources it cannot resolve.
//!
//! Programmer-contract violations (out-of-order stage generation, UV set
//! out of range) are assertions, not errors: continuing would emit invalid
//! shader text.

use thiserror::Error;

/// The error type for shader generation and program compilation.
#[derive(Error, Debug)]
pub enum LustreError {
    /// A generated stage requested an include the shader library does not
    /// provide.
    #[error("Unknown shader include: {0}")]
    UnknownInclude(String),

    /// A generated stage requested a library function the shader library
    /// does not provide.
    #[error("Unknown shader library function: {0}")]
    UnknownFunction(String),

    /// The external backend rejected the generated program text.
    #[error("Shader compilation failed for '{cache_key}': {message}")]
    CompileFailed {
        /// Cache key of the offending program.
        cache_key: String,
        /// Backend-reported diagnostic.
        message: String,
    },
}

/// Alias for `Result<T, LustreError>`.
pub type Result<T> = std::result::Result<T, LustreError>;
