//! # ninerun-core
//!
//! A library for launching compiled binary images, including transport
//! decoding of text-wrapped ("shebang") images.
//!
//! This crate provides the core functionality for:
//! - Deciding, from a file's name and leading bytes, whether it is a raw
//!   binary image or a base64 transport-wrapped one
//! - Producing a clean byte stream either way
//! - Driving an execution engine and folding every failure into a typed
//!   outcome with the right process exit code
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`source`]: Platform Gate, marker peek and byte stream resolution
//! - [`engine`]: the narrow execution engine contract
//! - [`launch`]: orchestration from file open to typed outcome
//! - [`error`]: Error types and exit-code mapping
//!
//! ## Example
//!
//! ```no_run
//! use ninerun_core::source::{resolve, OsFamily};
//! use std::fs::File;
//! use std::io::{BufReader, Read};
//! use std::path::Path;
//!
//! // Resolve a file into a clean image byte stream
//! let path = Path::new("a.out");
//! let file = File::open(path)?;
//! let mut stream = resolve(BufReader::new(file), path, OsFamily::current());
//!
//! let mut image = Vec::new();
//! stream.read_to_end(&mut image)?;
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! The execution engine is an external collaborator behind the
//! [`Engine`] trait (two operations: deserialize, execute), so the launch
//! logic is testable with a stub engine and real engines plug in without
//! touching this crate.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod engine;
pub mod error;
pub mod launch;
pub mod source;

// Re-export primary types for convenience
pub use engine::{Engine, ExecOptions, GuestIo, DEFAULT_STACK_BUDGET};
pub use error::{Error, Result};
pub use launch::{launch, LaunchRequest, Outcome};
pub use source::{resolve, wrapper_candidate, ImageStream, OsFamily, SourceMode, WRAPPER_MARKER};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
