//! Execution engine contract.
//!
//! The launcher does not interpret binary images itself; it hands the
//! resolved byte stream to an engine behind the narrow [`Engine`] trait
//! (two operations: deserialize, execute). This keeps the launch logic
//! independently testable with a stub engine and lets VM-style engines and
//! host-process engines plug in interchangeably.

use crate::error::Result;
use std::ffi::OsString;
use std::io::{Read, Write};

/// Default auxiliary memory/stack budget handed to the engine (8 MiB)
pub const DEFAULT_STACK_BUDGET: usize = 8 << 20;

/// Standard streams lent to the engine for the duration of a run.
///
/// The launcher passes its own stdin/stdout/stderr here; tests pass byte
/// buffers. The engine may drive these from internal threads, so the
/// trait objects are `Send`.
pub struct GuestIo<'a> {
    /// Guest standard input
    pub stdin: &'a mut (dyn Read + Send),
    /// Guest standard output, passed through unmodified
    pub stdout: &'a mut (dyn Write + Send),
    /// Guest standard error
    pub stderr: &'a mut (dyn Write + Send),
}

impl<'a> GuestIo<'a> {
    /// Bundles the three standard streams
    pub fn new(
        stdin: &'a mut (dyn Read + Send),
        stdout: &'a mut (dyn Write + Send),
        stderr: &'a mut (dyn Write + Send),
    ) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }
}

/// Engine-specific execution knobs.
///
/// The launcher always passes the defaults: zero flags, an 8 MiB stack
/// budget and no working context. Engines are free to ignore knobs that do
/// not apply to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Engine-defined flag word, zero for a plain run
    pub flags: u32,
    /// Auxiliary memory/stack budget in bytes
    pub stack_budget: usize,
    /// Optional working context for the guest; empty means unset
    pub working_dir: String,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            flags: 0,
            stack_budget: DEFAULT_STACK_BUDGET,
            working_dir: String::new(),
        }
    }
}

/// An external execution engine for binary images.
pub trait Engine {
    /// The engine's deserialized image representation
    type Image;

    /// Loads a binary image from a resolved byte stream.
    ///
    /// Transport-decoding failures surface here too, when the loader first
    /// reads bytes from the stream.
    fn deserialize(&self, reader: &mut dyn Read) -> Result<Self::Image>;

    /// Runs a loaded image to completion and returns its status code.
    ///
    /// `argv` carries the full guest argument list, with the image path in
    /// position 0. A failed run is reported as [`Error::Execution`] carrying
    /// the engine's status code alongside the message.
    ///
    /// [`Error::Execution`]: crate::error::Error::Execution
    fn execute(
        &self,
        image: &Self::Image,
        argv: &[OsString],
        io: GuestIo<'_>,
        options: &ExecOptions,
    ) -> Result<i32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ExecOptions::default();
        assert_eq!(options.flags, 0);
        assert_eq!(options.stack_budget, 8 * 1024 * 1024);
        assert!(options.working_dir.is_empty());
    }
}
