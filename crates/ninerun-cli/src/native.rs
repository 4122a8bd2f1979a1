//! Host-process execution engine.
//!
//! [`NativeEngine`] covers the case where the decoded image is itself a
//! host executable: the byte stream is staged into an executable temporary
//! file and run as a child process. VM-style engines implement the same
//! [`Engine`] trait against their own image representation.

use ninerun_core::{Engine, Error, ExecOptions, GuestIo, Result};
use std::ffi::OsString;
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;
use tempfile::TempPath;
use tracing::{debug, trace};

/// A decoded image staged on disk, executable, deleted on drop.
pub struct StagedImage {
    path: TempPath,
}

/// Engine that runs the decoded image directly as a host process.
///
/// The stack budget in [`ExecOptions`] does not apply here; host processes
/// manage their own stacks.
#[derive(Debug, Default)]
pub struct NativeEngine;

impl NativeEngine {
    /// Creates a new native engine
    pub fn new() -> Self {
        Self
    }
}

impl Engine for NativeEngine {
    type Image = StagedImage;

    fn deserialize(&self, reader: &mut dyn Read) -> Result<StagedImage> {
        let mut staged = tempfile::Builder::new()
            .prefix("ninerun-image-")
            .tempfile()
            .map_err(|err| Error::deserialize(format!("failed to stage image: {err}")))?;

        let written = io::copy(reader, &mut staged)
            .map_err(|err| Error::deserialize(err.to_string()))?;
        trace!("staged {} image bytes at {}", written, staged.path().display());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staged
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o755))
                .map_err(|err| Error::deserialize(format!("failed to stage image: {err}")))?;
        }

        // Close the write handle before exec; keeping it open trips
        // ETXTBSY on Linux.
        Ok(StagedImage {
            path: staged.into_temp_path(),
        })
    }

    fn execute(
        &self,
        image: &StagedImage,
        argv: &[OsString],
        io: GuestIo<'_>,
        options: &ExecOptions,
    ) -> Result<i32> {
        let mut command = Command::new(image.path.as_os_str());
        if let Some(rest) = argv.get(1..) {
            command.args(rest);
        }
        #[cfg(unix)]
        if let Some(argv0) = argv.first() {
            use std::os::unix::process::CommandExt;
            command.arg0(argv0);
        }
        if !options.working_dir.is_empty() {
            command.current_dir(&options.working_dir);
        }

        // The guest reads the launcher's own stdin directly; a pumped pipe
        // would hold the launcher open on a blocked read after guest exit.
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("spawning staged image {}", image.path.display());
        let mut child = command
            .spawn()
            .map_err(|err| Error::execution(1, format!("failed to start guest: {err}")))?;

        let mut child_out = child
            .stdout
            .take()
            .ok_or_else(|| Error::execution(1, "guest stdout pipe missing"))?;
        let mut child_err = child
            .stderr
            .take()
            .ok_or_else(|| Error::execution(1, "guest stderr pipe missing"))?;

        let GuestIo { stdout, stderr, .. } = io;
        let status = thread::scope(|scope| {
            scope.spawn(move || {
                let _ = io::copy(&mut child_out, stdout);
            });
            scope.spawn(move || {
                let _ = io::copy(&mut child_err, stderr);
            });
            child.wait()
        })
        .map_err(|err| Error::execution(1, format!("failed to wait for guest: {err}")))?;

        match status.code() {
            Some(code) => Ok(code),
            None => {
                #[cfg(unix)]
                {
                    use std::os::unix::process::ExitStatusExt;
                    if let Some(signal) = status.signal() {
                        return Err(Error::execution(
                            1,
                            format!("guest terminated by signal {signal}"),
                        ));
                    }
                }
                Err(Error::execution(1, "guest terminated without an exit status"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(unix)]
    fn run_script(script: &[u8], argv: &[OsString]) -> (Result<i32>, Vec<u8>, Vec<u8>) {
        let engine = NativeEngine::new();
        let mut source: &[u8] = script;
        let image = engine.deserialize(&mut source).unwrap();

        let mut stdin = io::empty();
        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let status = engine.execute(
            &image,
            argv,
            GuestIo::new(&mut stdin, &mut stdout, &mut stderr),
            &ExecOptions::default(),
        );
        (status, stdout, stderr)
    }

    #[test]
    #[cfg(unix)]
    fn test_runs_staged_image_and_captures_output() {
        let script = b"#!/bin/sh\necho guest-out\necho guest-err >&2\nexit 7\n";
        let (status, stdout, stderr) = run_script(script, &[OsString::from("guest")]);
        assert_eq!(status.unwrap(), 7);
        assert_eq!(stdout, b"guest-out\n");
        assert_eq!(stderr, b"guest-err\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_forwards_guest_arguments() {
        let script = b"#!/bin/sh\necho \"$1 $2\"\n";
        let argv = [
            OsString::from("guest"),
            OsString::from("alpha"),
            OsString::from("beta"),
        ];
        let (status, stdout, _) = run_script(script, &argv);
        assert_eq!(status.unwrap(), 0);
        assert_eq!(stdout, b"alpha beta\n");
    }

    #[test]
    fn test_unrunnable_image_is_an_execution_error() {
        let engine = NativeEngine::new();
        let mut source: &[u8] = b"\x01\x02\x03 not an executable";
        let image = engine.deserialize(&mut source).unwrap();

        let mut stdin = io::empty();
        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let result = engine.execute(
            &image,
            &[OsString::from("guest")],
            GuestIo::new(&mut stdin, &mut stdout, &mut stderr),
            &ExecOptions::default(),
        );
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("failed to start guest"));
    }
}
