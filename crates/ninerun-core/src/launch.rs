//! Launch orchestration.
//!
//! Opens the target file, resolves its byte stream through the
//! [`source`](crate::source) module, and drives the engine's deserialize
//! and execute operations. The result is a typed [`Outcome`] rather than a
//! process exit: only the binary's entry point terminates the process, so
//! the whole chain stays testable.

use crate::engine::{Engine, ExecOptions, GuestIo};
use crate::error::{Error, Result};
use crate::source::{resolve, OsFamily};
use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A target reference: the image path plus the arguments to forward.
///
/// Built once from the process invocation and never mutated.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    path: PathBuf,
    args: Vec<OsString>,
}

impl LaunchRequest {
    /// Creates a request for the given image path and forwarded arguments
    pub fn new(path: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }

    /// Builds a request from raw arguments (program name already stripped).
    ///
    /// The first entry is the image path, the rest are forwarded to the
    /// guest. An empty list is a usage error; no file I/O is performed.
    pub fn from_argv(argv: impl IntoIterator<Item = OsString>) -> Result<Self> {
        let mut argv = argv.into_iter();
        let path = argv.next().ok_or(Error::Usage)?;
        Ok(Self::new(PathBuf::from(path), argv.collect()))
    }

    /// Path to the binary image
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full guest argument list, with the image path in position 0
    pub fn argv(&self) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.path.as_os_str().to_os_string());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// The terminal result of a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Process exit code to report
    pub code: i32,
    /// Diagnostic for standard error; `None` on a clean run
    pub message: Option<String>,
}

impl Outcome {
    /// An outcome with the given status and no diagnostic
    pub fn success(code: i32) -> Self {
        Self {
            code,
            message: None,
        }
    }
}

impl From<Error> for Outcome {
    fn from(err: Error) -> Self {
        Self {
            code: err.exit_code(),
            message: Some(err.to_string()),
        }
    }
}

/// Runs a binary image to completion through the given engine.
///
/// Opens the file, resolves raw-versus-wrapped for the current host, loads
/// the image and executes it with the launcher's standard streams and
/// default [`ExecOptions`]. Every failure folds into the returned
/// [`Outcome`]; an execution failure whose status is zero is reported as 1.
pub fn launch<E: Engine>(engine: &E, request: &LaunchRequest, io: GuestIo<'_>) -> Outcome {
    match try_launch(engine, request, io) {
        Ok(code) => Outcome::success(code),
        Err(err) => Outcome::from(err),
    }
}

fn try_launch<E: Engine>(engine: &E, request: &LaunchRequest, io: GuestIo<'_>) -> Result<i32> {
    let file =
        File::open(request.path()).map_err(|err| Error::file_open(request.path(), err))?;
    let mut stream = resolve(BufReader::new(file), request.path(), OsFamily::current());
    debug!(
        "resolved '{}' as {:?} source",
        request.path().display(),
        stream.mode()
    );
    let image = engine.deserialize(&mut stream)?;
    engine.execute(&image, &request.argv(), io, &ExecOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DEFAULT_STACK_BUDGET;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::{self, Read, Write};
    use tempfile::TempDir;

    /// Stub engine recording what the launcher hands it.
    #[derive(Default)]
    struct StubEngine {
        fail_load: Option<String>,
        exec_result: Option<std::result::Result<i32, (i32, String)>>,
        seen_image: RefCell<Option<Vec<u8>>>,
        seen_argv: RefCell<Option<Vec<OsString>>>,
        seen_options: RefCell<Option<ExecOptions>>,
    }

    impl Engine for StubEngine {
        type Image = Vec<u8>;

        fn deserialize(&self, reader: &mut dyn Read) -> Result<Vec<u8>> {
            if let Some(details) = &self.fail_load {
                return Err(Error::deserialize(details.clone()));
            }
            let mut bytes = Vec::new();
            reader
                .read_to_end(&mut bytes)
                .map_err(|err| Error::deserialize(err.to_string()))?;
            Ok(bytes)
        }

        fn execute(
            &self,
            image: &Vec<u8>,
            argv: &[OsString],
            _io: GuestIo<'_>,
            options: &ExecOptions,
        ) -> Result<i32> {
            *self.seen_image.borrow_mut() = Some(image.clone());
            *self.seen_argv.borrow_mut() = Some(argv.to_vec());
            *self.seen_options.borrow_mut() = Some(options.clone());
            match self.exec_result.clone().unwrap_or(Ok(0)) {
                Ok(code) => Ok(code),
                Err((status, message)) => Err(Error::execution(status, message)),
            }
        }
    }

    fn run(engine: &StubEngine, request: &LaunchRequest) -> Outcome {
        let mut stdin = io::empty();
        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let io = GuestIo::new(&mut stdin, &mut stdout, &mut stderr);
        launch(engine, request, io)
    }

    fn image_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_from_argv_requires_a_path() {
        let err = LaunchRequest::from_argv(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Usage));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_from_argv_splits_path_and_args() {
        let request = LaunchRequest::from_argv(vec![
            OsString::from("a.out"),
            OsString::from("-x"),
            OsString::from("value"),
        ])
        .unwrap();
        assert_eq!(request.path(), Path::new("a.out"));
        assert_eq!(
            request.argv(),
            vec![
                OsString::from("a.out"),
                OsString::from("-x"),
                OsString::from("value"),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_exit_one_with_message() {
        let dir = TempDir::new().unwrap();
        let request = LaunchRequest::new(dir.path().join("absent.bin"), Vec::new());
        let outcome = run(&StubEngine::default(), &request);
        assert_eq!(outcome.code, 1);
        assert!(outcome.message.unwrap().contains("failed to open image"));
    }

    #[test]
    fn test_raw_bytes_reach_the_engine_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = image_file(&dir, "prog.bin", &[0x01, 0x02, 0x03]);
        let engine = StubEngine::default();
        let request = LaunchRequest::new(&path, vec![OsString::from("arg1")]);
        let outcome = run(&engine, &request);

        assert_eq!(outcome, Outcome::success(0));
        assert_eq!(engine.seen_image.borrow().as_deref(), Some(&[1, 2, 3][..]));

        let argv = engine.seen_argv.borrow().clone().unwrap();
        assert_eq!(argv[0], path.as_os_str());
        assert_eq!(argv[1], OsString::from("arg1"));

        let options = engine.seen_options.borrow().clone().unwrap();
        assert_eq!(options.flags, 0);
        assert_eq!(options.stack_budget, DEFAULT_STACK_BUDGET);
        assert!(options.working_dir.is_empty());
    }

    #[test]
    fn test_guest_status_passes_through_silently() {
        let dir = TempDir::new().unwrap();
        let path = image_file(&dir, "prog.bin", b"image");
        let engine = StubEngine {
            exec_result: Some(Ok(42)),
            ..StubEngine::default()
        };
        let outcome = run(&engine, &LaunchRequest::new(path, Vec::new()));
        assert_eq!(outcome.code, 42);
        assert_eq!(outcome.message, None);
    }

    #[test]
    fn test_load_failure_is_exit_one() {
        let dir = TempDir::new().unwrap();
        let path = image_file(&dir, "prog.bin", b"garbage");
        let engine = StubEngine {
            fail_load: Some(String::from("bad magic")),
            ..StubEngine::default()
        };
        let outcome = run(&engine, &LaunchRequest::new(path, Vec::new()));
        assert_eq!(outcome.code, 1);
        assert!(outcome.message.unwrap().contains("bad magic"));
    }

    #[test]
    fn test_execution_failure_keeps_engine_status() {
        let dir = TempDir::new().unwrap();
        let path = image_file(&dir, "prog.bin", b"image");
        let engine = StubEngine {
            exec_result: Some(Err((3, String::from("guest fault")))),
            ..StubEngine::default()
        };
        let outcome = run(&engine, &LaunchRequest::new(path, Vec::new()));
        assert_eq!(outcome.code, 3);
        assert_eq!(outcome.message, Some(String::from("guest fault")));
    }

    #[test]
    fn test_execution_failure_with_zero_status_is_exit_one() {
        let dir = TempDir::new().unwrap();
        let path = image_file(&dir, "prog.bin", b"image");
        let engine = StubEngine {
            exec_result: Some(Err((0, String::from("engine fault")))),
            ..StubEngine::default()
        };
        let outcome = run(&engine, &LaunchRequest::new(path, Vec::new()));
        assert_eq!(outcome.code, 1);
        assert_eq!(outcome.message, Some(String::from("engine fault")));
    }
}
