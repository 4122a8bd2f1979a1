//! ninerun - Run compiled binary images.
//!
//! Given a path to a binary image, the launcher decides whether the file is
//! raw or carried inside the `@99run ` script transport wrapper, produces a
//! clean byte stream, and hands it to an execution engine together with the
//! guest's arguments and the process's standard streams.

use clap::Parser;
use ninerun_core::{launch, GuestIo, LaunchRequest};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod native;

use native::NativeEngine;

/// Run compiled binary images, unwrapping the script transport encoding
#[derive(Parser, Debug)]
#[command(name = "ninerun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the binary image to run
    image: PathBuf,

    /// Arguments forwarded verbatim to the guest program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // Diagnostics go to stderr only; stdout belongs to the guest program.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let request = LaunchRequest::new(cli.image, cli.args);
    let engine = NativeEngine::new();

    let mut stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let outcome = launch(
        &engine,
        &request,
        GuestIo::new(&mut stdin, &mut stdout, &mut stderr),
    );

    if let Some(message) = outcome.message {
        let program = std::env::args()
            .next()
            .unwrap_or_else(|| String::from("ninerun"));
        eprintln!("{program}: {message}");
    }
    process::exit(outcome.code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_image_path_is_required() {
        // Exit code 2 in the binary; surfaced as a usage error here.
        let err = Cli::try_parse_from(["ninerun"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_guest_arguments_keep_their_hyphens() {
        let cli = Cli::try_parse_from(["ninerun", "a.out", "-x", "--flag", "value"]).unwrap();
        assert_eq!(cli.image, PathBuf::from("a.out"));
        assert_eq!(
            cli.args,
            vec![
                OsString::from("-x"),
                OsString::from("--flag"),
                OsString::from("value"),
            ]
        );
    }

    #[test]
    fn test_verbosity_before_the_image_path() {
        let cli = Cli::try_parse_from(["ninerun", "-vv", "a.out"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.image, PathBuf::from("a.out"));
        assert!(cli.args.is_empty());
    }
}
