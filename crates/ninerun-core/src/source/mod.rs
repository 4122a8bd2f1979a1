//! Image source resolution.
//!
//! This module decides, from a target file's name and leading bytes, whether
//! the file is a raw binary image or a text-wrapped ("shebang") encoded
//! image, and produces a clean byte stream either way.
//!
//! ## Transport wrapper format
//!
//! ```text
//! @99run <optional metadata...>\n
//! @<any header line>\n
//! ... (zero or more additional '@'-prefixed lines)
//! <base64-encoded binary image bytes>
//! ```
//!
//! The wrapper exists so a binary image can double as a double-clickable
//! script on Windows. It is only recognized when two independent guards
//! both pass:
//!
//! 1. The [Platform Gate](wrapper_candidate): the launcher runs on Windows
//!    and the file carries a `.bat` or `.cmd` extension.
//! 2. The marker peek: the first 7 bytes of the file are exactly `@99run `.
//!
//! If either guard fails the file is read raw, byte for byte, including any
//! bytes consumed while peeking.

mod filter;

use filter::LineEndingFilter;
use std::io::{self, BufRead, Chain, Cursor, Read};
use std::path::Path;
use tracing::{debug, trace};

use base64::engine::general_purpose::{GeneralPurpose, STANDARD};
use base64::read::DecoderReader;

/// Exact marker bytes that open a transport-wrapped image
pub const WRAPPER_MARKER: &[u8; 7] = b"@99run ";

/// Base64 engine used for the wrapper payload
static STANDARD_BASE64: GeneralPurpose = STANDARD;

/// Operating system family relevant to the Platform Gate.
///
/// The resolver takes the family as a parameter rather than consulting the
/// host directly, so gate behavior is testable on any platform. Use
/// [`OsFamily::current`] for the real decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    /// A Windows-like environment where clickable script wrappers apply
    Windows,
    /// Any other operating system
    Other,
}

impl OsFamily {
    /// Returns the family of the running host
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// How a byte stream was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// The file is read as-is
    Raw,
    /// The file carried the transport wrapper; the stream decodes its payload
    Wrapped,
}

/// Bytes peeked ahead of the remaining source, restored in reading order
type Restored<R> = Chain<Cursor<Vec<u8>>, R>;

/// The resolved byte stream of a binary image.
///
/// Yields the image bytes regardless of whether they came from a direct
/// read or from decoding the transport wrapper's base64 payload.
pub struct ImageStream<R: Read> {
    inner: Inner<R>,
    mode: SourceMode,
}

enum Inner<R: Read> {
    Raw(Restored<R>),
    Wrapped(DecoderReader<'static, GeneralPurpose, LineEndingFilter<Restored<R>>>),
}

impl<R: Read> ImageStream<R> {
    fn raw(peeked: Vec<u8>, rest: R) -> Self {
        Self {
            inner: Inner::Raw(Cursor::new(peeked).chain(rest)),
            mode: SourceMode::Raw,
        }
    }

    fn wrapped(peeked: Vec<u8>, rest: R) -> Self {
        let payload = LineEndingFilter::new(Cursor::new(peeked).chain(rest));
        Self {
            inner: Inner::Wrapped(DecoderReader::new(payload, &STANDARD_BASE64)),
            mode: SourceMode::Wrapped,
        }
    }

    /// Returns how this stream was resolved
    pub fn mode(&self) -> SourceMode {
        self.mode
    }
}

impl<R: Read> Read for ImageStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Raw(inner) => inner.read(buf),
            Inner::Wrapped(inner) => inner.read(buf),
        }
    }
}

/// Platform Gate: returns true when the transport wrapper form may apply.
///
/// The wrapper is only recognized on Windows for files with a `.bat` or
/// `.cmd` extension (exact, case-sensitive). This predicate is independent
/// of the file's content.
pub fn wrapper_candidate(family: OsFamily, path: &Path) -> bool {
    family == OsFamily::Windows
        && matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("bat" | "cmd")
        )
}

/// Resolves a readable source into a byte stream of the binary image.
///
/// Never fails: every guard failure degrades to raw mode with any peeked
/// bytes restored in front of the unconsumed remainder. When the Platform
/// Gate passes and the first 7 bytes match [`WRAPPER_MARKER`], the marker
/// line and every following `@`-prefixed header line are skipped and the
/// remainder is wrapped in a base64 decoder.
///
/// A header section that never ends (all remaining lines start with `@`, or
/// the source ends mid-line) yields an empty decoded stream; the failure
/// surfaces later, when the engine's loader finds no bytes to decode.
pub fn resolve<R: BufRead>(mut reader: R, path: &Path, family: OsFamily) -> ImageStream<R> {
    if !wrapper_candidate(family, path) {
        trace!("platform gate rejected '{}', reading raw", path.display());
        return ImageStream::raw(Vec::new(), reader);
    }

    let mut head = [0u8; WRAPPER_MARKER.len()];
    let filled = peek_head(&mut reader, &mut head);
    if filled < head.len() || head != *WRAPPER_MARKER {
        debug!("no transport wrapper marker in '{}', reading raw", path.display());
        return ImageStream::raw(head[..filled].to_vec(), reader);
    }

    debug!("transport wrapper detected in '{}'", path.display());
    let first_payload_byte = skip_wrapper_headers(&mut reader);
    ImageStream::wrapped(
        first_payload_byte.map(|byte| vec![byte]).unwrap_or_default(),
        reader,
    )
}

/// Reads up to `head.len()` bytes, returning how many were available.
///
/// A short count (including on read error) means the file cannot be a valid
/// wrapper; the caller falls back to raw mode with the bytes restored.
fn peek_head<R: Read>(reader: &mut R, head: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < head.len() {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    filled
}

/// Consumes the marker line and subsequent `@`-prefixed header lines.
///
/// Returns the first payload byte, already consumed from the reader, or
/// `None` when the source ended inside the header section.
fn skip_wrapper_headers<R: BufRead>(reader: &mut R) -> Option<u8> {
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => return None,
            // Last line of the file, no terminator: header section ended.
            Ok(_) if !line.ends_with(b"\n") => return None,
            Ok(_) => {}
        }
        match read_one(reader) {
            None => return None,
            Some(b'@') => continue,
            Some(first) => return Some(first),
        }
    }
}

fn read_one<R: Read>(reader: &mut R) -> Option<u8> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return None,
            Ok(_) => return Some(byte[0]),
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return None,
        }
    }
}
