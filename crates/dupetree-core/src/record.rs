//! Line-oriented fingerprint records.
//!
//! Two record kinds share one layout, three fields separated by exactly two
//! spaces, one record per newline-terminated line:
//!
//! ```text
//! <32 hex chars>  <encoding tag>  <path>     hash record
//! <decimal size>  <encoding tag>  <path>     size record
//! ```
//!
//! The path field is the standard base64 encoding of the raw path bytes, so
//! file names that are not valid UTF-8 survive a round trip. The tag says
//! whether those bytes were UTF-8 (`utf-8`), something else
//! (`unknown-encoding`), or that the record was carried over from a previous
//! run (`preserved`). The `raw` tag marks a path stored as plain text.

use std::borrow::Cow;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LineError, RecordError, RecordErrorKind};
use crate::node::ContentHash;

/// Separator between the three fields of a record line.
pub const FIELD_SEPARATOR: &str = "  ";

/// Encoding tag stored in the second field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathEncoding {
    /// Base64 of bytes that are valid UTF-8.
    Utf8,
    /// Base64 of bytes that are not valid UTF-8.
    Unknown,
    /// Base64, re-emitted from an earlier run without revisiting the file.
    Preserved,
    /// Plain text path, no base64.
    Raw,
}

impl PathEncoding {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Unknown => "unknown-encoding",
            Self::Preserved => "preserved",
            Self::Raw => "raw",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "utf-8" => Some(Self::Utf8),
            "unknown-encoding" => Some(Self::Unknown),
            "preserved" => Some(Self::Preserved),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }

    /// Pick `Utf8` or `Unknown` for raw path bytes.
    pub fn detect(bytes: &[u8]) -> Self {
        if std::str::from_utf8(bytes).is_ok() {
            Self::Utf8
        } else {
            Self::Unknown
        }
    }
}

/// A record kind that can be parsed from and rendered to a single line.
pub trait Record: Sized {
    /// Parse one line, without its trailing newline.
    fn parse_line(line: &str) -> Result<Self, RecordErrorKind>;

    /// Render one line, without a trailing newline.
    fn to_line(&self) -> String;

    /// The path this record describes.
    fn path(&self) -> &Path;
}

/// Content hash of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    pub hash: ContentHash,
    pub encoding: PathEncoding,
    pub path: PathBuf,
}

impl HashRecord {
    /// Build a record, tagging the path by its byte encoding.
    pub fn new(hash: ContentHash, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            hash,
            encoding: PathEncoding::detect(&path_to_bytes(&path)),
            path,
        }
    }

    /// Build a record carried over from a previous run.
    pub fn preserved(hash: ContentHash, path: impl Into<PathBuf>) -> Self {
        Self {
            hash,
            encoding: PathEncoding::Preserved,
            path: path.into(),
        }
    }
}

impl Record for HashRecord {
    fn parse_line(line: &str) -> Result<Self, RecordErrorKind> {
        let [hash, tag, path] = split_fields(line)?;
        let hash = ContentHash::from_hex(hash)?;
        let encoding =
            PathEncoding::from_tag(tag).ok_or_else(|| RecordErrorKind::EncodingTag(tag.into()))?;
        let path = decode_path(path, encoding)?;
        Ok(Self {
            hash,
            encoding,
            path,
        })
    }

    fn to_line(&self) -> String {
        format_line(&self.hash.to_hex(), self.encoding, &self.path)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Size in bytes of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeRecord {
    pub size: u64,
    pub encoding: PathEncoding,
    pub path: PathBuf,
}

impl SizeRecord {
    /// Build a record, tagging the path by its byte encoding.
    pub fn new(size: u64, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            size,
            encoding: PathEncoding::detect(&path_to_bytes(&path)),
            path,
        }
    }

    /// Build a record carried over from a previous run.
    pub fn preserved(size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            size,
            encoding: PathEncoding::Preserved,
            path: path.into(),
        }
    }
}

impl Record for SizeRecord {
    fn parse_line(line: &str) -> Result<Self, RecordErrorKind> {
        let [size, tag, path] = split_fields(line)?;
        let size = size
            .parse::<u64>()
            .map_err(|_| RecordErrorKind::Size(size.into()))?;
        let encoding =
            PathEncoding::from_tag(tag).ok_or_else(|| RecordErrorKind::EncodingTag(tag.into()))?;
        let path = decode_path(path, encoding)?;
        Ok(Self {
            size,
            encoding,
            path,
        })
    }

    fn to_line(&self) -> String {
        format_line(&self.size.to_string(), self.encoding, &self.path)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn split_fields(line: &str) -> Result<[&str; 3], RecordErrorKind> {
    let mut fields = line.splitn(3, FIELD_SEPARATOR);
    let (Some(first), Some(tag), Some(path)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(RecordErrorKind::FieldCount(line.split(FIELD_SEPARATOR).count()));
    };

    // Only raw paths may contain the separator themselves.
    if tag != PathEncoding::Raw.tag() && path.trim_end().contains(FIELD_SEPARATOR) {
        return Err(RecordErrorKind::FieldCount(line.split(FIELD_SEPARATOR).count()));
    }
    Ok([first.trim(), tag, path])
}

fn format_line(first: &str, encoding: PathEncoding, path: &Path) -> String {
    let field = match encoding {
        PathEncoding::Raw => path.to_string_lossy().into_owned(),
        _ => BASE64.encode(path_to_bytes(path)),
    };
    format!(
        "{first}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{field}",
        encoding.tag()
    )
}

fn decode_path(field: &str, encoding: PathEncoding) -> Result<PathBuf, RecordErrorKind> {
    match encoding {
        PathEncoding::Raw => Ok(PathBuf::from(field)),
        _ => BASE64
            .decode(field.trim())
            .map(bytes_to_path)
            .map_err(|e| RecordErrorKind::Base64(e.to_string())),
    }
}

/// Decode one base64 path field as used in missing-file lists.
pub fn decode_base64_path(field: &str) -> Result<PathBuf, RecordErrorKind> {
    decode_path(field, PathEncoding::Utf8)
}

/// Encode a path as a single base64 field.
pub fn encode_base64_path(path: &Path) -> String {
    BASE64.encode(path_to_bytes(path))
}

/// Raw bytes of a path.
#[cfg(unix)]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Rebuild a path from raw bytes.
#[cfg(unix)]
pub fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
pub fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Render a path for display. Never use the result as a comparison key.
pub fn display_lossy(path: &Path) -> String {
    match path.to_str() {
        Some(s) => s.to_string(),
        None => format!("(approx) {}", path.to_string_lossy()),
    }
}

/// How to treat malformed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseMode {
    /// The first malformed line aborts the read.
    #[default]
    Strict,
    /// Malformed lines are skipped and collected.
    Relaxed,
}

/// Records read from one source plus the lines that were skipped.
#[derive(Debug, Clone)]
pub struct RecordBatch<T> {
    pub records: Vec<T>,
    pub errors: Vec<LineError>,
    /// Lines read, blank ones included.
    pub lines: usize,
}

impl<T> RecordBatch<T> {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            errors: Vec::new(),
            lines: 0,
        }
    }

    /// Number of malformed lines skipped.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Read every record from `reader`. Blank lines are ignored.
pub fn read_records<T: Record>(
    mut reader: impl BufRead,
    mode: ParseMode,
) -> Result<RecordBatch<T>, RecordError> {
    let mut batch = RecordBatch::empty();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        batch.lines += 1;

        let parsed = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim_end_matches(['\n', '\r']);
                if line.trim().is_empty() {
                    continue;
                }
                T::parse_line(line).map_err(|kind| (kind, line.to_string()))
            }
            Err(_) => Err((
                RecordErrorKind::NotUtf8,
                String::from_utf8_lossy(&buf).trim_end().to_string(),
            )),
        };

        match parsed {
            Ok(record) => batch.records.push(record),
            Err((kind, content)) => {
                let error = LineError {
                    line: batch.lines,
                    kind,
                    content,
                };
                match mode {
                    ParseMode::Strict => return Err(error.into()),
                    ParseMode::Relaxed => {
                        warn!(line = error.line, "skipping malformed record: {}", error.kind);
                        batch.errors.push(error);
                    }
                }
            }
        }
    }

    Ok(batch)
}

/// Appends whole records, one `write_all` per newline-terminated line.
///
/// Wrap files in [`std::io::LineWriter`] (or write unbuffered) so that an
/// abort never leaves a partial line behind.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Append one record.
    pub fn append<T: Record>(&mut self, record: &T) -> io::Result<()> {
        let mut line = record.to_line();
        line.push('\n');
        self.inner.write_all(line.as_bytes())?;
        self.written += 1;
        Ok(())
    }

    /// Number of records appended so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
