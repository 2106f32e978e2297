//! Loading records from input files.
//!
//! Files ending in `.lo` are compiled objects. Anything else is a normalized
//! record in JSON, the hand-off format of the configuration front-end:
//!
//! ```json
//! { "keys": [[1, 0, 0, 0], [10, 0, 0, 0]], "payload": [17], "checksum": 161 }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::record::entry::{Key, Record};
use crate::record::object::{OBJECT_EXTENSION, ObjectError, decode_object};

/// On-disk JSON shape of a normalized record.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordFile {
    keys: Vec<Vec<u8>>,
    payload: Vec<u8>,
    checksum: u8,
}

impl From<RecordFile> for Record {
    fn from(file: RecordFile) -> Self {
        Self::new(
            file.keys.into_iter().map(Key::new).collect(),
            file.payload,
            file.checksum,
        )
    }
}

/// Parse a normalized record from JSON text.
pub fn parse_record(text: &str) -> Result<Record, serde_json::Error> {
    serde_json::from_str::<RecordFile>(text).map(Record::from)
}

/// Render a record in the normalized JSON form.
pub fn record_to_json(record: &Record) -> Result<String, serde_json::Error> {
    let file = RecordFile {
        keys: record.keys.iter().map(|k| k.as_bytes().to_vec()).collect(),
        payload: record.payload.clone(),
        checksum: record.checksum,
    };
    serde_json::to_string_pretty(&file)
}

/// True if `path` names a compiled object.
#[must_use]
pub fn is_object_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == OBJECT_EXTENSION)
}

/// Load the single record held by an input file.
pub fn load_record(path: &Path) -> Result<Record, InputError> {
    let bytes = std::fs::read(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if is_object_path(path) {
        return decode_object(&bytes).map_err(|source| InputError::Object {
            path: path.to_path_buf(),
            source,
        });
    }

    let text = String::from_utf8(bytes).map_err(|_| InputError::NotUtf8(path.to_path_buf()))?;
    parse_record(&text).map_err(|source| InputError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors raised while reading an input file.
#[derive(Debug)]
pub enum InputError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    NotUtf8(PathBuf),
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Object {
        path: PathBuf,
        source: ObjectError,
    },
}

impl InputError {
    /// The input file the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::NotUtf8(path)
            | Self::Json { path, .. }
            | Self::Object { path, .. } => path,
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Self::NotUtf8(path) => write!(f, "{} is not UTF-8 JSON", path.display()),
            Self::Json { path, source } => {
                write!(f, "invalid record in {}: {source}", path.display())
            }
            Self::Object { path, source } => {
                write!(f, "invalid object file {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Object { source, .. } => Some(source),
            Self::NotUtf8(_) => None,
        }
    }
}
