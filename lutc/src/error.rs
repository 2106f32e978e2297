//! Errors surfaced by a compilation run.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::duplicates::format_key_path;
use crate::layout::LayoutError;
use crate::record::{InputError, KeyWidthMismatch, ObjectError};

/// A structure group whose entries disagree on payload size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSizes {
    pub path: Vec<u8>,
    pub sizes: BTreeSet<usize>,
}

/// A key shape mismatch, located among the run's inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// Position of the record among the run's inputs.
    pub index: usize,
    /// The file the record came from, when it came from one.
    pub path: Option<PathBuf>,
    pub mismatch: KeyWidthMismatch,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.mismatch),
            None => write!(f, "record {}: {}", self.index, self.mismatch),
        }
    }
}

/// Everything that can stop a run. No variant leaves output behind.
#[derive(Debug)]
pub enum CompileError {
    /// Invalid command-line or environment configuration.
    Config(ConfigError),
    /// Records whose keys do not match the run's key shape.
    KeyWidthMismatch(Vec<ShapeMismatch>),
    /// Full key paths carried by more than one record.
    DuplicateKey(BTreeSet<Vec<u8>>),
    /// Index or structure key paths that read as a header sentinel.
    SentinelKey(BTreeSet<Vec<u8>>),
    /// Structure groups mixing payload sizes.
    PayloadSizeMismatch(Vec<PayloadSizes>),
    /// A fixed page size below the smallest valid one.
    PageSizeTooSmall { page_size: u16, required: usize },
    /// The table cannot be addressed with 16-bit page sizes and indices.
    TableTooLarge(String),
    /// An object file with a version this crate does not read.
    UnsupportedObjectVersion { path: PathBuf, version: u8 },
    /// An object file that is truncated or otherwise malformed, or a record
    /// that does not fit the object format.
    MalformedObject {
        path: Option<PathBuf>,
        source: ObjectError,
    },
    /// An input that is not a valid normalized record.
    InvalidRecord { path: PathBuf, message: String },
    /// A filesystem operation failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A serialized record could not be found again through the reader.
    Unreachable { path: Vec<u8>, reason: String },
    /// Several inputs failed to load; one entry per input.
    Inputs(Vec<CompileError>),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::KeyWidthMismatch(mismatches) => {
                write!(f, "{} record(s) do not match the key widths:", mismatches.len())?;
                for mismatch in mismatches {
                    write!(f, "\n  {mismatch}")?;
                }
                Ok(())
            }
            Self::DuplicateKey(paths) => {
                write!(f, "{} duplicate key path(s):", paths.len())?;
                for path in paths {
                    write!(f, "\n  {}", format_key_path(path))?;
                }
                Ok(())
            }
            Self::SentinelKey(paths) => {
                write!(
                    f,
                    "{} key path(s) end in an all-0xFF key reserved for the header sentinel:",
                    paths.len()
                )?;
                for path in paths {
                    write!(f, "\n  {}", format_key_path(path))?;
                }
                Ok(())
            }
            Self::PayloadSizeMismatch(groups) => {
                write!(f, "{} structure(s) mix payload sizes:", groups.len())?;
                for group in groups {
                    write!(
                        f,
                        "\n  {} has sizes {:?}",
                        format_key_path(&group.path),
                        group.sizes
                    )?;
                }
                Ok(())
            }
            Self::PageSizeTooSmall {
                page_size,
                required,
            } => write!(
                f,
                "page size {page_size} is too small: this table needs at least {required} bytes per page"
            ),
            Self::TableTooLarge(message) => write!(f, "table too large: {message}"),
            Self::UnsupportedObjectVersion { path, version } => write!(
                f,
                "{} has unsupported object version {version}",
                path.display()
            ),
            Self::MalformedObject {
                path: Some(path),
                source,
            } => write!(f, "malformed object {}: {source}", path.display()),
            Self::MalformedObject { path: None, source } => write!(f, "malformed object: {source}"),
            Self::InvalidRecord { path, message } => {
                write!(f, "invalid record in {}: {message}", path.display())
            }
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Unreachable { path, reason } => write!(
                f,
                "internal error: record {} is not reachable in the table: {reason}",
                format_key_path(path)
            ),
            Self::Inputs(errors) => {
                write!(f, "{} input(s) could not be loaded:", errors.len())?;
                for error in errors {
                    write!(f, "\n  {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::MalformedObject { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for CompileError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<InputError> for CompileError {
    fn from(e: InputError) -> Self {
        match e {
            InputError::Io { path, source } => Self::Io { path, source },
            InputError::NotUtf8(path) => Self::InvalidRecord {
                path,
                message: "file is not UTF-8".to_string(),
            },
            InputError::Json { path, source } => Self::InvalidRecord {
                path,
                message: source.to_string(),
            },
            InputError::Object {
                path,
                source: ObjectError::UnsupportedVersion(version),
            } => Self::UnsupportedObjectVersion { path, version },
            InputError::Object { path, source } => Self::MalformedObject {
                path: Some(path),
                source,
            },
        }
    }
}

impl From<LayoutError> for CompileError {
    fn from(e: LayoutError) -> Self {
        match e {
            LayoutError::PageSizeTooSmall {
                page_size,
                required,
            } => Self::PageSizeTooSmall {
                page_size,
                required,
            },
            LayoutError::PageIndexOverflow { pages } => Self::TableTooLarge(format!(
                "{pages} pages exceed what a 16-bit page index can address"
            )),
            LayoutError::PayloadSizeMismatch {
                path,
                expected,
                actual,
            } => Self::PayloadSizeMismatch(vec![PayloadSizes {
                path,
                sizes: BTreeSet::from([expected, actual]),
            }]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_report_lists_every_path() {
        let error = CompileError::DuplicateKey(BTreeSet::from([vec![1, 0], vec![2, 0x0A]]));
        assert_eq!(
            error.to_string(),
            "2 duplicate key path(s):\n  [ 01h 00h ]\n  [ 02h 0ah ]"
        );
    }

    #[test]
    fn test_shape_report_names_input_files() {
        let mismatch = KeyWidthMismatch {
            expected: vec![4, 4],
            actual: vec![4, 2],
        };
        let error = CompileError::KeyWidthMismatch(vec![
            ShapeMismatch {
                index: 0,
                path: Some(PathBuf::from("in/a.lo")),
                mismatch: mismatch.clone(),
            },
            ShapeMismatch {
                index: 3,
                path: None,
                mismatch,
            },
        ]);
        assert_eq!(
            error.to_string(),
            "2 record(s) do not match the key widths:\n  \
             in/a.lo: record has key widths [4, 2], table expects [4, 4]\n  \
             record 3: record has key widths [4, 2], table expects [4, 4]"
        );
    }

    #[test]
    fn test_input_failures_are_all_listed() {
        let error = CompileError::Inputs(vec![
            CompileError::UnsupportedObjectVersion {
                path: PathBuf::from("a.lo"),
                version: 9,
            },
            CompileError::UnsupportedObjectVersion {
                path: PathBuf::from("b.lo"),
                version: 7,
            },
        ]);
        assert_eq!(
            error.to_string(),
            "2 input(s) could not be loaded:\n  \
             a.lo has unsupported object version 9\n  \
             b.lo has unsupported object version 7"
        );
    }

    #[test]
    fn test_input_errors_map_to_taxonomy() {
        let error = CompileError::from(InputError::Object {
            path: PathBuf::from("a.lo"),
            source: ObjectError::UnsupportedVersion(7),
        });
        assert!(matches!(
            error,
            CompileError::UnsupportedObjectVersion { version: 7, .. }
        ));

        let error = CompileError::from(InputError::Object {
            path: PathBuf::from("a.lo"),
            source: ObjectError::TrailingBytes(2),
        });
        assert!(matches!(error, CompileError::MalformedObject { .. }));

        let error = CompileError::from(InputError::NotUtf8(PathBuf::from("a.json")));
        assert!(matches!(error, CompileError::InvalidRecord { .. }));
    }

    #[test]
    fn test_layout_overflow_is_table_too_large() {
        let error = CompileError::from(LayoutError::PageIndexOverflow { pages: 70_000 });
        assert!(matches!(error, CompileError::TableTooLarge(_)));
    }
}
