//! Compiler configuration.
//!
//! Configuration comes from command-line flags with environment fallbacks.
//!
//! # Environment Variables
//!
//! - `LUTC_WIDTH`: comma-separated key widths, one per level (default: `4,4`)
//! - `LUTC_SIZE`: page size in bytes, or `auto` (default: `auto`)
//!
//! # Invariants
//!
//! - A `LutConfig` always holds a valid key shape (2..=255 levels, widths 1..=255).
//! - A fixed page size is never zero.
//! - A `RunConfig` has at least one input, and in object mode no two inputs
//!   share an output path.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::record::{KeyShape, OBJECT_EXTENSION};

/// Environment variable holding the default key widths.
pub const WIDTH_ENV: &str = "LUTC_WIDTH";
/// Environment variable holding the default page size.
pub const SIZE_ENV: &str = "LUTC_SIZE";

/// How the page size is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSizeMode {
    /// Search for the size giving the fewest pages.
    #[default]
    Auto,
    /// Use exactly this size.
    Fixed(u16),
}

impl FromStr for PageSizeMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        match value.parse::<u16>() {
            Ok(0) => Err(ConfigError::InvalidValue {
                name: "size".to_string(),
                message: "page size must be at least 1".to_string(),
            }),
            Ok(size) => Ok(Self::Fixed(size)),
            Err(_) => Err(ConfigError::InvalidValue {
                name: "size".to_string(),
                message: format!("'{value}' is neither 'auto' nor a page size in 1-65535"),
            }),
        }
    }
}

impl fmt::Display for PageSizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(size) => write!(f, "{size}"),
        }
    }
}

/// Settings that determine the bytes of a compiled table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutConfig {
    pub shape: KeyShape,
    pub page_size: PageSizeMode,
}

impl LutConfig {
    /// Default key widths: one 4-byte structure key and a 4-byte discriminator.
    pub const DEFAULT_WIDTHS: &'static str = "4,4";

    #[must_use]
    pub const fn new(shape: KeyShape, page_size: PageSizeMode) -> Self {
        Self { shape, page_size }
    }

    /// Build a configuration from the textual width list and page size.
    ///
    /// # Errors
    ///
    /// Returns an error if either value does not parse or the widths do not
    /// form a valid key shape.
    pub fn parse(widths: &str, page_size: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            shape: parse_widths(widths)?,
            page_size: page_size.parse()?,
        })
    }
}

/// Parse a comma-separated list of key widths.
///
/// # Errors
///
/// Returns an error if an entry is not an integer or the list does not form
/// a valid key shape.
pub fn parse_widths(text: &str) -> Result<KeyShape, ConfigError> {
    let widths = text
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                name: "width".to_string(),
                message: format!("'{part}' is not a key width"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    KeyShape::new(widths).map_err(|e| ConfigError::InvalidValue {
        name: "width".to_string(),
        message: e.to_string(),
    })
}

/// An input and the object file it compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// What a run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPlan {
    /// One table linked from every input.
    Table(PathBuf),
    /// One object per input.
    Objects(Vec<Target>),
}

/// A fully resolved invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub lut: LutConfig,
    pub inputs: Vec<PathBuf>,
    pub plan: OutputPlan,
}

impl RunConfig {
    /// Default table output, relative to the working directory.
    pub const DEFAULT_OUTPUT: &'static str = "lut.bin";

    /// Resolve inputs and the output option into a run.
    ///
    /// In object mode each input compiles to its own path with the extension
    /// replaced by `.lo`, unless a single input is given together with
    /// `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no inputs, if `output` is given in
    /// object mode with several inputs, or if two inputs would compile to
    /// the same object.
    pub fn new(
        lut: LutConfig,
        inputs: Vec<PathBuf>,
        output: Option<PathBuf>,
        compile_only: bool,
    ) -> Result<Self, ConfigError> {
        if inputs.is_empty() {
            return Err(ConfigError::MissingInputs);
        }

        let plan = if compile_only {
            OutputPlan::Objects(object_targets(&inputs, output)?)
        } else {
            OutputPlan::Table(output.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_OUTPUT)))
        };

        Ok(Self { lut, inputs, plan })
    }
}

fn object_targets(inputs: &[PathBuf], output: Option<PathBuf>) -> Result<Vec<Target>, ConfigError> {
    if let Some(output) = output {
        if inputs.len() > 1 {
            return Err(ConfigError::AmbiguousOutput {
                inputs: inputs.len(),
            });
        }
        return Ok(inputs
            .iter()
            .map(|input| Target {
                input: input.clone(),
                output: output.clone(),
            })
            .collect());
    }

    let mut seen = BTreeSet::new();
    let mut targets = Vec::with_capacity(inputs.len());
    for input in inputs {
        let output = object_path(input);
        if !seen.insert(output.clone()) {
            return Err(ConfigError::DuplicateOutput(output));
        }
        targets.push(Target {
            input: input.clone(),
            output,
        });
    }
    Ok(targets)
}

/// The object file an input compiles to by default.
#[must_use]
pub fn object_path(input: &Path) -> PathBuf {
    input.with_extension(OBJECT_EXTENSION)
}

/// Error returned when the configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An option has an invalid value.
    InvalidValue { name: String, message: String },
    /// No input files were given.
    MissingInputs,
    /// An explicit output was given for several objects.
    AmbiguousOutput { inputs: usize },
    /// Two inputs would compile to the same object file.
    DuplicateOutput(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
            Self::MissingInputs => write!(f, "at least one input file is required"),
            Self::AmbiguousOutput { inputs } => write!(
                f,
                "--output cannot be used with -c and {inputs} inputs; each input gets its own object"
            ),
            Self::DuplicateOutput(path) => {
                write!(f, "two inputs would both compile to {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
