//! Command-line front end.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::compiler::{compile, compile_objects};
use crate::config::{ConfigError, LutConfig, OutputPlan, RunConfig, SIZE_ENV, WIDTH_ENV};
use crate::error::{CompileError, ShapeMismatch};
use crate::output;
use crate::record::{KeyShape, Record, load_record};

#[derive(Debug, Parser)]
#[command(name = "lutc")]
#[command(bin_name = "lutc")]
#[command(version)]
#[command(about = "Compile configuration records into a paged lookup table", long_about = None)]
#[command(disable_help_flag = true)]
pub struct LutcCli {
    /// Input records: `.lo` objects or normalized JSON records
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Comma-separated key width of each level, outermost first
    #[arg(short = 'w', long = "width", env = WIDTH_ENV, default_value = LutConfig::DEFAULT_WIDTHS)]
    pub width: String,

    /// Page size in bytes, or `auto` to pick the size giving the fewest pages
    #[arg(short = 's', long = "size", env = SIZE_ENV, default_value = "auto")]
    pub size: String,

    /// Output path (default: `lut.bin`, or `<input>.lo` with -c)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Compile each input to a `.lo` object instead of linking a table
    #[arg(short = 'c')]
    pub compile_only: bool,

    /// More log output (-vv for trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Print help
    #[arg(short = '?', long = "help", action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl LutcCli {
    /// Resolve the parsed arguments into a run.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let lut = LutConfig::parse(&self.width, &self.size)?;
        RunConfig::new(
            lut,
            self.inputs.clone(),
            self.output.clone(),
            self.compile_only,
        )
    }

    /// Log filter used when `RUST_LOG` is not set.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "lutc=error";
        }
        match self.verbose {
            0 => "lutc=info",
            1 => "lutc=debug",
            _ => "lutc=trace",
        }
    }
}

/// Execute a run, returning the paths written.
///
/// Inputs are all loaded and every check passes before the first output is
/// staged.
pub fn run(config: &RunConfig) -> Result<Vec<PathBuf>, CompileError> {
    let records = load_inputs(&config.inputs, &config.lut.shape)?;

    match &config.plan {
        OutputPlan::Table(path) => {
            let lut = compile(records, &config.lut)?;
            let written = output::write_atomic(path, &lut.bytes)?;
            tracing::info!(path = %written.display(), "table written");
            Ok(vec![written])
        }
        OutputPlan::Objects(targets) => {
            let objects = compile_objects(&records, &config.lut.shape)?;
            let staged = targets
                .iter()
                .zip(&objects)
                .map(|(target, bytes)| output::stage(&target.output, bytes))
                .collect::<Result<Vec<_>, _>>()?;
            let written = output::commit(staged)?;
            tracing::info!(objects = written.len(), "objects written");
            Ok(written)
        }
    }
}

/// Load every input, then report all that failed to load or do not match
/// `shape`.
fn load_inputs(inputs: &[PathBuf], shape: &KeyShape) -> Result<Vec<Record>, CompileError> {
    let mut records = Vec::with_capacity(inputs.len());
    let mut failures = Vec::new();
    let mut mismatches = Vec::new();

    for (index, path) in inputs.iter().enumerate() {
        match load_record(path) {
            Ok(record) => {
                tracing::debug!(index, path = %path.display(), keys = record.height(), "record loaded");
                if let Err(mismatch) = shape.validate(&record) {
                    mismatches.push(ShapeMismatch {
                        index,
                        path: Some(path.clone()),
                        mismatch,
                    });
                }
                records.push(record);
            }
            Err(e) => failures.push(CompileError::from(e)),
        }
    }

    if failures.len() > 1 {
        return Err(CompileError::Inputs(failures));
    }
    if let Some(failure) = failures.pop() {
        return Err(failure);
    }
    if !mismatches.is_empty() {
        return Err(CompileError::KeyWidthMismatch(mismatches));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSizeMode;

    fn parse(args: &[&str]) -> Result<LutcCli, clap::Error> {
        LutcCli::try_parse_from(std::iter::once("lutc").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags() {
        let cli = parse(&["-w", "1,2,4", "-s", "64", "-o", "out.bin", "a.json", "b.lo"])
            .expect("parses");
        assert_eq!(cli.inputs, vec![PathBuf::from("a.json"), PathBuf::from("b.lo")]);
        let run = cli.run_config().expect("valid");
        assert_eq!(run.lut.shape.widths(), &[1, 2, 4]);
        assert_eq!(run.lut.page_size, PageSizeMode::Fixed(64));
        assert_eq!(run.plan, OutputPlan::Table(PathBuf::from("out.bin")));
    }

    #[test]
    fn test_question_mark_shows_help() {
        let err = parse(&["-?"]).expect_err("help exits early");
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_inputs_required() {
        let err = parse(&["-c"]).expect_err("no inputs");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_output_with_several_objects_rejected() {
        let cli = parse(&["-c", "-o", "x.lo", "a.json", "b.json"]).expect("parses");
        assert_eq!(
            cli.run_config(),
            Err(ConfigError::AmbiguousOutput { inputs: 2 })
        );
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(parse(&["a"]).expect("parses").log_filter(), "lutc=info");
        assert_eq!(parse(&["-q", "a"]).expect("parses").log_filter(), "lutc=error");
        assert_eq!(parse(&["-vv", "a"]).expect("parses").log_filter(), "lutc=trace");
        assert!(parse(&["-v", "-q", "a"]).is_err());
    }
}
