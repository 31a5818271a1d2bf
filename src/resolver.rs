//! Turn raw invocation intent into a validated [`ConversionRequest`].

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::Result;
use crate::kind::PointerWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Export,
    Import,
}

/// One conversion, fixed for the lifetime of the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub mode:          Mode,
    pub input:         PathBuf,
    pub output:        PathBuf,
    pub pointer_width: PointerWidth,
}

/// Flags and positionals as the user typed them, before validation.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub export:  bool,
    pub import:  bool,
    pub long:    bool,
    pub tagged:  bool,
    pub verbose: u8,
    pub paths:   Vec<PathBuf>,
}

impl Invocation {
    /// True only when nothing at all was passed.  Any flag, even one that
    /// does not pick a mode, moves the invocation on to the mode check.
    pub fn is_empty(&self) -> bool {
        !self.export
            && !self.import
            && !self.long
            && !self.tagged
            && self.verbose == 0
            && self.paths.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("No arguments given.")]
    NoArguments,
    #[error("No mode detected.")]
    NoMode,
    #[error("Both export and import were requested; pick one mode.")]
    AmbiguousMode,
    #[error("Wrong number of arguments: expected an input and an output path, got {0} path(s).\n\
             You may be missing one or both of the paths, or have supplied extraneous arguments.")]
    WrongArgumentCount(usize),
    #[error("The input file does not exist: {}", .0.display())]
    InputMissing(PathBuf),
    #[error("{0}")]
    Unrecognized(String),
}

impl UsageError {
    /// Whether the short usage text should follow the message.
    pub fn shows_usage(&self) -> bool {
        !matches!(self, UsageError::NoArguments | UsageError::InputMissing(_))
    }
}

/// A validated request, plus the directory created for its output (if any).
#[derive(Debug, Clone)]
pub struct Resolution {
    pub request:     ConversionRequest,
    pub created_dir: Option<PathBuf>,
}

/// Validate `invocation` and prepare the output directory.
///
/// Checks run in a fixed order: empty invocation, missing mode, both modes,
/// path count, input existence.  The output directory is only created once
/// every check has passed, and is left in place if the conversion later fails.
pub fn resolve(invocation: &Invocation) -> Result<Resolution> {
    let request     = validate(invocation)?;
    let created_dir = prepare_output_dir(&request.output)?;
    Ok(Resolution { request, created_dir })
}

pub fn validate(invocation: &Invocation) -> std::result::Result<ConversionRequest, UsageError> {
    if invocation.is_empty() {
        return Err(UsageError::NoArguments);
    }
    let mode = match (invocation.export, invocation.import) {
        (false, false) => return Err(UsageError::NoMode),
        (true, true)   => return Err(UsageError::AmbiguousMode),
        (true, false)  => Mode::Export,
        (false, true)  => Mode::Import,
    };
    let [input, output] = invocation.paths.as_slice() else {
        return Err(UsageError::WrongArgumentCount(invocation.paths.len()));
    };
    if !input.is_file() {
        return Err(UsageError::InputMissing(input.clone()));
    }
    Ok(ConversionRequest {
        mode,
        input:         input.clone(),
        output:        output.clone(),
        pointer_width: PointerWidth::from_long_flag(invocation.long),
    })
}

/// Create the parent directory of `output` when it does not exist yet.
/// Returns the directory if it was created.
pub fn prepare_output_dir(output: &Path) -> std::io::Result<Option<PathBuf>> {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            fs::create_dir_all(dir)?;
            tracing::info!("created output directory {}", dir.display());
            Ok(Some(dir.to_owned()))
        }
        _ => Ok(None),
    }
}

/// Usage text.  `banner` adds the tool description in front.
pub fn usage(banner: bool) -> String {
    let mut text = String::new();
    if banner {
        text.push_str("ExIm for Etrian Odyssey, by Rea\n");
        text.push_str("For exporting text table/MBM files to JSON, and importing JSON back into those formats.\n\n");
    }
    text.push_str(concat!(
        "Usage: exim [mode] [input] [output] <-l / --long> <--tagged>\n",
        "\n",
        "[mode] can be:\n",
        "    -e, --export: Export text from a tbl/mbm file to JSON.\n",
        "    -i, --import: Import text from a JSON file to tbl/mbm.\n",
        "[input] is the path to the file you wish to import from.\n",
        "[output] is the path to the file you wish to export to.\n",
        "<-l / --long> indicates that the tbl uses long pointers. Ignored for mbm files.\n",
        "<--tagged> exports the two-line tagged layout instead of a single JSON document.\n",
        "<-v> raises log verbosity; repeat for more.\n",
        "\n",
        "Note: if [output]'s directory does not exist, it will be created.\n",
    ));
    text
}
