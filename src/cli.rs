//! Command-line interface parsing and input discovery.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use crate::error::TranslateError;
use crate::translator::{Options, DEFAULT_ENTRY};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extension of VM compilation units.
pub const VM_EXTENSION: &str = "vm";
pub const ASM_EXTENSION: &str = "asm";

const LONG_ABOUT: &str = "Translates stack VM code into Hack assembly.

Each PATH is either a .vm file or a directory; a directory contributes every
.vm file directly inside it, in name order. All units are written to one .asm
file. With a single input the output is named after it (Prog.vm -> Prog.asm,
Dir/ -> Dir/Dir.asm); with several inputs -o is required.";

#[derive(Parser, Debug)]
#[command(
    name = "vm-translator",
    version = VERSION,
    about = "Translates stack VM code into Hack assembly",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(value_name = "PATH", required = true)]
    pub inputs: Vec<PathBuf>,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        long_help = "Write the assembly to FILE instead of the name derived from the input."
    )]
    pub output: Option<PathBuf>,
    #[arg(
        long = "no-bootstrap",
        action = ArgAction::SetTrue,
        long_help = "Do not emit the stack setup and entry call; end the program with a halt loop instead."
    )]
    pub no_bootstrap: bool,
    #[arg(
        long = "no-comments",
        action = ArgAction::SetTrue,
        long_help = "Do not echo VM instructions as comments in the output."
    )]
    pub no_comments: bool,
    #[arg(
        long = "entry",
        value_name = "NAME",
        default_value = DEFAULT_ENTRY,
        long_help = "Procedure called by the bootstrap."
    )]
    pub entry: String,
    #[arg(
        short = 'q',
        long = "quiet",
        action = ArgAction::SetTrue,
        long_help = "Only report errors."
    )]
    pub quiet: bool,
}

fn has_vm_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(VM_EXTENSION)
}

fn discover_dir(dir: &Path) -> Result<Vec<PathBuf>, TranslateError> {
    let entries = fs::read_dir(dir).map_err(|source| TranslateError::io(dir.display(), source))?;
    let mut files = vec![];
    for entry in entries {
        let path = entry
            .map_err(|source| TranslateError::io(dir.display(), source))?
            .path();
        if path.is_file() && has_vm_extension(&path) {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(TranslateError::Usage(format!(
            "{} contains no .{} files",
            dir.display(),
            VM_EXTENSION
        )));
    }
    files.sort();
    Ok(files)
}

impl Cli {
    pub fn options(&self) -> Options {
        Options {
            bootstrap: !self.no_bootstrap,
            annotate: !self.no_comments,
            entry: self.entry.clone(),
        }
    }

    /// Expand the given paths into the ordered list of units to translate.
    pub fn input_files(&self) -> Result<Vec<PathBuf>, TranslateError> {
        let mut files = vec![];
        for input in &self.inputs {
            if input.is_dir() {
                files.extend(discover_dir(input)?);
            } else if has_vm_extension(input) {
                files.push(input.clone());
            } else {
                return Err(TranslateError::Usage(format!(
                    "{} is not a .{} file",
                    input.display(),
                    VM_EXTENSION
                )));
            }
        }
        Ok(files)
    }

    pub fn output_path(&self) -> Result<PathBuf, TranslateError> {
        if let Some(output) = &self.output {
            return Ok(output.clone());
        }
        match self.inputs.as_slice() {
            [single] if single.is_dir() => {
                let name = single
                    .canonicalize()
                    .ok()
                    .and_then(|path| path.file_name().map(|name| name.to_os_string()))
                    .ok_or_else(|| {
                        TranslateError::Usage(format!("cannot name output for {}", single.display()))
                    })?;
                Ok(single.join(name).with_extension(ASM_EXTENSION))
            }
            [single] => Ok(single.with_extension(ASM_EXTENSION)),
            _ => Err(TranslateError::Usage(
                "several inputs need an explicit -o/--output".to_string(),
            )),
        }
    }
}
