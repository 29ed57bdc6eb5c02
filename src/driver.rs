//! Runs a set of compilation units through the reader and the translator
//! and streams the resulting assembly to one writer.

use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::ast::Instruction;
use crate::error::TranslateError;
use crate::parser;
use crate::translator::{Options, Translator};
use crate::{info, warn};

/// Source text of one `.vm` file and the base name that scopes its statics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub source: String,
}

impl Unit {
    pub fn new(name: &str, source: &str) -> Self {
        Unit {
            name: name.to_string(),
            source: source.to_string(),
        }
    }

    pub fn read(path: &Path) -> Result<Unit, TranslateError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| TranslateError::Usage(format!("{} has no usable file name", path.display())))?;
        let source =
            fs::read_to_string(path).map_err(|source| TranslateError::io(path.display(), source))?;
        Ok(Unit::new(name, &source))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub units: usize,
    pub instructions: usize,
    /// Assembly lines written, comments included.
    pub lines: usize,
}

struct AsmWriter<W: Write> {
    out: BufWriter<W>,
    lines: usize,
}

impl<W: Write> AsmWriter<W> {
    fn new(out: W) -> Self {
        AsmWriter {
            out: BufWriter::new(out),
            lines: 0,
        }
    }

    fn write(&mut self, code: &[String]) -> Result<(), TranslateError> {
        for line in code {
            writeln!(self.out, "{}", line).map_err(|source| TranslateError::io("output", source))?;
        }
        self.lines += code.len();
        Ok(())
    }

    fn finish(mut self) -> Result<usize, TranslateError> {
        self.out
            .flush()
            .map_err(|source| TranslateError::io("output", source))?;
        Ok(self.lines)
    }
}

/// Statics are scoped by unit name, so two units with one name would
/// silently share them.
fn check_unit_names(units: &[Unit]) -> Result<(), TranslateError> {
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert(unit.name.as_str()) {
            return Err(TranslateError::Usage(format!(
                "more than one unit is named `{}`",
                unit.name
            )));
        }
    }
    Ok(())
}

/// Translate `units` in order into a single assembly stream. The first
/// failing unit aborts the run; whatever was written before it stays written.
pub fn translate_units<W: Write>(
    units: &[Unit],
    options: Options,
    out: W,
) -> Result<Summary, TranslateError> {
    check_unit_names(units)?;
    let mut translator = Translator::new(options);
    let mut writer = AsmWriter::new(out);
    let mut summary = Summary::default();
    let mut entry_defined = false;

    if translator.options().bootstrap {
        writer.write(&translator.bootstrap()?)?;
    }

    for unit in units {
        let lines = parser::parse(&unit.name, &unit.source)?;
        translator.set_unit(&unit.name);
        for line in &lines {
            if let Instruction::Function(name, _) = &line.instruction {
                entry_defined |= *name == translator.options().entry;
            }
            writer.write(&translator.translate_line(line)?)?;
        }
        info!("translated {} ({} instructions)", unit.name, lines.len());
        summary.units += 1;
        summary.instructions += lines.len();
    }

    if translator.options().bootstrap && !entry_defined {
        warn!(
            "entry procedure {} is never defined; the bootstrap call has no target",
            translator.options().entry
        );
    }

    writer.write(&translator.finish())?;
    summary.lines = writer.finish()?;
    Ok(summary)
}

/// Translate into an in-memory string.
pub fn translate_to_string(units: &[Unit], options: Options) -> Result<String, TranslateError> {
    let mut buffer = vec![];
    translate_units(units, options, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| TranslateError::Usage(err.to_string()))
}
