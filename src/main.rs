use std::fs::File;
use std::process;

use clap::Parser;

use vm_translator::cli::Cli;
use vm_translator::{error, info, log, translate_units, TranslateError, Unit};

fn run(cli: &Cli) -> Result<(), TranslateError> {
    let inputs = cli.input_files()?;
    let output = cli.output_path()?;
    let units = inputs
        .iter()
        .map(|path| Unit::read(path))
        .collect::<Result<Vec<_>, _>>()?;

    let file = File::create(&output).map_err(|source| TranslateError::io(output.display(), source))?;
    let summary = translate_units(&units, cli.options(), file)?;
    info!(
        "wrote {} ({} lines from {} instructions in {} units)",
        output.display(),
        summary.lines,
        summary.instructions,
        summary.units
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    log::set_quiet(cli.quiet);

    if let Err(err) = run(&cli) {
        error!("[{}] {}", err.category(), err);
        process::exit(1);
    }
}
