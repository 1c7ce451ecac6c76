use std::process::ExitCode;

use anyhow::{bail, Result};
use log::{error, info, LevelFilter};

use rigconv::{
    cli::{self, Cli, Command},
    conversion::Converter,
};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let level = if cli::is_verbose(&args) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let Cli {
        input,
        output,
        options,
        ..
    } = match cli::parse(args)? {
        Command::Convert(cli) => cli,
        Command::Help => {
            println!("{}", cli::usage());
            return Ok(());
        }
    };

    if !input.is_file() {
        bail!("Input file \"{}\" does not exist", input.display());
    }

    info!(
        "Converting to {} {}-up, scale {}, {} fps",
        options.handedness, options.up_axis, options.scale, options.fps
    );
    let converter = Converter::new(&input, &output, options)?;
    let report = converter.convert(&input, &output)?;

    info!(
        "Done: model \"{}\", {} animations, {} textures",
        report.model.display(),
        report.animations.len(),
        report.textures
    );
    if report.failures > 0 {
        bail!("{} animations failed to export", report.failures);
    }

    Ok(())
}
