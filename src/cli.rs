use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::warn;

use crate::conversion::{ConversionOptions, Handedness, UpAxis};

/// A parsed command line.
#[derive(Debug, PartialEq)]
pub enum Command {
    Convert(Cli),
    Help,
}

#[derive(Debug, PartialEq)]
pub struct Cli {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: ConversionOptions,
    pub verbose: bool,
}

pub fn usage() -> String {
    format!(
        "\
{name} {version}
Converts skinned and animated 3D scenes between coordinate systems.

USAGE:
    {name} <input> <output> [options]

The model is written to <output>. Every animation is written next to it, to
<output dir>/<input name>/<animation name>.<output extension>.

OPTIONS:
    --up-axis <Y|Z|X>              Up axis of the output [default: Y]
    --coordinate-system <RH|LH>    Handedness of the output [default: RH]
    --scale <float>                Scale applied to positions [default: 1]
    --export-textures              Copy textures next to the output [default]
    --no-export-textures           Keep textures where they are
    --triangulate                  Convert strips and fans into triangles [default]
    --fps <1..120>                 Frame rate of the output [default: 30]
    --resample                     Resample animations at the frame rate
    -v, --verbose                  Show debug output
    -h, --help                     Show this message",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// Returns whether the arguments ask for debug output.
pub fn is_verbose<S: AsRef<str>>(args: &[S]) -> bool {
    args.iter()
        .any(|arg| matches!(arg.as_ref(), "-v" | "--verbose"))
}

/// Parses the arguments that follow the program name.
///
/// Invalid values for the axis, the coordinate system, and the frame rate fall back to
/// their defaults with a warning. A missing value or an invalid scale is an error.
pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Command> {
    let mut options = ConversionOptions::default();
    let mut positional = Vec::new();
    let mut verbose = false;

    let mut args = args.iter().map(|arg| arg.as_ref());
    while let Some(arg) = args.next() {
        match arg {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--verbose" => verbose = true,
            "--export-textures" => options.export_textures = true,
            "--no-export-textures" => options.export_textures = false,
            "--triangulate" => options.triangulate = true,
            "--resample" => options.resample = true,
            "--up-axis" => {
                let value = value_of(arg, args.next())?;
                match value.parse::<UpAxis>() {
                    Ok(up_axis) => options.up_axis = up_axis,
                    Err(_) => warn!(
                        "Invalid up axis \"{}\", using {}",
                        value, options.up_axis
                    ),
                }
            }
            "--coordinate-system" => {
                let value = value_of(arg, args.next())?;
                match value.parse::<Handedness>() {
                    Ok(handedness) => options.handedness = handedness,
                    Err(_) => warn!(
                        "Invalid coordinate system \"{}\", using {}",
                        value, options.handedness
                    ),
                }
            }
            "--scale" => {
                let value = value_of(arg, args.next())?;
                options.scale = value
                    .parse::<f32>()
                    .ok()
                    .filter(|scale| scale.is_finite())
                    .with_context(|| format!("Invalid scale \"{}\"", value))?;
            }
            "--fps" => {
                let value = value_of(arg, args.next())?;
                options.fps = match value.parse::<f64>() {
                    Ok(fps)
                        if (ConversionOptions::MIN_FPS..=ConversionOptions::MAX_FPS)
                            .contains(&fps) =>
                    {
                        fps
                    }
                    _ => {
                        warn!(
                            "Invalid frame rate \"{}\", using {}",
                            value,
                            ConversionOptions::DEFAULT_FPS
                        );
                        ConversionOptions::DEFAULT_FPS
                    }
                };
            }
            _ if arg.starts_with('-') && arg.len() > 1 => warn!("Ignoring unknown option \"{}\"", arg),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    if positional.len() > 2 {
        warn!("Ignoring {} extra arguments", positional.len() - 2);
    }
    let mut positional = positional.into_iter();
    match (positional.next(), positional.next()) {
        (Some(input), Some(output)) => Ok(Command::Convert(Cli {
            input,
            output,
            options,
            verbose,
        })),
        _ => bail!("Expected an input and an output path\n\n{}", usage()),
    }
}

fn value_of<'a>(flag: &str, value: Option<&'a str>) -> Result<&'a str> {
    value.with_context(|| format!("Missing value for \"{}\"", flag))
}
