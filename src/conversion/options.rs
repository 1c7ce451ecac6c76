use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};

/// The handedness of a coordinate system. Both conventions use X-right and Y-up; the
/// left-handed one points Z forward and the right-handed one points Z backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl FromStr for Handedness {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LH" => Ok(Handedness::Left),
            "RH" => Ok(Handedness::Right),
            _ => Err(anyhow!("Unknown coordinate system \"{}\" (expected RH or LH)", s)),
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Left => write!(f, "Left-Handed"),
            Handedness::Right => write!(f, "Right-Handed"),
        }
    }
}

/// The axis that points up in the target scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpAxis {
    X,
    Y,
    Z,
}

impl FromStr for UpAxis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "X" => Ok(UpAxis::X),
            "Y" => Ok(UpAxis::Y),
            "Z" => Ok(UpAxis::Z),
            _ => Err(anyhow!("Unknown up axis \"{}\" (expected X, Y or Z)", s)),
        }
    }
}

impl fmt::Display for UpAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpAxis::X => write!(f, "X"),
            UpAxis::Y => write!(f, "Y"),
            UpAxis::Z => write!(f, "Z"),
        }
    }
}

/// The corner of a texture where an output format places the UV origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvOrigin {
    TopLeft,
    BottomLeft,
}

/// Options that drive a conversion.
///
/// Imported scenes always use the left-handed Y-up convention with the UV origin at the
/// top-left corner. These options describe the convention of the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionOptions {
    /// The handedness of the output.
    pub handedness: Handedness,
    /// The up axis of the output.
    pub up_axis: UpAxis,
    /// Global scale applied to positions and translations. Scales are never affected.
    pub scale: f32,
    /// Whether textures referenced by materials are copied next to the output.
    pub export_textures: bool,
    /// Whether triangle strips and fans are converted into triangle lists on import.
    pub triangulate: bool,
    /// The frame rate of the exported animations.
    pub fps: f64,
    /// Whether merged animation tracks are resampled at `fps`.
    pub resample: bool,
    /// The UV origin expected by the selected exporter.
    pub uv_origin: UvOrigin,
}

impl ConversionOptions {
    pub const DEFAULT_FPS: f64 = 30.;
    pub const MIN_FPS: f64 = 1.;
    pub const MAX_FPS: f64 = 120.;

    /// Returns whether the output handedness differs from the imported one.
    pub fn flips_handedness(&self) -> bool {
        self.handedness == Handedness::Right
    }

    /// Returns whether the V texture coordinate must be inverted for the output.
    pub fn flips_v(&self) -> bool {
        self.uv_origin != UvOrigin::TopLeft
    }

    /// Returns a copy of the options that keeps the Y axis up. Only the root of a
    /// hierarchy is reoriented; its descendants inherit the rotation.
    pub fn without_reorientation(&self) -> Self {
        Self {
            up_axis: UpAxis::Y,
            ..*self
        }
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            handedness: Handedness::Right,
            up_axis: UpAxis::Y,
            scale: 1.,
            export_textures: true,
            triangulate: true,
            fps: Self::DEFAULT_FPS,
            resample: false,
            uv_origin: UvOrigin::TopLeft,
        }
    }
}
