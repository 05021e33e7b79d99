//! Scripted `file@start[-end]` segment descriptors
//!
//! * `file@start-end`: bounded partition, its size is `end - start`
//! * `file@start-`: open ended, always erases to the end of flash
//! * `file@start`: plain write, size comes from the file
//!
//! Addresses accept everything [`crate::size::parse_size`] does (`16M`, `0x1000000`, ...).

use std::path::PathBuf;
use std::str::FromStr;

use log::debug;

use crate::error::{JtagImageError, Result};
use crate::header::EraseMode;
use crate::segment::Segment;
use crate::size::parse_size_u32;

/// How the first segment of a scripted run erases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstErase {
    /// `-e`: wipe the whole device before the first segment
    All,
    /// `-s`: leave the flash alone, only open-ended segments erase
    Keep,
}

/// Where a descriptor sits in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRole {
    First,
    Middle,
}

/// A parsed `file@...` descriptor before its erase mode is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentSpec {
    Bounded { file: PathBuf, start: u32, end: u32 },
    OpenEnded { file: PathBuf, start: u32 },
    Simple { file: PathBuf, start: u32 },
}

impl SegmentSpec {
    pub fn start(&self) -> u32 {
        match self {
            Self::Bounded { start, .. } | Self::OpenEnded { start, .. } | Self::Simple { start, .. } => {
                *start
            }
        }
    }

    /// Declared end of the range, only known for bounded descriptors.
    pub fn end(&self) -> Option<u32> {
        match self {
            Self::Bounded { end, .. } => Some(*end),
            _ => None,
        }
    }

    pub fn erase_mode(&self, role: SegmentRole, first: FirstErase) -> EraseMode {
        match (self, role, first) {
            (Self::OpenEnded { .. }, _, _) => EraseMode::ToEnd,
            (_, SegmentRole::First, FirstErase::All) => EraseMode::All,
            _ => EraseMode::None,
        }
    }

    pub fn into_segment(self, role: SegmentRole, first: FirstErase) -> Segment {
        let erase_mode = self.erase_mode(role, first);
        match self {
            Self::Bounded { file, start, end } => {
                Segment::new(file, erase_mode, start).with_part_size(end - start)
            }
            Self::OpenEnded { file, start } | Self::Simple { file, start } => {
                Segment::new(file, erase_mode, start)
            }
        }
    }
}

impl FromStr for SegmentSpec {
    type Err = JtagImageError;

    fn from_str(token: &str) -> Result<Self> {
        let (file, range) = token.rsplit_once('@').ok_or_else(|| {
            JtagImageError::invalid_parameter(format!("'{token}': expected file@start[-end]"))
        })?;

        if file.is_empty() {
            return Err(JtagImageError::invalid_parameter(format!(
                "'{token}': missing file name"
            )));
        }
        let file = PathBuf::from(file);

        let spec = match range.split_once('-') {
            Some((start, "")) => Self::OpenEnded {
                file,
                start: parse_address(token, start)?,
            },
            Some((start, end)) => {
                let start = parse_address(token, start)?;
                let end = parse_address(token, end)?;
                if end <= start {
                    return Err(JtagImageError::invalid_parameter(format!(
                        "'{token}': end {end:#x} is not above start {start:#x}"
                    )));
                }
                Self::Bounded { file, start, end }
            }
            None => Self::Simple {
                file,
                start: parse_address(token, range)?,
            },
        };

        Ok(spec)
    }
}

fn parse_address(token: &str, value: &str) -> Result<u32> {
    if value.is_empty() {
        return Err(JtagImageError::invalid_parameter(format!(
            "'{token}': missing address"
        )));
    }
    parse_size_u32(value)
}

/// Turn scripted tokens into segments, in declaration order.
///
/// Segments must not move backwards: every start has to be at or above the
/// previous start, and at or above the previous end for bounded ranges.
pub fn parse_script<S: AsRef<str>>(first: FirstErase, tokens: &[S]) -> Result<Vec<Segment>> {
    if tokens.is_empty() {
        return Err(JtagImageError::usage("no file@offset segments given"));
    }

    let mut segments = Vec::with_capacity(tokens.len());
    let mut floor = 0u32;

    for (i, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        let spec: SegmentSpec = token.parse()?;

        if spec.start() < floor {
            return Err(JtagImageError::invalid_parameter(format!(
                "'{token}' starts at {:#x}, below the previous segment ({floor:#x})",
                spec.start()
            )));
        }
        floor = spec.end().unwrap_or(spec.start());

        let role = if i == 0 {
            SegmentRole::First
        } else {
            SegmentRole::Middle
        };
        debug!("{token}: {spec:?} as {role:?}");
        segments.push(spec.into_segment(role, first));
    }

    Ok(segments)
}
