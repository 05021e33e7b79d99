//! Segment descriptors handed from the planners to the emitter

use std::path::{Path, PathBuf};

use crate::header::EraseMode;

/// One part of the image: a file and where the flasher should place it.
///
/// The payload size is not stored here; it is read from the file when the
/// segment is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub source: PathBuf,
    pub erase_mode: EraseMode,
    pub offset: u32,
    pub part_size: u32,
}

impl Segment {
    pub fn new(source: impl Into<PathBuf>, erase_mode: EraseMode, offset: u32) -> Self {
        Self {
            source: source.into(),
            erase_mode,
            offset,
            part_size: 0,
        }
    }

    pub fn with_part_size(mut self, part_size: u32) -> Self {
        self.part_size = part_size;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// End of the declared partition, if the segment declares one.
    pub fn part_end(&self) -> Option<u64> {
        (self.part_size != 0).then(|| self.offset as u64 + self.part_size as u64)
    }
}
