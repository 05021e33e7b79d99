//! Sequential walker over an existing JTAG image

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{JtagImageError, Result};
use crate::header::SegmentHeader;
use crate::HEADER_SIZE;

/// Reads headers one after the other, skipping each payload.
pub struct ImageReader<R: Read> {
    inner: R,
    position: u64,
    done: bool,
}

impl<R: Read> ImageReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            done: false,
        }
    }

    /// Byte offset of the next header in the image
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Next header, or `None` at a clean end of image.
    pub fn next_segment(&mut self) -> Result<Option<SegmentHeader>> {
        let mut buffer = [0u8; HEADER_SIZE];
        let n = read_up_to(&mut self.inner, &mut buffer)?;
        if n == 0 {
            return Ok(None);
        }
        if n < HEADER_SIZE {
            return Err(JtagImageError::invalid_image(format!(
                "truncated header at {:#x}: {n} of {HEADER_SIZE} bytes",
                self.position
            )));
        }

        let header = SegmentHeader::from_bytes(&buffer)?;
        let wanted = header.data_size as u64;
        let skipped = io::copy(&mut (&mut self.inner).take(wanted), &mut io::sink())?;
        if skipped != wanted {
            return Err(JtagImageError::invalid_image(format!(
                "truncated payload at {:#x}: {skipped} of {wanted} bytes",
                self.position + HEADER_SIZE as u64
            )));
        }

        self.position += HEADER_SIZE as u64 + wanted;
        Ok(Some(header))
    }
}

impl<R: Read> Iterator for ImageReader<R> {
    type Item = Result<SegmentHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_segment().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Read every segment header of the image at `path`.
pub fn read_image_headers(path: &Path) -> Result<Vec<SegmentHeader>> {
    let file = File::open(path).map_err(|e| JtagImageError::file_unreadable(path, e))?;
    ImageReader::new(BufReader::new(file)).collect()
}

fn read_up_to<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
