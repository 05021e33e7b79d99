//! Streams segments into the output image

use std::fs::File;
use std::io::{self, Read, Write};

use log::{debug, info, warn};

use crate::error::{JtagImageError, Result};
use crate::header::SegmentHeader;
use crate::segment::Segment;
use crate::size::format_size;
use crate::HEADER_SIZE;

/// Writes `(header, payload)` records to a sink, one segment at a time.
///
/// Nothing is buffered across segments: a failure part way through leaves
/// whatever was already written in the sink.
pub struct SegmentEmitter<W: Write> {
    sink: W,
    segments: usize,
    bytes_written: u64,
}

impl<W: Write> SegmentEmitter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            segments: 0,
            bytes_written: 0,
        }
    }

    /// Emit one segment and return the header that was written for it.
    pub fn emit(&mut self, segment: &Segment) -> Result<SegmentHeader> {
        let path = segment.source();
        let mut file =
            File::open(path).map_err(|e| JtagImageError::file_unreadable(path, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| JtagImageError::file_unreadable(path, e))?;
        if !metadata.is_file() {
            return Err(JtagImageError::file_unreadable(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        let len = metadata.len();
        let data_size = u32::try_from(len).map_err(|_| JtagImageError::FileTooLarge {
            path: path.to_path_buf(),
            size: len,
        })?;

        if data_size == 0 && segment.part_size == 0 {
            warn!(
                "{} is empty and declares no partition size",
                path.display()
            );
        } else if segment.part_size != 0 && len > segment.part_size as u64 {
            warn!(
                "{} ({len} bytes) does not fit its {:#x} byte partition",
                path.display(),
                segment.part_size
            );
        }

        let header = SegmentHeader::new(
            segment.erase_mode,
            segment.offset,
            data_size,
            segment.part_size,
        );

        let end = segment.offset as u64 + len.max(segment.part_size as u64);
        info!(
            "{}: {:#010x}-{:#010x} erase={} ({})",
            path.display(),
            segment.offset,
            end,
            segment.erase_mode,
            format_size(len)
        );

        header.write_to(&mut self.sink)?;
        let copied = self.copy_payload(&mut file, segment)?;
        if copied != len {
            return Err(JtagImageError::file_unreadable(
                path,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file changed while reading: expected {len} bytes, got {copied}"),
                ),
            ));
        }

        self.segments += 1;
        self.bytes_written += HEADER_SIZE as u64 + len;
        debug!("segment {} done, {} bytes so far", self.segments, self.bytes_written);

        Ok(header)
    }

    /// Emit segments in order, stopping at the first failure.
    pub fn emit_all(&mut self, segments: &[Segment]) -> Result<Vec<SegmentHeader>> {
        segments.iter().map(|segment| self.emit(segment)).collect()
    }

    pub fn segments_written(&self) -> usize {
        self.segments
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn copy_payload(&mut self, file: &mut File, segment: &Segment) -> Result<u64> {
        let mut source = SourceReader { file, failed: false };
        io::copy(&mut source, &mut self.sink).map_err(|e| {
            if source.failed {
                JtagImageError::file_unreadable(segment.source(), e)
            } else {
                JtagImageError::Io(e)
            }
        })
    }
}

/// Tells read failures on the payload apart from write failures on the sink.
struct SourceReader<'a> {
    file: &'a mut File,
    failed: bool,
}

impl Read for SourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf).inspect_err(|e| {
            if e.kind() != io::ErrorKind::Interrupted {
                self.failed = true;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::EraseMode;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_emit_writes_header_then_payload() {
        let file = temp_file(b"hello");
        let segment = Segment::new(file.path(), EraseMode::Partition, 0x00E0_0000)
            .with_part_size(0x0020_0000);

        let mut emitter = SegmentEmitter::new(Vec::new());
        let header = emitter.emit(&segment).unwrap();
        assert_eq!(header.data_size, 5);
        assert_eq!(header.part_size, 0x0020_0000);
        assert_eq!(emitter.segments_written(), 1);
        assert_eq!(emitter.bytes_written(), HEADER_SIZE as u64 + 5);

        let out = emitter.finish().unwrap();
        assert_eq!(out.len(), HEADER_SIZE + 5);
        assert_eq!(&out[..HEADER_SIZE], &header.encode());
        assert_eq!(&out[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn test_empty_payload_keeps_part_size() {
        let file = temp_file(b"");
        let segment =
            Segment::new(file.path(), EraseMode::Partition, 0).with_part_size(0x00E0_0000);

        let mut emitter = SegmentEmitter::new(Vec::new());
        let header = emitter.emit(&segment).unwrap();
        assert_eq!(header.data_size, 0);
        assert_eq!(header.part_size, 0x00E0_0000);
        assert_eq!(emitter.finish().unwrap().len(), HEADER_SIZE);
    }

    #[test]
    fn test_missing_file_writes_nothing() {
        let segment = Segment::new("/nonexistent/spl.bin", EraseMode::All, 0);
        let mut emitter = SegmentEmitter::new(Vec::new());

        let err = emitter.emit(&segment).unwrap_err();
        assert!(matches!(err, JtagImageError::FileUnreadable { .. }));
        assert!(emitter.finish().unwrap().is_empty());
    }

    #[test]
    fn test_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let segment = Segment::new(dir.path(), EraseMode::None, 0);
        let mut emitter = SegmentEmitter::new(Vec::new());

        assert!(matches!(
            emitter.emit(&segment),
            Err(JtagImageError::FileUnreadable { .. })
        ));
        assert!(emitter.finish().unwrap().is_empty());
    }

    #[test]
    fn test_emit_all_stops_at_first_failure() {
        let a = temp_file(b"aaaa");
        let segments = vec![
            Segment::new(a.path(), EraseMode::All, 0),
            Segment::new("/nonexistent/b", EraseMode::None, 0x1000),
            Segment::new(a.path(), EraseMode::None, 0x2000),
        ];

        let mut emitter = SegmentEmitter::new(Vec::new());
        assert!(emitter.emit_all(&segments).is_err());
        assert_eq!(emitter.segments_written(), 1);
        assert_eq!(emitter.finish().unwrap().len(), HEADER_SIZE + 4);
    }

    /// Accepts `room` bytes, then fails every write.
    struct BrokenSink {
        room: usize,
    }

    impl Write for BrokenSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.room == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_not_blamed_on_the_file() {
        let file = temp_file(b"payload");
        let mut emitter = SegmentEmitter::new(BrokenSink { room: HEADER_SIZE });

        let err = emitter
            .emit(&Segment::new(file.path(), EraseMode::None, 0))
            .unwrap_err();
        assert!(matches!(err, JtagImageError::Io(_)), "{err:?}");
        assert_eq!(emitter.segments_written(), 0);
    }

    #[test]
    fn test_large_payload_is_streamed_whole() {
        let data: Vec<u8> = (0..(3 * 64 * 1024 + 17)).map(|i| i as u8).collect();
        let file = temp_file(&data);

        let mut emitter = SegmentEmitter::new(Vec::new());
        emitter
            .emit(&Segment::new(file.path(), EraseMode::ToEnd, 0x0110_0000))
            .unwrap();
        let out = emitter.finish().unwrap();
        assert_eq!(&out[HEADER_SIZE..], &data[..]);
    }
}
