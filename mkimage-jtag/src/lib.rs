//! # mkimage_jtag
//!
//! Builds images for JTAG flashing tools: a stream of segments, each a small
//! header telling the flasher what to erase and where to write, followed by
//! the raw contents of one input file.
//!
//! Segments come either from the fixed partition map in [`layout`] or from
//! `file@start[-end]` descriptors parsed by [`script`].
//!
//! ## Example
//!
//! ```no_run
//! use mkimage_jtag::{layout, SegmentEmitter};
//! use std::path::PathBuf;
//!
//! let files = [PathBuf::from("SPL"), PathBuf::from("u-boot.img")];
//! let segments = layout::select(&files)?;
//!
//! let mut emitter = SegmentEmitter::new(Vec::new());
//! emitter.emit_all(&segments)?;
//! let _image = emitter.finish()?;
//! # Ok::<(), mkimage_jtag::JtagImageError>(())
//! ```

pub mod cli;
pub mod emitter;
pub mod error;
pub mod header;
pub mod layout;
pub mod reader;
pub mod script;
pub mod segment;
pub mod size;

pub use emitter::SegmentEmitter;
pub use error::{JtagImageError, Result};
pub use header::{EraseMode, SegmentHeader};
pub use reader::{ImageReader, read_image_headers};
pub use script::{FirstErase, SegmentRole, SegmentSpec, parse_script};
pub use segment::Segment;
pub use size::{parse_size, parse_size_u32};

/// Current version of the mkimage_jtag implementation
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Magic bytes opening every segment header
pub const GW_MAGIC: [u8; 2] = *b"GW";

/// Size of one encoded segment header
pub const HEADER_SIZE: usize = 16;
