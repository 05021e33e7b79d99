//! Command line interface for mkimage_jtag

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::VERSION;
use crate::emitter::SegmentEmitter;
use crate::error::{JtagImageError, Result};
use crate::layout;
use crate::reader::read_image_headers;
use crate::script::{FirstErase, parse_script};
use crate::segment::Segment;
use crate::size::format_size;

const LAYOUT_HELP: &str = "\
Standard images (written to stdout):
  mkimage_jtag <ubi>                                    rootfs at 17MiB, erase to end
  mkimage_jtag <SPL> <u-boot.img>                       erase and write bootloader partitions
  mkimage_jtag <SPL> <u-boot.img> <ubi>                 erase entire flash, then write all parts
  mkimage_jtag <SPL> <u-boot.img> <kernel> <ubi>
  mkimage_jtag <SPL> <u-boot.img> <env> <kernel> <ubi>

Advanced usage:
  mkimage_jtag [-e|-s] <file>@<start>[-[<end>]] ...

  <file>@<start>        write file at start
  <file>@<start>-<end>  write file into the partition start..end
  <file>@<start>-       write file at start, erasing to the end of flash

  Addresses are decimal or 0x-prefixed hex with an optional K/M/G suffix.

Example:
  mkimage_jtag -e SPL@0 u-boot.img@14M rootfs.ubi@17M- > image.bin";

/// Command line arguments for mkimage_jtag
#[derive(Parser, Debug)]
#[command(name = "mkimage_jtag")]
#[command(version = VERSION)]
#[command(about = "Create a JTAG flash image from bootloader and filesystem parts", long_about = None)]
#[command(after_help = LAYOUT_HELP)]
pub struct Args {
    /// Scripted mode: erase the entire flash before the first segment
    #[arg(short = 'e', long = "erase-all", conflicts_with = "erase_none")]
    pub erase_all: bool,

    /// Scripted mode: erase nothing before the first segment
    #[arg(short = 's', long = "erase-none")]
    pub erase_none: bool,

    /// Write the image to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// List the segments of an existing image
    #[arg(
        short,
        long,
        value_name = "IMAGE",
        conflicts_with_all = ["erase_all", "erase_none", "output", "files"]
    )]
    pub list: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode - only output warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Input files, or file@start[-end] segments with -e/-s
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,
}

/// What a parsed command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Build(BuildPlan),
    List(PathBuf),
}

/// Where the segments of a new image come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildPlan {
    Positional(Vec<PathBuf>),
    Scripted {
        first: FirstErase,
        tokens: Vec<String>,
    },
}

impl Args {
    pub fn invocation(&self) -> Invocation {
        if let Some(image) = &self.list {
            return Invocation::List(image.clone());
        }

        let first = if self.erase_all {
            Some(FirstErase::All)
        } else if self.erase_none {
            Some(FirstErase::Keep)
        } else {
            None
        };

        let plan = match first {
            Some(first) => BuildPlan::Scripted {
                first,
                tokens: self.files.clone(),
            },
            None => BuildPlan::Positional(self.files.iter().map(PathBuf::from).collect()),
        };
        Invocation::Build(plan)
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Warn
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Resolve a build into its ordered segments.
pub fn plan(build: &BuildPlan) -> Result<Vec<Segment>> {
    match build {
        BuildPlan::Positional(files) => layout::select(files),
        BuildPlan::Scripted { first, tokens } => parse_script(*first, tokens),
    }
}

/// Main CLI handler
pub fn run_cli(args: Args) -> Result<()> {
    match args.invocation() {
        Invocation::List(image) => handle_list(&image),
        Invocation::Build(build) => {
            let segments = plan(&build)?;
            match &args.output {
                Some(path) => handle_create_file(&segments, path),
                None => handle_create_stdout(&segments),
            }
        }
    }
}

fn handle_create_stdout(segments: &[Segment]) -> Result<()> {
    let stdout = io::stdout();
    if stdout.is_terminal() {
        return Err(JtagImageError::StdoutIsTerminal);
    }

    write_image(segments, BufWriter::new(stdout.lock()))
}

fn handle_create_file(segments: &[Segment], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_image(segments, BufWriter::new(file)).inspect_err(|_| {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("could not remove partial image {}: {e}", path.display());
        }
    })
}

fn write_image<W: Write>(segments: &[Segment], sink: W) -> Result<()> {
    let mut emitter = SegmentEmitter::new(sink);
    emitter.emit_all(segments)?;

    let (count, total) = (emitter.segments_written(), emitter.bytes_written());
    emitter.finish()?;

    info!("wrote {count} segments, {}", format_size(total));
    Ok(())
}

fn handle_list(image: &Path) -> Result<()> {
    let headers = read_image_headers(image)?;

    println!(
        "{:>3}  {:<6} {:>10}  {:>10}  {:>10}",
        "#", "erase", "offset", "size", "part"
    );
    for (i, header) in headers.iter().enumerate() {
        println!(
            "{:>3}  {:<6} {:#010x}  {:>10}  {:#010x}",
            i, header.erase_mode, header.offset, header.data_size, header.part_size
        );
    }

    info!("{}: {} segments", image.display(), headers.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::EraseMode;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("mkimage_jtag").chain(argv.iter().copied())).unwrap()
    }

    fn build(argv: &[&str]) -> BuildPlan {
        match parse(argv).invocation() {
            Invocation::Build(build) => build,
            other => panic!("expected a build, got {other:?}"),
        }
    }

    #[test]
    fn test_positional_invocation() {
        let args = parse(&["SPL", "u-boot.img"]);
        assert_eq!(
            args.invocation(),
            Invocation::Build(BuildPlan::Positional(vec![
                PathBuf::from("SPL"),
                PathBuf::from("u-boot.img")
            ]))
        );
        assert_eq!(args.log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_scripted_invocation() {
        assert_eq!(
            build(&["-e", "spl@0-14M", "ubi@17M-"]),
            BuildPlan::Scripted {
                first: FirstErase::All,
                tokens: vec!["spl@0-14M".into(), "ubi@17M-".into()],
            }
        );

        for flag in ["-s", "--erase-none"] {
            assert!(matches!(
                build(&[flag, "env@16M"]),
                BuildPlan::Scripted {
                    first: FirstErase::Keep,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_list_invocation() {
        let args = parse(&["-l", "image.bin"]);
        assert_eq!(args.invocation(), Invocation::List("image.bin".into()));
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(Args::try_parse_from(["mkimage_jtag", "-e", "-s", "a@0"]).is_err());
        assert!(Args::try_parse_from(["mkimage_jtag", "-v", "-q", "a"]).is_err());
        assert!(Args::try_parse_from(["mkimage_jtag", "-l", "x.bin", "a"]).is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["-v", "a"]).log_level(), LevelFilter::Debug);
        assert_eq!(parse(&["-q", "a"]).log_level(), LevelFilter::Warn);
    }

    #[test]
    fn test_plan() {
        let segments = plan(&build(&["rootfs.ubi"])).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].erase_mode, EraseMode::ToEnd);

        let segments = plan(&build(&["-s", "env@16M"])).unwrap();
        assert_eq!(segments[0].erase_mode, EraseMode::None);

        let segments = plan(&build(&["-s", "spl@0-14M", "ubi@17M-"])).unwrap();
        assert_eq!(segments[0].erase_mode, EraseMode::None);
        assert_eq!(segments[1].erase_mode, EraseMode::ToEnd);

        assert!(matches!(
            plan(&build(&[])),
            Err(JtagImageError::Usage(_))
        ));
        assert!(matches!(
            plan(&build(&["-e"])),
            Err(JtagImageError::Usage(_))
        ));
    }

    #[test]
    fn test_write_image_to_file_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let part = dir.path().join("part.bin");
        std::fs::write(&part, b"0123456789").unwrap();
        let output = dir.path().join("image.bin");

        let segments = vec![
            Segment::new(&part, EraseMode::All, 0),
            Segment::new(dir.path().join("missing.bin"), EraseMode::None, 0x1000),
        ];
        assert!(handle_create_file(&segments, &output).is_err());
        assert!(!output.exists());

        handle_create_file(&segments[..1], &output).unwrap();
        assert_eq!(
            std::fs::metadata(&output).unwrap().len(),
            crate::HEADER_SIZE as u64 + 10
        );
    }
}
