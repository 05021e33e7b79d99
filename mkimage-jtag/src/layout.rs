//! Fixed partition map for the positional invocations
//!
//! ```text
//! 0x00000000  SPL / bootstream     14 MiB
//! 0x00E00000  u-boot.img            2 MiB
//! 0x01000000  u-boot env            1 MiB
//! 0x01100000  kernel (4/5 files)   16 MiB
//! 0x01100000  ubi rootfs           to end of flash (1/3 files)
//! 0x02100000  ubi rootfs           to end of flash (4/5 files)
//! ```

use std::path::{Path, PathBuf};

use crate::error::{JtagImageError, Result};
use crate::header::EraseMode;
use crate::segment::Segment;

const MIB: u32 = 1024 * 1024;

pub const SPL_OFFSET: u32 = 0;
pub const SPL_SIZE: u32 = 14 * MIB;
pub const UBOOT_OFFSET: u32 = SPL_OFFSET + SPL_SIZE;
pub const UBOOT_SIZE: u32 = 2 * MIB;
pub const ENV_OFFSET: u32 = UBOOT_OFFSET + UBOOT_SIZE;
pub const ENV_SIZE: u32 = MIB;
pub const KERNEL_OFFSET: u32 = ENV_OFFSET + ENV_SIZE;
pub const KERNEL_SIZE: u32 = 16 * MIB;
/// Root filesystem offset when no kernel partition is present
pub const ROOTFS_OFFSET: u32 = KERNEL_OFFSET;
/// Root filesystem offset behind a kernel partition
pub const ROOTFS_KERNEL_OFFSET: u32 = KERNEL_OFFSET + KERNEL_SIZE;

pub const MAX_FILES: usize = 5;

/// Map 1 to 5 positional files onto the fixed partition map.
///
/// * `ubi`
/// * `SPL u-boot.img`
/// * `SPL u-boot.img ubi`
/// * `SPL u-boot.img kernel ubi`
/// * `SPL u-boot.img env kernel ubi`
///
/// With three or more files the first segment erases the whole device and
/// the rest are written without erasing. Two files only touch their own
/// partitions, a lone UBI image erases from its offset to the end.
pub fn select(files: &[PathBuf]) -> Result<Vec<Segment>> {
    let segments = match files {
        [ubi] => vec![Segment::new(ubi, EraseMode::ToEnd, ROOTFS_OFFSET)],
        [spl, uboot] => vec![
            Segment::new(spl, EraseMode::Partition, SPL_OFFSET).with_part_size(SPL_SIZE),
            Segment::new(uboot, EraseMode::Partition, UBOOT_OFFSET).with_part_size(UBOOT_SIZE),
        ],
        [spl, uboot, ubi] => vec![
            spl_segment(spl),
            uboot_segment(uboot),
            Segment::new(ubi, EraseMode::None, ROOTFS_OFFSET),
        ],
        [spl, uboot, kernel, ubi] => vec![
            spl_segment(spl),
            uboot_segment(uboot),
            kernel_segment(kernel),
            Segment::new(ubi, EraseMode::None, ROOTFS_KERNEL_OFFSET),
        ],
        [spl, uboot, env, kernel, ubi] => vec![
            spl_segment(spl),
            uboot_segment(uboot),
            Segment::new(env, EraseMode::None, ENV_OFFSET).with_part_size(ENV_SIZE),
            kernel_segment(kernel),
            Segment::new(ubi, EraseMode::None, ROOTFS_KERNEL_OFFSET),
        ],
        _ => {
            return Err(JtagImageError::usage(format!(
                "expected 1 to {MAX_FILES} files, got {}",
                files.len()
            )));
        }
    };

    Ok(segments)
}

fn spl_segment(spl: &Path) -> Segment {
    Segment::new(spl, EraseMode::All, SPL_OFFSET).with_part_size(SPL_SIZE)
}

fn uboot_segment(uboot: &Path) -> Segment {
    Segment::new(uboot, EraseMode::None, UBOOT_OFFSET).with_part_size(UBOOT_SIZE)
}

fn kernel_segment(kernel: &Path) -> Segment {
    Segment::new(kernel, EraseMode::None, KERNEL_OFFSET).with_part_size(KERNEL_SIZE)
}
