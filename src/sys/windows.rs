//! Windows implementation of the platform adapter.
//!
//! Only timestamps are available: ownership, device IDs, and extended
//! attributes have no Windows equivalent this tool can canonicalize, so masks
//! requesting them are rejected up front.

use std::fs::Metadata;
use std::os::windows::fs::MetadataExt;
use std::path::Path;

use crate::encoding::{HashEntry, Timespec};
use crate::error::{EngineError, MaskError};
use crate::hash::Hash;
use crate::mask::{Attr, Mask};
use crate::sys::SysProps;

pub fn validate_mask(mask: &Mask) -> Result<(), MaskError> {
    if mask.mode.bits() & 0o7111 != 0 {
        return Err(MaskError::Unsupported("masks >0666 unsupported on Windows"));
    }
    if mask
        .attr
        .intersects(Attr::UID | Attr::GID | Attr::XATTR | Attr::SPECIAL)
    {
        return Err(MaskError::Unsupported(
            "masks with UID/GID/xattr/special unsupported on Windows",
        ));
    }
    Ok(())
}

pub fn sys_props(meta: &Metadata) -> Option<SysProps> {
    Some(SysProps {
        uid: None,
        gid: None,
        mtime: filetime_to_timespec(meta.last_write_time()),
        // Creation time is mapped to ctime, preserving the historical output
        // of this tool; POSIX ctime is change-status time instead.
        ctime: filetime_to_timespec(meta.creation_time()),
        rdev: None,
    })
}

pub async fn xattr_entries(_path: &Path, _hash: &Hash) -> Result<Vec<HashEntry>, EngineError> {
    Err(EngineError::NoXattr)
}

// FILETIME counts 100ns intervals since 1601-01-01; Unix epoch offset below.
const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

fn filetime_to_timespec(ft: u64) -> Option<Timespec> {
    if ft == 0 {
        return None;
    }
    let since_epoch = ft as i64 - FILETIME_UNIX_EPOCH as i64;
    Some(Timespec {
        sec: since_epoch.div_euclid(10_000_000),
        nsec: since_epoch.rem_euclid(10_000_000) * 100,
    })
}
