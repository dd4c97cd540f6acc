//! POSIX implementation of the platform adapter.

use std::fs::Metadata;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::encoding::{HashEntry, Timespec};
use crate::error::{EngineError, MaskError};
use crate::hash::Hash;
use crate::mask::Mask;
use crate::sys::SysProps;

/// All mask fields are available on POSIX systems.
pub fn validate_mask(_mask: &Mask) -> Result<(), MaskError> {
    Ok(())
}

pub fn sys_props(meta: &Metadata) -> Option<SysProps> {
    Some(SysProps {
        uid: Some(meta.uid()),
        gid: Some(meta.gid()),
        mtime: Some(Timespec {
            sec: meta.mtime(),
            nsec: meta.mtime_nsec(),
        }),
        ctime: Some(Timespec {
            sec: meta.ctime(),
            nsec: meta.ctime_nsec(),
        }),
        rdev: Some(meta.rdev()),
    })
}

/// List extended attributes and digest each value with the entry's hash.
/// Entries are returned unordered; the canonical encoder's SET OF orders
/// them.
pub async fn xattr_entries(path: &Path, hash: &Hash) -> Result<Vec<HashEntry>, EngineError> {
    let mut entries = Vec::new();
    for name in xattr::list(path)? {
        let value = xattr::get(path, &name)?.unwrap_or_default();
        let sum = hash.metadata(&value).await?;
        entries.push(HashEntry {
            hash: sum,
            name: Some(name.as_bytes().to_vec()),
        });
    }
    Ok(entries)
}
