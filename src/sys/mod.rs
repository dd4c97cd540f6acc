//! Platform adapter: filesystem metadata in a platform-neutral shape.
//!
//! Everything the walker needs from the operating system goes through this
//! module: entry classification, system properties (ownership, timestamps,
//! device IDs), extended attributes, mask capability validation, and
//! unordered directory listings. Fields a platform cannot supply are absent
//! rather than zeroed; requesting an absent field through a mask is an error
//! decided by the walker.

use std::ffi::OsString;
use std::fs::Metadata;
use std::io;
use std::path::Path;

use crate::encoding::Timespec;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::{sys_props, validate_mask, xattr_entries};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::{sys_props, validate_mask, xattr_entries};

/// Per-entry system properties. Optional fields are absent on platforms that
/// do not surface them.
#[derive(Debug, Clone, Default)]
pub struct SysProps {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub mtime: Option<Timespec>,
    pub ctime: Option<Timespec>,
    pub rdev: Option<u64>,
}

/// Filesystem entry classification used for dispatch and for the type bits
/// that always participate in digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
    Block,
    Char,
    Fifo,
    Socket,
    Unknown,
}

impl EntryKind {
    /// POSIX `st_mode` type bits, fixed cross-platform constants.
    pub fn type_bits(self) -> u32 {
        match self {
            EntryKind::Regular => 0o100000,
            EntryKind::Directory => 0o040000,
            EntryKind::Symlink => 0o120000,
            EntryKind::Block => 0o060000,
            EntryKind::Char => 0o020000,
            EntryKind::Fifo => 0o010000,
            EntryKind::Socket => 0o140000,
            EntryKind::Unknown => 0,
        }
    }

    pub fn is_device(self) -> bool {
        matches!(self, EntryKind::Block | EntryKind::Char)
    }

    /// Neither regular, directory, nor symlink.
    pub fn is_special(self) -> bool {
        !matches!(
            self,
            EntryKind::Regular | EntryKind::Directory | EntryKind::Symlink
        )
    }
}

#[cfg(unix)]
pub fn entry_kind(meta: &Metadata) -> EntryKind {
    use std::os::unix::fs::FileTypeExt;
    let ft = meta.file_type();
    if ft.is_file() {
        EntryKind::Regular
    } else if ft.is_dir() {
        EntryKind::Directory
    } else if ft.is_symlink() {
        EntryKind::Symlink
    } else if ft.is_block_device() {
        EntryKind::Block
    } else if ft.is_char_device() {
        EntryKind::Char
    } else if ft.is_fifo() {
        EntryKind::Fifo
    } else if ft.is_socket() {
        EntryKind::Socket
    } else {
        EntryKind::Unknown
    }
}

#[cfg(not(unix))]
pub fn entry_kind(meta: &Metadata) -> EntryKind {
    let ft = meta.file_type();
    if ft.is_file() {
        EntryKind::Regular
    } else if ft.is_dir() {
        EntryKind::Directory
    } else if ft.is_symlink() {
        EntryKind::Symlink
    } else {
        EntryKind::Unknown
    }
}

/// Permission and special bits (`0o7777`) of an entry.
#[cfg(unix)]
pub fn perm_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0o7777
}

#[cfg(not(unix))]
pub fn perm_bits(meta: &Metadata) -> u32 {
    let write = if meta.permissions().readonly() {
        0
    } else {
        0o200
    };
    if meta.is_dir() {
        0o555 | write
    } else {
        0o444 | write
    }
}

/// Raw bytes of a filename for canonical encoding.
#[cfg(unix)]
pub fn name_bytes(name: &std::ffi::OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
pub fn name_bytes(name: &std::ffi::OsStr) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

/// List child names of a directory in unspecified order.
pub async fn read_dir_unordered(path: &Path) -> io::Result<Vec<OsString>> {
    let mut dir = tokio::fs::read_dir(path).await?;
    let mut names = Vec::new();
    while let Some(entry) = dir.next_entry().await? {
        names.push(entry.file_name());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_bits_disambiguate_kinds() {
        let kinds = [
            EntryKind::Regular,
            EntryKind::Directory,
            EntryKind::Symlink,
            EntryKind::Block,
            EntryKind::Char,
            EntryKind::Fifo,
            EntryKind::Socket,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.type_bits(), b.type_bits(), "{a:?} vs {b:?}");
            }
        }
    }

    #[tokio::test]
    async fn read_dir_lists_all_children() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), "1").unwrap();
        std::fs::write(dir.path().join("b"), "2").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();

        let mut names = read_dir_unordered(dir.path()).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
