//! Input specifications and result nodes.

use std::path::PathBuf;

use crate::encoding::{self, FileRecord, HashEntry};
use crate::error::EngineError;
use crate::hash::Hash;
use crate::mask::{Attr, Mask};
use crate::sys::{EntryKind, SysProps};

/// One checksum input: what to hash, with which algorithm, under which mask.
///
/// `path` is `-` when `stdin` is set; the engine treats the specification as
/// opaque beyond these fields.
#[derive(Debug, Clone)]
pub struct File {
    pub hash: Hash,
    pub path: PathBuf,
    pub mask: Mask,
    pub stdin: bool,
}

impl File {
    pub fn new(hash: Hash, path: impl Into<PathBuf>, mask: Mask) -> File {
        let path = path.into();
        let stdin = path.as_os_str() == "-";
        File {
            hash,
            path,
            mask,
            stdin,
        }
    }
}

/// The result of walking one entry. Exactly one of `sum` and `err` is
/// meaningful; nodes are created by the walker and never mutated afterwards.
#[derive(Debug)]
pub struct Node {
    pub file: File,
    /// Raw digest bytes.
    pub sum: Vec<u8>,
    /// Resolved mode including type bits, POSIX `st_mode` layout.
    pub mode: u32,
    pub kind: EntryKind,
    pub sys: Option<SysProps>,
    /// Extended attribute digests, fetched only when the mask selects them.
    pub xattr: Option<Vec<HashEntry>>,
    pub err: Option<EngineError>,
}

impl Node {
    pub(crate) fn error(file: File, err: EngineError) -> Node {
        Node {
            file,
            sum: Vec::new(),
            mode: 0,
            kind: EntryKind::Unknown,
            sys: None,
            xattr: None,
            err: Some(err),
        }
    }

    pub fn sum_hex(&self) -> String {
        hex::encode(&self.sum)
    }

    fn surfaced(&self) -> bool {
        self.kind == EntryKind::Directory || self.file.mask.attr.contains(Attr::INCLUSIVE)
    }

    /// Wire form with the human mask encoding: `alg:hex:mask` for directories
    /// and inclusive entries, the raw hex digest otherwise.
    pub fn display_string(&self) -> String {
        if self.surfaced() {
            format!(
                "{}:{}:{}",
                self.file.hash.name(),
                self.sum_hex(),
                self.file.mask
            )
        } else {
            self.sum_hex()
        }
    }

    /// Wire form surfacing the algorithm without a mask: `alg:hex`.
    pub fn algorithm_string(&self) -> String {
        format!("{}:{}", self.file.hash.name(), self.sum_hex())
    }

    /// Wire form with the opaque mask encoding.
    pub fn hex_string(&self) -> String {
        if self.surfaced() {
            format!(
                "{}:{}:{}",
                self.file.hash.name(),
                self.sum_hex(),
                self.file.mask.opaque()
            )
        } else {
            self.sum_hex()
        }
    }

    /// Assemble the canonical `File` record for this entry, embedding the raw
    /// digest and the metadata selected by the mask.
    ///
    /// The record is the pre-image both for metadata-inclusive digests and
    /// for the per-child entries of a parent directory's Merkle step.
    pub(crate) fn record_der(&self) -> Result<Vec<u8>, EngineError> {
        let mask = &self.file.mask;

        let (hash_type, hash) = if mask.attr.contains(Attr::NO_DATA) {
            (None, Vec::new())
        } else {
            (Some(self.file.hash.hash_type()), self.sum.clone())
        };

        // Type bits are never masked out; a +s non-device entry must not
        // collide with -s, and symlinks must not collide with regular files
        // containing their target path.
        let mask_word = 0o170000 | u32::from(mask.mode.bits());

        if self.sys.is_none() && mask.attr.intersects(Attr::STAT) {
            return Err(EngineError::NoStat);
        }
        let sys = self.sys.clone().unwrap_or_default();
        let want = |attr: Attr| mask.attr.contains(attr);

        let uid = if want(Attr::UID) {
            Some(u64::from(sys.uid.ok_or(EngineError::NoStat)?))
        } else {
            None
        };
        let gid = if want(Attr::GID) {
            Some(u64::from(sys.gid.ok_or(EngineError::NoStat)?))
        } else {
            None
        };
        let mtime = if want(Attr::MTIME) {
            Some(sys.mtime.ok_or(EngineError::NoStat)?)
        } else {
            None
        };
        let ctime = if want(Attr::CTIME) {
            Some(sys.ctime.ok_or(EngineError::NoStat)?)
        } else {
            None
        };
        let rdev = if want(Attr::SPECIAL) && self.kind.is_device() {
            Some(sys.rdev.ok_or(EngineError::NoStat)?)
        } else {
            None
        };
        let xattr = if want(Attr::XATTR) {
            let entries = self.xattr.clone().ok_or(EngineError::NoXattr)?;
            Some((self.file.hash.hash_type(), entries))
        } else {
            None
        };

        Ok(encoding::file_der(&FileRecord {
            hash_type,
            hash,
            mask: mask_word,
            mode: self.mode,
            uid,
            gid,
            atime: None,
            mtime,
            ctime,
            btime: None,
            rdev,
            xattr,
        }))
    }

    /// Per-child entry for the parent directory's hash tree: the metadata
    /// digest of the child record, named by basename unless the walk is
    /// portable.
    pub(crate) async fn dir_entry(&self, portable: bool) -> Result<HashEntry, EngineError> {
        let record = self.record_der()?;
        let sum = self.file.hash.metadata(&record).await?;
        let name = if portable {
            None
        } else {
            self.file.path.file_name().map(crate::sys::name_bytes)
        };
        Ok(HashEntry { hash: sum, name })
    }
}
