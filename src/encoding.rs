//! Canonical DER serialization of checksum records.
//!
//! Two top-level structures are encoded, following this ASN.1 module:
//!
//! ```text
//! XSum DEFINITIONS ::= BEGIN
//!     File  ::=  SEQUENCE  {
//!         hash        [0]  EXPLICIT Hash OPTIONAL,
//!         mode        [1]  EXPLICIT Mode,
//!         uid         [2]  EXPLICIT INTEGER OPTIONAL,
//!         gid         [3]  EXPLICIT INTEGER OPTIONAL,
//!         atime       [4]  EXPLICIT Timespec OPTIONAL,
//!         mtime       [5]  EXPLICIT Timespec OPTIONAL,
//!         ctime       [6]  EXPLICIT Timespec OPTIONAL,
//!         btime       [7]  EXPLICIT Timespec OPTIONAL,
//!         rdev        [8]  EXPLICIT INTEGER OPTIONAL,
//!         xattr       [9]  EXPLICIT HashTree OPTIONAL
//!     }
//!     Hash      ::=  SEQUENCE { hashType ENUMERATED, hash OCTET STRING }
//!     Mode      ::=  SEQUENCE { mask BIT STRING, mode BIT STRING }
//!     Timespec  ::=  SEQUENCE { sec INTEGER, nsec INTEGER }
//!     HashTree  ::=  SEQUENCE { hashType ENUMERATED, tree SET OF HashEntry }
//!     HashEntry ::=  SEQUENCE { hash OCTET STRING, name OCTET STRING OPTIONAL }
//! END
//! ```
//!
//! DER (not BER) is required: SET OF entries are emitted in ascending
//! lexicographic order of their full encodings, which makes directory digests
//! independent of readdir order. Absent optional fields are absent from the
//! output, never zero-filled.

use crate::hash::HashType;

/// Seconds and nanoseconds of a file timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: i64,
}

/// One member of a `HashTree` SET OF: a digest with an optional name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    pub hash: Vec<u8>,
    pub name: Option<Vec<u8>>,
}

/// Canonical per-entry record, the pre-image for metadata-bearing digests.
///
/// `mask` and `mode` are 32-bit words in the POSIX `st_mode` layout: type
/// bits `0o170000`, setuid/setgid/sticky `0o7000`, permissions `0o777`.
/// The type bits are always set in `mask`; masking them out is disallowed
/// because it would collide, e.g., a symlink to a path with a regular file
/// containing that path.
#[derive(Debug, Clone, Default)]
pub struct FileRecord {
    pub hash_type: Option<HashType>,
    pub hash: Vec<u8>,
    pub mask: u32,
    pub mode: u32,
    pub uid: Option<u64>,
    pub gid: Option<u64>,
    pub atime: Option<Timespec>,
    pub mtime: Option<Timespec>,
    pub ctime: Option<Timespec>,
    pub btime: Option<Timespec>,
    pub rdev: Option<u64>,
    pub xattr: Option<(HashType, Vec<HashEntry>)>,
}

/// Encode a `File` record as DER.
pub fn file_der(rec: &FileRecord) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(ty) = rec.hash_type {
        let mut hash = Vec::new();
        enumerated(&mut hash, ty.code());
        octet_string(&mut hash, &rec.hash);
        explicit(&mut body, 0, &sequence(hash));
    }

    let mut mode = Vec::new();
    bit_string32(&mut mode, rec.mask);
    bit_string32(&mut mode, rec.mode & rec.mask);
    explicit(&mut body, 1, &sequence(mode));

    if let Some(uid) = rec.uid {
        explicit(&mut body, 2, &uint_der(uid));
    }
    if let Some(gid) = rec.gid {
        explicit(&mut body, 3, &uint_der(gid));
    }
    if let Some(ts) = rec.atime {
        explicit(&mut body, 4, &timespec_der(ts));
    }
    if let Some(ts) = rec.mtime {
        explicit(&mut body, 5, &timespec_der(ts));
    }
    if let Some(ts) = rec.ctime {
        explicit(&mut body, 6, &timespec_der(ts));
    }
    if let Some(ts) = rec.btime {
        explicit(&mut body, 7, &timespec_der(ts));
    }
    if let Some(rdev) = rec.rdev {
        explicit(&mut body, 8, &uint_der(rdev));
    }
    if let Some((ty, entries)) = &rec.xattr {
        explicit(&mut body, 9, &tree_der(*ty, entries.clone()));
    }

    sequence(body)
}

/// Encode a `HashTree` as DER. Entry order does not matter; the SET OF
/// encoding sorts the entries canonically.
pub fn tree_der(hash_type: HashType, entries: Vec<HashEntry>) -> Vec<u8> {
    let mut body = Vec::new();
    enumerated(&mut body, hash_type.code());

    let mut encoded: Vec<Vec<u8>> = entries.into_iter().map(entry_der).collect();
    encoded.sort();
    let mut set = Vec::new();
    for e in &encoded {
        set.extend_from_slice(e);
    }
    tlv(&mut body, 0x31, &set);

    sequence(body)
}

fn entry_der(entry: HashEntry) -> Vec<u8> {
    let mut body = Vec::new();
    octet_string(&mut body, &entry.hash);
    if let Some(name) = &entry.name {
        octet_string(&mut body, name);
    }
    sequence(body)
}

fn timespec_der(ts: Timespec) -> Vec<u8> {
    let mut body = Vec::new();
    tlv(&mut body, 0x02, &int_content(ts.sec));
    tlv(&mut body, 0x02, &int_content(ts.nsec));
    sequence(body)
}

fn uint_der(v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    tlv(&mut out, 0x02, &uint_content(v));
    out
}

// --- DER primitives ---

fn write_len(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

fn tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    write_len(out, content.len());
    out.extend_from_slice(content);
}

fn sequence(content: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::new();
    tlv(&mut out, 0x30, &content);
    out
}

/// Context-specific constructed tag wrapping a complete inner encoding.
fn explicit(out: &mut Vec<u8>, tag: u8, inner: &[u8]) {
    tlv(out, 0xa0 | tag, inner);
}

fn octet_string(out: &mut Vec<u8>, bytes: &[u8]) {
    tlv(out, 0x04, bytes);
}

fn enumerated(out: &mut Vec<u8>, code: u32) {
    tlv(out, 0x0a, &uint_content(u64::from(code)));
}

/// 32-bit BIT STRING with no unused bits, big-endian.
fn bit_string32(out: &mut Vec<u8>, word: u32) {
    let mut content = vec![0u8];
    content.extend_from_slice(&word.to_be_bytes());
    tlv(out, 0x03, &content);
}

/// Minimal two's-complement content octets for a signed integer.
fn int_content(v: i64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let cur = bytes[start];
        let next_high = bytes[start + 1] & 0x80 != 0;
        if (cur == 0x00 && !next_high) || (cur == 0xff && next_high) {
            start += 1;
        } else {
            break;
        }
    }
    bytes[start..].to_vec()
}

/// Minimal content octets for an unsigned integer, with a leading zero when
/// the high bit would otherwise read as a sign.
fn uint_content(v: u64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let skip = bytes
        .iter()
        .take_while(|&&b| b == 0)
        .count()
        .min(bytes.len() - 1);
    let mut out = Vec::with_capacity(9);
    if bytes[skip] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[skip..]);
    out
}
