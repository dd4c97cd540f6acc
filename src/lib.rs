//! xsum: Deterministic Checksums for Filesystem Trees
//!
//! Computes a single, reproducible digest for a file or an entire directory
//! tree, optionally folding file metadata (mode bits, owner, timestamps,
//! extended attributes, device IDs) into the digest in a canonical,
//! cross-platform form. Directory digests are Merkle trees over per-entry
//! digests; metadata-bearing digests hash a DER-encoded canonical record that
//! embeds the entry's data digest.

pub mod cli;
pub mod config;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod hash;
pub mod logging;
pub mod mask;
pub mod node;
pub mod queue;
pub mod sys;
pub mod walk;

pub use engine::Sum;
pub use error::{EngineError, HashError, MaskError};
pub use hash::{Hash, HashType};
pub use mask::{Attr, Mask, Mode};
pub use node::{File, Node};
pub use sys::{EntryKind, SysProps};
