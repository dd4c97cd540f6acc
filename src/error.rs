//! Error types for the xsum checksum engine.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors surfaced while walking filesystem entries and composing digests.
///
/// Display strings follow the shapes users of checksum tools expect:
/// `<path>: <cause>` for top-level inputs and
/// ``failed to <verb> `<path>': <cause>`` for entries below the top level.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Top-level operation failure, e.g. `a.txt: failed to stat: ...`.
    #[error("{path}: failed to {verb}: {source}")]
    Top {
        verb: &'static str,
        path: String,
        source: Box<EngineError>,
    },

    /// Subtree operation failure, e.g. ``failed to read dir `d/x': ...``.
    #[error("failed to {verb} `{path}': {source}")]
    Sub {
        verb: &'static str,
        path: String,
        source: Box<EngineError>,
    },

    /// A child error annotated with the top-level input path.
    #[error("{path}: {source}")]
    Entry {
        path: String,
        source: Box<EngineError>,
    },

    #[error("is a directory")]
    Directory,

    #[error("special file")]
    SpecialFile,

    #[error("stat data unavailable")]
    NoStat,

    #[error("xattr data unavailable")]
    NoXattr,

    #[error("walk canceled")]
    Canceled,

    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Wrap an error with the `failed to <verb>` context appropriate for the
    /// entry's position in the tree.
    pub(crate) fn at(
        verb: &'static str,
        path: &Path,
        subdir: bool,
        source: impl Into<EngineError>,
    ) -> EngineError {
        let path = path.display().to_string();
        let source = Box::new(source.into());
        if subdir {
            EngineError::Sub { verb, path, source }
        } else {
            EngineError::Top { verb, path, source }
        }
    }

    /// Annotate an error with a top-level input path: `<path>: <cause>`.
    pub(crate) fn entry(path: &Path, source: impl Into<EngineError>) -> EngineError {
        EngineError::Entry {
            path: path.display().to_string(),
            source: Box::new(source.into()),
        }
    }
}

/// Errors from parsing or validating attribute masks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaskError {
    #[error("invalid attribute `{0}'")]
    InvalidAttr(char),

    #[error("invalid mode `{0}'")]
    InvalidMode(String),

    #[error("invalid hex mode length")]
    HexModeLength,

    #[error("invalid hex mode `{0}'")]
    InvalidHexMode(String),

    #[error("invalid hex attribute length")]
    HexAttrLength,

    #[error("invalid hex attribute `{0}'")]
    InvalidHexAttr(String),

    #[error("mask too short")]
    TooShort,

    #[error("invalid mask code")]
    InvalidCode,

    #[error("{0}")]
    Unsupported(&'static str),
}

/// Errors from hash construction and execution, including plugin subprocesses.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("unknown algorithm `{0}'")]
    UnknownAlgorithm(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("plugin error: {0}")]
    Plugin(String),

    #[error("plugin produced invalid digest: {0}")]
    PluginOutput(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn top_level_error_shape() {
        let err = EngineError::at(
            "stat",
            &PathBuf::from("a.txt"),
            false,
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "a.txt: failed to stat: no such file");
    }

    #[test]
    fn subtree_error_shape() {
        let err = EngineError::at(
            "read dir",
            &PathBuf::from("d/x"),
            true,
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(err.to_string(), "failed to read dir `d/x': permission denied");
    }

    #[test]
    fn entry_error_annotates_input_path() {
        let err = EngineError::entry(&PathBuf::from("d"), EngineError::SpecialFile);
        assert_eq!(err.to_string(), "d: special file");
    }
}
