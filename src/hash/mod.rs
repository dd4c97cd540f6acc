//! Pluggable hash abstraction.
//!
//! A [`Hash`] is either a built-in algorithm from the closed catalog or an
//! external plugin executable. Both expose the same four operations:
//! hash an in-memory metadata blob, hash a byte stream, hash a file, and
//! report a stable textual name. Every call constructs fresh state; there is
//! no incremental API, which keeps the plugin contract self-contained and
//! avoids shared state across concurrent operations.

mod algorithm;
mod plugin;

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::HashError;

pub use algorithm::HashType;
pub use plugin::HashPlugin;
use algorithm::HashState as _;
use plugin::PluginType;

const READ_BUF_SIZE: usize = 64 * 1024;

/// A hash identity together with its construction recipe.
#[derive(Debug, Clone)]
pub enum Hash {
    /// Built-in algorithm; fresh hasher per call.
    Alg(HashType),
    /// External `xsum-<alg>` executable.
    Plugin(Arc<HashPlugin>),
}

impl Hash {
    /// Resolve an algorithm name: built-ins first, then `xsum-<alg>`
    /// plugin lookup on `PATH`.
    pub fn named(alg: &str) -> Result<Hash, HashError> {
        if let Some(ty) = HashType::parse(alg) {
            return Ok(Hash::Alg(ty));
        }
        match HashPlugin::lookup(alg) {
            Some(plugin) => Ok(Hash::Plugin(Arc::new(plugin))),
            None => Err(HashError::UnknownAlgorithm(alg.to_string())),
        }
    }

    /// Stable textual identity used in output and lookup.
    pub fn name(&self) -> &str {
        match self {
            Hash::Alg(ty) => ty.name(),
            Hash::Plugin(p) => p.name(),
        }
    }

    /// Catalog code for canonical encodings. Plugins are outside the closed
    /// catalog and encode as the `none` sentinel.
    pub fn hash_type(&self) -> HashType {
        match self {
            Hash::Alg(ty) => *ty,
            Hash::Plugin(_) => HashType::None,
        }
    }

    /// Hash a complete in-memory blob; used for canonical pre-images.
    pub async fn metadata(&self, bytes: &[u8]) -> Result<Vec<u8>, HashError> {
        match self {
            Hash::Alg(ty) => {
                let mut state = ty.new_state();
                state.update(bytes);
                Ok(state.finalize())
            }
            Hash::Plugin(p) => {
                let mut reader = bytes;
                p.run_stdin(PluginType::Metadata, &mut reader).await
            }
        }
    }

    /// Hash a byte stream end-to-end.
    pub async fn data<R>(&self, reader: &mut R) -> Result<Vec<u8>, HashError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        match self {
            Hash::Alg(ty) => {
                let mut state = ty.new_state();
                let mut buf = vec![0u8; READ_BUF_SIZE];
                loop {
                    let n = reader.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    state.update(&buf[..n]);
                }
                Ok(state.finalize())
            }
            Hash::Plugin(p) => p.run_stdin(PluginType::Data, reader).await,
        }
    }

    /// Open `path` and hash it to EOF. Plugins receive the path and read the
    /// file themselves.
    pub async fn file(&self, path: &Path) -> Result<Vec<u8>, HashError> {
        match self {
            Hash::Alg(_) => {
                let mut file = tokio::fs::File::open(path).await?;
                self.data(&mut file).await
            }
            Hash::Plugin(p) => p.run_file(path).await,
        }
    }
}
