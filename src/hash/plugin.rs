//! External hash plugins.
//!
//! A plugin is an executable named `xsum-<alg>` found on `PATH`. It receives
//! the pre-image on standard input (or, for whole files, the path as a single
//! positional argument), learns whether it is hashing file content or a
//! metadata blob from the `XSUM_PLUGIN_TYPE` environment variable, and prints
//! a hex-encoded digest on standard output. A non-zero exit surfaces the
//! plugin's standard error as the failure message.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncRead;
use tokio::process::Command;
use tracing::debug;

use crate::error::HashError;

const PLUGIN_TYPE_ENV: &str = "XSUM_PLUGIN_TYPE";
const PLUGIN_PREFIX: &str = "xsum-";

/// Pre-image kind announced to the plugin process.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PluginType {
    Metadata,
    Data,
}

impl PluginType {
    fn as_str(self) -> &'static str {
        match self {
            PluginType::Metadata => "metadata",
            PluginType::Data => "data",
        }
    }
}

/// A resolved plugin executable.
#[derive(Debug)]
pub struct HashPlugin {
    name: String,
    path: PathBuf,
}

impl HashPlugin {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up `xsum-<alg>` on `PATH`.
    pub fn lookup(alg: &str) -> Option<HashPlugin> {
        let exe = format!("{}{}", PLUGIN_PREFIX, alg);
        let path_var = env::var_os("PATH")?;
        for dir in env::split_paths(&path_var) {
            let candidate = dir.join(&exe);
            if is_executable(&candidate) {
                debug!(alg, path = %candidate.display(), "resolved hash plugin");
                return Some(HashPlugin {
                    name: alg.to_string(),
                    path: candidate,
                });
            }
        }
        None
    }

    /// Run the plugin with the pre-image supplied on its standard input.
    pub(crate) async fn run_stdin<R>(
        &self,
        ptype: PluginType,
        input: &mut R,
    ) -> Result<Vec<u8>, HashError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let mut child = Command::new(&self.path)
            .env(PLUGIN_TYPE_ENV, ptype.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        // The plugin's output is a short digest line, so streaming the
        // pre-image before collecting output cannot deadlock on pipes.
        if let Some(mut stdin) = child.stdin.take() {
            tokio::io::copy(input, &mut stdin).await?;
        }
        let output = child.wait_with_output().await?;
        Self::decode_output(output)
    }

    /// Run the plugin against a file it opens itself, passed as a single
    /// positional argument.
    pub(crate) async fn run_file(&self, path: &Path) -> Result<Vec<u8>, HashError> {
        let output = Command::new(&self.path)
            .env(PLUGIN_TYPE_ENV, PluginType::Data.as_str())
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Self::decode_output(output)
    }

    fn decode_output(output: std::process::Output) -> Result<Vec<u8>, HashError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(HashError::Plugin(stderr));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let digest = stdout.trim_end();
        hex::decode(digest).map_err(|_| HashError::PluginOutput(digest.to_string()))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
