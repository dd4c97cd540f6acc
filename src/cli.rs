//! Command-line front-end: option parsing, output composition, and checksum
//! verification. The engine itself lives in [`crate::engine`].

use std::collections::VecDeque;
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::XsumConfig;
use crate::engine::Sum;
use crate::error::EngineError;
use crate::hash::Hash;
use crate::mask::{Attr, Mask};
use crate::node::File;

/// Deterministic checksums for files, directory trees, and file metadata.
#[derive(Debug, Parser)]
#[command(name = "xsum", version, about)]
pub struct Cli {
    /// Use hashing algorithm
    #[arg(short, long, default_value = "sha256")]
    pub algorithm: String,

    /// Validate checksums from the given files
    #[arg(short, long)]
    pub check: bool,

    /// With --check, suppress all output
    #[arg(short, long)]
    pub status: bool,

    /// With --check, suppress passing checksums
    #[arg(short, long)]
    pub quiet: bool,

    /// Apply attribute mask as [777]7[+ugstcxinel]
    #[arg(short, long)]
    pub mask: Option<String>,

    /// Directory mode (implies: -m 0000)
    #[arg(short, long)]
    pub dirs: bool,

    /// Portable mode, exclude names (implies: -m 0000+n)
    #[arg(short, long)]
    pub portable: bool,

    /// Git mode (implies: -m 0100)
    #[arg(short, long)]
    pub git: bool,

    /// Full mode (implies: -m 7777+ug)
    #[arg(short, long)]
    pub full: bool,

    /// Extended mode (implies: -m 7777+ugxs)
    #[arg(short = 'x', long)]
    pub extended: bool,

    /// Everything mode (implies: -m 7777+ugxsct)
    #[arg(short, long)]
    pub everything: bool,

    /// Include top-level metadata (enables mask, adds +i)
    #[arg(short, long)]
    pub inclusive: bool,

    /// Follow symlinks (enables mask, adds +l)
    #[arg(short = 'l', long)]
    pub follow: bool,

    /// Encode attribute mask to opaque, fixed-length hex (enables mask)
    #[arg(short, long)]
    pub opaque: bool,

    /// Enable diagnostic logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Paths to hash, or checksum files with --check; `-` reads stdin
    pub paths: Vec<String>,
}

/// Run the command line. Returns the process exit code.
pub async fn run(cli: Cli, config: &XsumConfig) -> i32 {
    if let Err(msg) = validate_flags(&cli) {
        eprintln!("xsum: {}", msg);
        return 2;
    }

    let hash = match Hash::named(&cli.algorithm) {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("xsum: invalid algorithm: {}", e);
            return 2;
        }
    };

    let mut paths = cli.paths.clone();
    if paths.is_empty() {
        paths.push("-".to_string());
    }

    if cli.check {
        return check(&cli, hash, paths).await;
    }

    let (mask, masked) = match resolve_mask(&cli, config) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("xsum: invalid mask: {}", e);
            return 2;
        }
    };
    debug!(%mask, masked, "resolved mask");

    let files: Vec<File> = paths
        .into_iter()
        .map(|p| File::new(hash.clone(), p, mask))
        .collect();

    let sum = Sum::new(!masked);
    let opaque = cli.opaque;
    let mut code = 0;
    let outcome = sum
        .each_list(files, |node| {
            if let Some(err) = &node.err {
                eprintln!("xsum: {}", err);
                code = 1;
                return Ok(());
            }
            let digest = if opaque {
                node.hex_string()
            } else {
                node.display_string()
            };
            println!("{}  {}", digest, node.file.path.display());
            Ok(())
        })
        .await;
    if let Err(e) = outcome {
        eprintln!("xsum: {}", e);
        return 1;
    }
    code
}

fn validate_flags(cli: &Cli) -> Result<(), String> {
    let exclusive = [
        cli.check,
        cli.mask.is_some(),
        cli.dirs,
        cli.portable,
        cli.git,
        cli.full,
        cli.extended,
        cli.everything,
    ];
    if exclusive.iter().filter(|&&b| b).count() > 1 {
        return Err("only one of -c, -m, -d, -p, -g, -f, -x, or -e permitted".to_string());
    }
    if cli.check && cli.inclusive {
        return Err("only one of -c, -i permitted".to_string());
    }
    if cli.check && cli.follow {
        return Err("only one of -c, -l permitted".to_string());
    }
    if cli.check && cli.opaque {
        return Err("only one of -c, -o permitted".to_string());
    }
    Ok(())
}

/// Resolve the effective mask. The second value reports whether any mask
/// option was given at all: without one the tool behaves like a plain
/// per-file checksum utility and rejects directories.
fn resolve_mask(cli: &Cli, config: &XsumConfig) -> Result<(Mask, bool), EngineError> {
    let mut masked = true;
    let mut mask = if let Some(spec) = &cli.mask {
        Mask::parse(spec)?
    } else if cli.dirs {
        Mask::new(0o0000, Attr::EMPTY)
    } else if cli.portable {
        Mask::new(0o0000, Attr::NO_NAME)
    } else if cli.git {
        Mask::new(0o0100, Attr::EMPTY)
    } else if cli.full {
        Mask::new(0o7777, Attr::UID | Attr::GID)
    } else if cli.extended {
        Mask::new(0o7777, Attr::UID | Attr::GID | Attr::XATTR | Attr::SPECIAL)
    } else if cli.everything {
        Mask::new(
            0o7777,
            Attr::UID | Attr::GID | Attr::XATTR | Attr::SPECIAL | Attr::CTIME | Attr::MTIME,
        )
    } else if cli.inclusive || cli.follow || cli.opaque {
        Mask::parse(&config.mask)?
    } else {
        masked = false;
        Mask::default()
    };
    if cli.inclusive {
        mask.attr.insert(Attr::INCLUSIVE);
    }
    if cli.follow {
        mask.attr.insert(Attr::FOLLOW);
    }
    Ok((mask, masked))
}

/// One parsed checksum-file entry.
struct CheckEntry {
    file: File,
    expected: String,
}

async fn check(cli: &Cli, default_hash: Hash, paths: Vec<String>) -> i32 {
    let mut entries = Vec::new();
    for index in &paths {
        let content = if index == "-" {
            let mut buf = String::new();
            use tokio::io::AsyncReadExt;
            if let Err(e) = tokio::io::stdin().read_to_string(&mut buf).await {
                eprintln!("xsum: {}", e);
                continue;
            }
            buf
        } else {
            match tokio::fs::read_to_string(index).await {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("xsum: {}: {}", index, e);
                    continue;
                }
            }
        };
        for line in content.lines() {
            if line.is_empty() {
                continue;
            }
            match parse_check_entry(line, &default_hash) {
                Some(entry) => entries.push(entry),
                None => eprintln!("xsum: {}: invalid entry `{}'", index, line),
            }
        }
    }

    let mut expected: VecDeque<String> = entries.iter().map(|e| e.expected.clone()).collect();
    let files: Vec<File> = entries.into_iter().map(|e| e.file).collect();

    let quiet = cli.quiet;
    let status = cli.status;
    let mut failed = 0usize;
    let sum = Sum::new(false);

    // Feed entries as a stream so huge checksum files pipeline with the
    // walks they trigger.
    let (tx, rx) = mpsc::channel(1);
    let feeder = tokio::spawn(async move {
        for file in files {
            if tx.send(file).await.is_err() {
                return;
            }
        }
    });
    let outcome = sum
        .each_stream(rx, |node| {
            let want = expected.pop_front().unwrap_or_default();
            if let Some(err) = &node.err {
                eprintln!("xsum: {}", err);
            }
            if node.sum_hex() == want {
                if !quiet && !status {
                    println!("{}: OK", node.file.path.display());
                }
            } else {
                if !status {
                    println!("{}: FAILED", node.file.path.display());
                }
                failed += 1;
            }
            Ok(())
        })
        .await;
    let _ = feeder.await;
    if let Err(e) = outcome {
        eprintln!("xsum: {}", e);
        return 1;
    }

    if failed > 0 {
        if !status {
            let plural = if failed > 1 { "s" } else { "" };
            eprintln!(
                "xsum: WARNING: {} computed checksum{} did NOT match",
                failed, plural
            );
        }
        return 1;
    }
    0
}

/// Parse a `DIGEST  path` line. The digest is `hex`, `alg:hex`, or
/// `alg:hex:mask` with the mask in either encoding.
fn parse_check_entry(line: &str, default_hash: &Hash) -> Option<CheckEntry> {
    let (digest, path) = line.split_once("  ")?;
    let parts: Vec<&str> = digest.split(':').collect();
    let (hash, hex_sum, mask) = match parts.as_slice() {
        [sum] => (default_hash.clone(), *sum, Mask::default()),
        [alg, sum] => (Hash::named(alg).ok()?, *sum, Mask::default()),
        [alg, sum, mask] => (Hash::named(alg).ok()?, *sum, Mask::parse_any(mask).ok()?),
        _ => return None,
    };
    if hex_sum.is_empty() || !hex_sum.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(CheckEntry {
        file: File::new(hash, path, mask),
        expected: hex_sum.to_ascii_lowercase(),
    })
}
