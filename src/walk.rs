//! The metadata-aware Merkle walker.
//!
//! A walk is one task per filesystem entry, cooperating through a counting
//! semaphore whose capacity bounds concurrently CPU-active work. The permit
//! discipline is strict: a walker acquires one permit on entry, releases it
//! before awaiting descendants (children acquire their own), and releases it
//! on every exit path exactly once. The `Sched` signal fires exactly once per
//! walk, at the point where all descendant work has been scheduled, which is
//! what lets the engine pipeline the next top-level input against a large
//! subtree still in flight.

use std::ffi::OsString;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, trace};

use crate::encoding;
use crate::error::EngineError;
use crate::mask::Attr;
use crate::node::{File, Node};
use crate::sys::{self, EntryKind};

/// Best-effort single-shot callback: fired when a walk has scheduled all of
/// its remaining work. Firing is idempotent and guaranteed on drop, so every
/// exit path signals exactly once.
pub(crate) struct Sched(Option<oneshot::Sender<()>>);

impl Sched {
    pub(crate) fn new(tx: oneshot::Sender<()>) -> Sched {
        Sched(Some(tx))
    }

    fn fire(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Sched {
    fn drop(&mut self) {
        self.fire();
    }
}

pub(crate) struct Walker {
    pub(crate) sem: Arc<Semaphore>,
    pub(crate) no_dirs: bool,
}

impl Walker {
    pub(crate) fn walk(
        self: Arc<Self>,
        file: File,
        subdir: bool,
        sched: Sched,
    ) -> BoxFuture<'static, Node> {
        async move { self.walk_entry(file, subdir, sched).await }.boxed()
    }

    async fn walk_entry(self: Arc<Self>, mut file: File, subdir: bool, mut sched: Sched) -> Node {
        let permit = match self.sem.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => return Node::error(file, EngineError::Canceled),
        };
        // Held in an Option so descent paths can release early; the final
        // drop on return covers every other exit.
        let mut permit = Some(permit);

        if let Err(e) = sys::validate_mask(&file.mask) {
            return Node::error(file, e.into());
        }

        if file.stdin {
            return walk_stdin(file, sched).await;
        }

        let meta = match tokio::fs::symlink_metadata(&file.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let err = EngineError::entry(&file.path, e);
                return Node::error(file, err);
            }
            Err(e) => return err_node("stat", file, subdir, e.into()),
        };

        let portable = file.mask.attr.contains(Attr::NO_NAME);
        let inclusive = file.mask.attr.contains(Attr::INCLUSIVE);
        let follow = file.mask.attr.contains(Attr::FOLLOW) || (!inclusive && !subdir);
        let no_data = file.mask.attr.contains(Attr::NO_DATA) && (inclusive || subdir);

        let kind = sys::entry_kind(&meta);
        let mode = kind.type_bits() | sys::perm_bits(&meta);
        let sys_props = sys::sys_props(&meta);
        trace!(path = %file.path.display(), ?kind, subdir, "walking entry");

        let sum: Vec<u8> = match kind {
            EntryKind::Directory => {
                if self.no_dirs {
                    let err = EngineError::entry(&file.path, EngineError::Directory);
                    return Node::error(file, err);
                }
                let names = match sys::read_dir_unordered(&file.path).await {
                    Ok(names) => names,
                    Err(e) => return err_node("read dir", file, subdir, e.into()),
                };
                debug!(path = %file.path.display(), children = names.len(), "descending");

                // Children acquire their own permits; holding ours across the
                // descent would deadlock once they fill the semaphore.
                drop(permit.take());
                let mut children = self.clone().walk_dir(&file, names).await;
                sched.fire();

                let mut entries = Vec::new();
                while let Some(child) = children.recv().await {
                    if let Some(e) = child.err {
                        // A child error already carries its own context; the
                        // parent cannot produce a digest with missing
                        // children.
                        return if subdir {
                            Node::error(file, e)
                        } else {
                            let err = EngineError::entry(&file.path, e);
                            Node::error(file, err)
                        };
                    }
                    match child.dir_entry(portable).await {
                        Ok(entry) => entries.push(entry),
                        Err(e) => return err_node("hash metadata", file, subdir, e),
                    }
                }
                let tree = encoding::tree_der(file.hash.hash_type(), entries);
                match file.hash.metadata(&tree).await {
                    Ok(sum) => sum,
                    Err(e) => return err_node("hash", file, subdir, e.into()),
                }
            }

            EntryKind::Symlink if follow => {
                let target = match tokio::fs::canonicalize(&file.path).await {
                    Ok(t) => t,
                    Err(e) => return err_node("read link", file, subdir, e.into()),
                };
                drop(permit.take());
                let link_path = std::mem::replace(&mut file.path, target);
                // The resumed walk reacquires a permit and takes over the
                // sched signal.
                let mut node = self.clone().walk(file, subdir, sched).await;
                node.file.path = link_path;
                return node;
            }

            EntryKind::Symlink => {
                // Not following: announce scheduling before reading the link.
                sched.fire();
                let link = match tokio::fs::read_link(&file.path).await {
                    Ok(l) => l,
                    Err(e) => return err_node("read link", file, subdir, e.into()),
                };
                file.mask.attr.remove(Attr::NO_NAME);
                if no_data {
                    file.mask.attr.insert(Attr::NO_DATA);
                    match file.hash.metadata(&[]).await {
                        Ok(sum) => sum,
                        Err(e) => return err_node("hash", file, subdir, e.into()),
                    }
                } else {
                    file.mask.attr.remove(Attr::NO_DATA);
                    let target = sys::name_bytes(link.as_os_str());
                    match file.hash.metadata(&target).await {
                        Ok(sum) => sum,
                        Err(e) => return err_node("hash link", file, subdir, e.into()),
                    }
                }
            }

            _ => {
                sched.fire();
                file.mask.attr.remove(Attr::NO_NAME);
                if kind.is_special() && !inclusive && !subdir {
                    return err_node("hash", file, subdir, EngineError::SpecialFile);
                }
                if no_data || kind.is_special() {
                    file.mask.attr.insert(Attr::NO_DATA);
                    match file.hash.data(&mut tokio::io::empty()).await {
                        Ok(sum) => sum,
                        Err(e) => return err_node("hash", file, subdir, e.into()),
                    }
                } else {
                    file.mask.attr.remove(Attr::NO_DATA);
                    match file.hash.file(&file.path).await {
                        Ok(sum) => sum,
                        Err(e) => return err_node("hash", file, subdir, e.into()),
                    }
                }
            }
        };

        let xattr = if file.mask.attr.contains(Attr::XATTR) {
            match sys::xattr_entries(&file.path, &file.hash).await {
                Ok(entries) => Some(entries),
                Err(e) => return err_node("read xattr", file, subdir, e),
            }
        } else {
            None
        };

        let mut node = Node {
            file,
            sum,
            mode,
            kind,
            sys: sys_props,
            xattr,
            err: None,
        };
        if inclusive && !subdir {
            // Replace the raw digest with the metadata-inclusive digest of
            // the canonical record embedding it.
            let record = match node.record_der() {
                Ok(r) => r,
                Err(e) => return err_node("hash metadata", node.file, subdir, e),
            };
            match node.file.hash.metadata(&record).await {
                Ok(sum) => node.sum = sum,
                Err(e) => return err_node("hash metadata", node.file, subdir, e.into()),
            }
        }
        node
    }

    /// Fan out one task per child, then wait until every child has scheduled
    /// its own work before returning the result channel.
    async fn walk_dir(self: Arc<Self>, file: &File, names: Vec<OsString>) -> mpsc::Receiver<Node> {
        let (tx, rx) = mpsc::channel(names.len().max(1));
        let mut scheduled = Vec::with_capacity(names.len());
        for name in names {
            let child = File {
                hash: file.hash.clone(),
                path: file.path.join(name),
                mask: file.mask,
                stdin: false,
            };
            let (stx, srx) = oneshot::channel();
            scheduled.push(srx);
            let walker = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let node = walker.walk(child, true, Sched::new(stx)).await;
                let _ = tx.send(node).await;
            });
        }
        drop(tx);
        for srx in scheduled {
            let _ = srx.await;
        }
        rx
    }
}

/// Standard input is hashed as regular-file data. It carries no stat
/// metadata, so masks that would need it are rejected rather than guessed.
async fn walk_stdin(mut file: File, mut sched: Sched) -> Node {
    sched.fire();
    if file.mask.attr.intersects(Attr::STAT | Attr::INCLUSIVE) {
        return Node::error(file, EngineError::NoStat);
    }
    if file.mask.attr.contains(Attr::XATTR) {
        return Node::error(file, EngineError::NoXattr);
    }
    file.mask.attr.remove(Attr::NO_NAME);
    let mut stdin = tokio::io::stdin();
    match file.hash.data(&mut stdin).await {
        Ok(sum) => Node {
            file,
            sum,
            mode: EntryKind::Regular.type_bits(),
            kind: EntryKind::Regular,
            sys: None,
            xattr: None,
            err: None,
        },
        Err(e) => err_node("hash", file, false, e.into()),
    }
}

fn err_node(verb: &'static str, file: File, subdir: bool, err: EngineError) -> Node {
    let err = EngineError::at(verb, &file.path, subdir, err);
    Node::error(file, err)
}
