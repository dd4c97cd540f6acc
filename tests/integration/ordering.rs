//! Ordering and scheduling guarantees.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::Semaphore;
use xsum::{File, Hash, Mask, Sum};

/// A wide tree whose walk takes measurably longer than a single small file.
fn build_wide_tree(root: &std::path::Path, dirs: usize, files_per_dir: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("d{d}"));
        fs::create_dir(&dir).unwrap();
        for f in 0..files_per_dir {
            fs::write(dir.join(format!("f{f}")), format!("{d}-{f}")).unwrap();
        }
    }
}

#[tokio::test]
async fn results_arrive_in_input_order() {
    let dir = TempDir::new().unwrap();
    let big = dir.path().join("big");
    fs::create_dir(&big).unwrap();
    build_wide_tree(&big, 8, 32);
    let small = dir.path().join("small.txt");
    fs::write(&small, "tiny").unwrap();

    let hash = Hash::named("sha256").unwrap();
    // The large tree is listed first; its walk finishes well after the small
    // file's, but must still be delivered first.
    let files = vec![
        File::new(hash.clone(), &big, Mask::default()),
        File::new(hash.clone(), &small, Mask::default()),
        File::new(hash.clone(), &big, Mask::default()),
        File::new(hash.clone(), &small, Mask::default()),
    ];
    let expected: Vec<_> = files.iter().map(|f| f.path.clone()).collect();

    let nodes = Sum::new(false).collect(files).await.unwrap();
    let got: Vec<_> = nodes.iter().map(|n| n.file.path.clone()).collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn single_permit_does_not_deadlock() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested");
    fs::create_dir(&root).unwrap();
    let mut cur = root.clone();
    for depth in 0..6 {
        fs::write(cur.join("leaf"), format!("depth {depth}")).unwrap();
        cur = cur.join("sub");
        fs::create_dir(&cur).unwrap();
    }
    fs::write(cur.join("leaf"), "bottom").unwrap();

    let hash = Hash::named("sha256").unwrap();
    let narrow = Sum::with_semaphore(false, Arc::new(Semaphore::new(1)));
    let wide = Sum::new(false);

    // Release-before-descent means even one permit can drive a nested tree;
    // a walker holding its permit across descendants would hang here.
    let constrained = tokio::time::timeout(
        Duration::from_secs(60),
        narrow.collect(vec![File::new(hash.clone(), &root, Mask::default())]),
    )
    .await
    .expect("walk deadlocked under a single permit")
    .unwrap();

    let unconstrained = wide
        .collect(vec![File::new(hash.clone(), &root, Mask::default())])
        .await
        .unwrap();

    // Parallelism level never changes the digest.
    assert_eq!(constrained[0].sum, unconstrained[0].sum);
}

#[tokio::test]
async fn streamed_inputs_preserve_order() {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..32 {
        let p = dir.path().join(format!("f{i:02}"));
        fs::write(&p, format!("{i}")).unwrap();
        paths.push(p);
    }

    let hash = Hash::named("sha256").unwrap();
    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let to_send: Vec<File> = paths
        .iter()
        .map(|p| File::new(hash.clone(), p, Mask::default()))
        .collect();
    let feeder = tokio::spawn(async move {
        for f in to_send {
            if tx.send(f).await.is_err() {
                return;
            }
        }
    });

    let mut got = Vec::new();
    Sum::new(false)
        .each_stream(rx, |node| {
            assert!(node.err.is_none());
            got.push(node.file.path.clone());
            Ok(())
        })
        .await
        .unwrap();
    feeder.await.unwrap();
    assert_eq!(got, paths);
}
