//! End-to-end engine scenarios over real temporary trees.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use xsum::{Attr, File, Hash, Mask, Node, Sum};

fn input(hash: &Hash, path: impl Into<std::path::PathBuf>, mask: Mask) -> File {
    File::new(hash.clone(), path, mask)
}

async fn walk_one(hash: &Hash, path: &Path, mask: Mask) -> Node {
    let nodes = Sum::new(false)
        .collect(vec![input(hash, path, mask)])
        .await
        .unwrap();
    assert_eq!(nodes.len(), 1);
    nodes.into_iter().next().unwrap()
}

#[tokio::test]
async fn regular_file_known_digests() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "hello\n").unwrap();

    let sha1 = Hash::named("sha1").unwrap();
    let node = walk_one(&sha1, &path, Mask::default()).await;
    assert_eq!(
        node.sum_hex(),
        "f572d396fae9206628714fb2ce00f72e94f2258f"
    );
    // Non-inclusive regular files emit the bare digest.
    assert_eq!(node.display_string(), node.sum_hex());

    let sha256 = Hash::named("sha256").unwrap();
    let node = walk_one(&sha256, &path, Mask::default()).await;
    assert_eq!(
        node.sum_hex(),
        "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
    );
}

#[tokio::test]
async fn directory_digest_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let d = dir.path().join("d");
    fs::create_dir(&d).unwrap();
    fs::write(d.join("b"), "1").unwrap();
    fs::write(d.join("a"), "2").unwrap();

    let hash = Hash::named("sha256").unwrap();
    let first = walk_one(&hash, &d, Mask::default()).await;
    let second = walk_one(&hash, &d, Mask::default()).await;
    assert_eq!(first.sum, second.sum);
    assert_eq!(
        first.display_string(),
        format!("sha256:{}:0000", first.sum_hex())
    );

    fs::write(d.join("b"), "changed").unwrap();
    let third = walk_one(&hash, &d, Mask::default()).await;
    assert_ne!(first.sum, third.sum);
}

#[tokio::test]
async fn identical_trees_hash_identically() {
    let hash = Hash::named("sha256").unwrap();
    let mut sums = Vec::new();
    for _ in 0..2 {
        let dir = TempDir::new().unwrap();
        let d = dir.path().join("tree");
        fs::create_dir(&d).unwrap();
        fs::create_dir(d.join("sub")).unwrap();
        fs::write(d.join("sub").join("x"), "deep").unwrap();
        fs::write(d.join("top"), "shallow").unwrap();
        let node = walk_one(&hash, &d, Mask::default()).await;
        sums.push(node.sum);
    }
    assert_eq!(sums[0], sums[1]);
}

#[tokio::test]
async fn portable_digest_ignores_names() {
    let hash = Hash::named("sha256").unwrap();
    let portable = Mask::new(0, Attr::NO_NAME);

    let dir = TempDir::new().unwrap();
    let d1 = dir.path().join("d1");
    fs::create_dir(&d1).unwrap();
    fs::write(d1.join("a"), "same-bytes").unwrap();
    let d2 = dir.path().join("d2");
    fs::create_dir(&d2).unwrap();
    fs::write(d2.join("renamed"), "same-bytes").unwrap();

    let n1 = walk_one(&hash, &d1, portable).await;
    let n2 = walk_one(&hash, &d2, portable).await;
    assert_eq!(n1.sum, n2.sum);

    // Without the portable flag the names separate the digests.
    let n1 = walk_one(&hash, &d1, Mask::default()).await;
    let n2 = walk_one(&hash, &d2, Mask::default()).await;
    assert_ne!(n1.sum, n2.sum);
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_and_file_with_same_bytes_differ() {
    let hash = Hash::named("sha256").unwrap();

    // `s` is a symlink whose target path is "target"; in the sibling tree
    // `s` is a regular file whose bytes are "target".
    let dir = TempDir::new().unwrap();
    let d1 = dir.path().join("d1");
    fs::create_dir(&d1).unwrap();
    std::os::unix::fs::symlink("target", d1.join("s")).unwrap();
    let d2 = dir.path().join("d2");
    fs::create_dir(&d2).unwrap();
    fs::write(d2.join("s"), "target").unwrap();

    let n1 = walk_one(&hash, &d1, Mask::default()).await;
    let n2 = walk_one(&hash, &d2, Mask::default()).await;
    assert_ne!(n1.sum, n2.sum);
}

#[cfg(unix)]
#[tokio::test]
async fn followed_symlink_reports_link_path() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.txt");
    fs::write(&target, "hello\n").unwrap();
    let link = dir.path().join("s");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let hash = Hash::named("sha256").unwrap();
    let node = walk_one(&hash, &link, Mask::default()).await;
    // Digest of the target's data, surfaced under the link's path.
    assert_eq!(
        node.sum_hex(),
        "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
    );
    assert_eq!(node.file.path, link);
}

#[tokio::test]
async fn inclusive_digest_embeds_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "hello\n").unwrap();

    let hash = Hash::named("sha256").unwrap();
    let plain = walk_one(&hash, &path, Mask::default()).await;
    let inclusive = walk_one(&hash, &path, Mask::new(0o644, Attr::INCLUSIVE)).await;

    assert_ne!(plain.sum, inclusive.sum);
    assert_eq!(
        inclusive.display_string(),
        format!("sha256:{}:0644+i", inclusive.sum_hex())
    );
    assert_eq!(
        inclusive.hex_string(),
        format!("sha256:{}:a1a40100", inclusive.sum_hex())
    );
}

#[tokio::test]
async fn mask_bits_change_inclusive_digest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.txt");
    fs::write(&path, "hello\n").unwrap();

    let hash = Hash::named("sha256").unwrap();
    let base = walk_one(&hash, &path, Mask::new(0, Attr::INCLUSIVE)).await;
    let with_uid = walk_one(&hash, &path, Mask::new(0, Attr::INCLUSIVE | Attr::UID)).await;
    let with_mtime = walk_one(&hash, &path, Mask::new(0, Attr::INCLUSIVE | Attr::MTIME)).await;

    assert_ne!(base.sum, with_uid.sum);
    assert_ne!(base.sum, with_mtime.sum);
    assert_ne!(with_uid.sum, with_mtime.sum);
}

#[tokio::test]
async fn no_data_digest_ignores_contents() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, "completely different").unwrap();
    fs::write(&b, "bytes entirely").unwrap();

    let hash = Hash::named("sha256").unwrap();
    let mask = Mask::new(0, Attr::INCLUSIVE | Attr::NO_DATA);
    let na = walk_one(&hash, &a, mask).await;
    let nb = walk_one(&hash, &b, mask).await;
    assert_eq!(na.sum, nb.sum);

    let with_data = walk_one(&hash, &a, Mask::new(0, Attr::INCLUSIVE)).await;
    assert_ne!(na.sum, with_data.sum);
}

#[tokio::test]
async fn missing_entry_error_shape() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.txt");

    let hash = Hash::named("sha256").unwrap();
    let err = Sum::new(false)
        .collect(vec![input(&hash, &missing, Mask::default())])
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.starts_with(&format!("{}: ", missing.display())),
        "unexpected message: {msg}"
    );
}

#[tokio::test]
async fn rejected_directory_error() {
    let dir = TempDir::new().unwrap();
    let d = dir.path().join("d");
    fs::create_dir(&d).unwrap();

    let hash = Hash::named("sha256").unwrap();
    let err = Sum::new(true)
        .collect(vec![input(&hash, &d, Mask::default())])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), format!("{}: is a directory", d.display()));
}

#[tokio::test]
async fn child_error_becomes_parent_error() {
    let dir = TempDir::new().unwrap();
    let d = dir.path().join("d");
    fs::create_dir(&d).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink("dangling-target", d.join("s")).unwrap();
    #[cfg(unix)]
    {
        // A dangling symlink hashes fine without follow; with follow forced
        // the child fails and the parent inherits the error.
        let hash = Hash::named("sha256").unwrap();
        let ok = walk_one(&hash, &d, Mask::default()).await;
        assert!(ok.err.is_none());

        let err = Sum::new(false)
            .collect(vec![input(&hash, &d, Mask::new(0, Attr::FOLLOW))])
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(
            msg.starts_with(&format!("{}: ", d.display())),
            "unexpected message: {msg}"
        );
        assert!(msg.contains("failed to"), "unexpected message: {msg}");
    }
}

#[tokio::test]
async fn callback_error_stops_iteration() {
    let dir = TempDir::new().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.path().join(name), name).unwrap();
    }
    let hash = Hash::named("sha256").unwrap();
    let files = vec![
        input(&hash, dir.path().join("a"), Mask::default()),
        input(&hash, dir.path().join("b"), Mask::default()),
        input(&hash, dir.path().join("c"), Mask::default()),
    ];

    let mut seen = 0;
    let err = Sum::new(false)
        .each_list(files, |_node| {
            seen += 1;
            if seen == 2 {
                return Err(xsum::EngineError::Canceled);
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(seen, 2);
    assert_eq!(err.to_string(), "walk canceled");
}
