//! Store-level integration tests
//!
//! Exercises the store facade end to end against a temporary root:
//! round-trips, deletion semantics, browsing, containment, and concurrent
//! same-path uploads.

use std::sync::Arc;

use filedepot_server::Store;
use filedepot_server::error::StoreError;

fn open_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    (dir, store)
}

async fn upload_bytes(store: &Store, path: &str, content: &[u8]) -> Result<u64, StoreError> {
    let mut reader = content;
    store.upload(path, &mut reader).await
}

fn download_bytes(store: &Store, path: &str) -> Vec<u8> {
    use std::io::Read;
    let (mut file, len) = store.download(path).unwrap();
    let mut content = Vec::new();
    file.read_to_end(&mut content).unwrap();
    assert_eq!(content.len() as u64, len);
    content
}

#[tokio::test]
async fn upload_then_download_round_trips() {
    let (_dir, store) = open_store();

    let written = upload_bytes(&store, "a/b.txt", b"hi").await.unwrap();
    assert_eq!(written, 2);
    assert_eq!(download_bytes(&store, "a/b.txt"), b"hi");
}

#[tokio::test]
async fn upload_overwrites_existing_content() {
    let (_dir, store) = open_store();

    upload_bytes(&store, "note.txt", b"first").await.unwrap();
    upload_bytes(&store, "note.txt", b"second").await.unwrap();
    assert_eq!(download_bytes(&store, "note.txt"), b"second");
}

#[tokio::test]
async fn upload_creates_intermediate_directories() {
    let (_dir, store) = open_store();

    upload_bytes(&store, "x/y/z/deep.bin", b"payload")
        .await
        .unwrap();
    assert_eq!(store.list_all().unwrap(), vec!["x/y/z/deep.bin"]);
}

#[tokio::test]
async fn download_of_missing_path_is_not_found() {
    let (_dir, store) = open_store();

    assert!(matches!(
        store.download("missing.txt"),
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_removes_the_file_from_listings() {
    let (_dir, store) = open_store();

    upload_bytes(&store, "docs/kept.txt", b"keep").await.unwrap();
    upload_bytes(&store, "docs/gone.txt", b"drop").await.unwrap();

    store.delete("docs/gone.txt").await.unwrap();
    assert_eq!(store.list_all().unwrap(), vec!["docs/kept.txt"]);
}

#[tokio::test]
async fn delete_of_missing_path_is_not_found() {
    let (_dir, store) = open_store();

    assert!(matches!(
        store.delete("never-existed.txt").await,
        Err(StoreError::NotFound(_))
    ));

    upload_bytes(&store, "once.txt", b"x").await.unwrap();
    store.delete("once.txt").await.unwrap();
    assert!(matches!(
        store.delete("once.txt").await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn browse_of_empty_root_has_no_parent_and_no_entries() {
    let (_dir, store) = open_store();

    let view = store.browse("").unwrap();
    assert_eq!(view.parent, None);
    assert!(view.directories.is_empty());
    assert!(view.files.is_empty());
}

#[tokio::test]
async fn browse_lists_uploaded_files_with_navigable_paths() {
    let (_dir, store) = open_store();
    upload_bytes(&store, "a/b.txt", b"hi").await.unwrap();

    let view = store.browse("a").unwrap();
    assert_eq!(view.parent, Some(String::new()));
    assert!(view.directories.is_empty());
    assert_eq!(view.files.len(), 1);
    assert_eq!(view.files[0].name, "b.txt");
    assert_eq!(view.files[0].path, "a/b.txt");

    let root_view = store.browse("").unwrap();
    assert_eq!(root_view.parent, None);
    assert_eq!(root_view.directories.len(), 1);
    assert_eq!(root_view.directories[0].path, "a");
}

#[tokio::test]
async fn browse_of_file_is_not_directory() {
    let (_dir, store) = open_store();
    upload_bytes(&store, "plain.txt", b"x").await.unwrap();

    assert!(matches!(
        store.browse("plain.txt"),
        Err(StoreError::NotDirectory(_))
    ));
}

#[tokio::test]
async fn escaping_paths_are_rejected_before_any_storage_access() {
    let (_dir, store) = open_store();

    for path in ["../evil.txt", "a/../../etc/passwd", "/etc/passwd", ".."] {
        assert!(
            matches!(
                upload_bytes(&store, path, b"x").await,
                Err(StoreError::PathEscape(_))
            ),
            "upload accepted {:?}",
            path
        );
        assert!(matches!(
            store.delete(path).await,
            Err(StoreError::PathEscape(_))
        ));
        assert!(matches!(
            store.download(path),
            Err(StoreError::PathEscape(_))
        ));
    }

    // Nothing may have been created outside or inside the root.
    assert!(store.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn list_all_walks_nested_directories_in_sorted_order() {
    let (_dir, store) = open_store();

    upload_bytes(&store, "b.txt", b"1").await.unwrap();
    upload_bytes(&store, "a/one.txt", b"2").await.unwrap();
    upload_bytes(&store, "a/sub/two.txt", b"3").await.unwrap();

    assert_eq!(
        store.list_all().unwrap(),
        vec!["a/one.txt", "a/sub/two.txt", "b.txt"]
    );
}

#[tokio::test]
async fn concurrent_same_path_uploads_leave_one_full_payload() {
    let (_dir, store) = open_store();
    let store = Arc::new(store);

    let first = vec![b'A'; 64 * 1024];
    let second = vec![b'B'; 64 * 1024];

    let mut tasks = Vec::new();
    for payload in [first.clone(), second.clone()] {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let mut reader = payload.as_slice();
            store.upload("contested.bin", &mut reader).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = download_bytes(&store, "contested.bin");
    assert!(
        stored == first || stored == second,
        "stored content mixes payloads"
    );
}

#[tokio::test]
async fn concurrent_distinct_path_uploads_all_land() {
    let (_dir, store) = open_store();
    let store = Arc::new(store);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let payload = format!("payload-{}", i).into_bytes();
            let mut reader = payload.as_slice();
            store
                .upload(&format!("many/file-{}.txt", i), &mut reader)
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.list_all().unwrap().len(), 8);
}

#[tokio::test]
async fn aborted_upload_leaves_no_trace() {
    let (_dir, store) = open_store();

    // A reader that fails after the first chunk.
    struct FailingReader {
        fed: bool,
    }
    impl tokio::io::AsyncRead for FailingReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.fed {
                return std::task::Poll::Ready(Err(std::io::Error::other("link dropped")));
            }
            self.fed = true;
            buf.put_slice(b"partial");
            std::task::Poll::Ready(Ok(()))
        }
    }

    let result = store.upload("wip.bin", &mut FailingReader { fed: false }).await;
    assert!(matches!(result, Err(StoreError::Io(_))));

    // Neither the target nor its temporary may remain visible.
    assert!(store.list_all().unwrap().is_empty());
    assert!(matches!(
        store.download("wip.bin"),
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn aborted_overwrite_keeps_the_previous_content() {
    let (_dir, store) = open_store();
    upload_bytes(&store, "stable.txt", b"original").await.unwrap();

    struct DeadReader;
    impl tokio::io::AsyncRead for DeadReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("link dropped")))
        }
    }

    assert!(store.upload("stable.txt", &mut DeadReader).await.is_err());
    assert_eq!(download_bytes(&store, "stable.txt"), b"original");
}
