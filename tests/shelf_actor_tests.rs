mod common;

use common::{Harness, draft};
use shelfbank::remote::{RemoteStore, SharedRemote};
use shelfbank::service::{ShelfHandle, ShelfSlot};
use shelfbank::types::BookEntry;
use std::time::Duration;

/// Poll the shelf until `done` holds or a second has passed.
async fn wait_for(shelf: &ShelfHandle, done: impl Fn(&[BookEntry]) -> bool) -> Vec<BookEntry> {
    for _ in 0..100 {
        let books = shelf.snapshot().await.expect("snapshot failed");
        if done(&books) {
            return books;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shelf.snapshot().await.expect("snapshot failed")
}

#[tokio::test]
async fn listener_applies_changes_made_elsewhere() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;
    let remote: SharedRemote = h.remote.clone();
    let slot = ShelfSlot::new();

    let (shelf, fresh) = slot.open(&session, &remote).await.expect("open failed");
    assert!(fresh);
    assert!(wait_for(&shelf, |b| b.is_empty()).await.is_empty());

    let key = h
        .remote
        .push_book(&session.remote_uid, &draft("Hyperion").into_remote(None))
        .await
        .expect("push failed");
    let books = wait_for(&shelf, |b| b.len() == 1).await;
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].remote_key.as_deref(), Some(key.as_str()));

    h.remote
        .delete_book(&session.remote_uid, &key)
        .await
        .expect("delete failed");
    assert!(wait_for(&shelf, |b| b.is_empty()).await.is_empty());

    slot.close().await;
}

#[tokio::test]
async fn reopening_for_same_user_reuses_shelf() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;
    let remote: SharedRemote = h.remote.clone();
    let slot = ShelfSlot::new();

    let (_, fresh) = slot.open(&session, &remote).await.expect("open failed");
    assert!(fresh);
    let (_, fresh) = slot.open(&session, &remote).await.expect("reopen failed");
    assert!(!fresh);

    slot.close().await;
    assert!(slot.current().await.is_none());
}

#[tokio::test]
async fn local_rows_show_until_remote_arrives_and_search_filters() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;
    h.library.add_book(&session, draft("Dune"), None).await.expect("add");
    h.library.add_book(&session, draft("Hyperion"), None).await.expect("add");

    let shelf = ShelfHandle::spawn(session.user_id).await.expect("spawn failed");
    shelf
        .load_local(h.library.local_shelf(&session).await.expect("list"))
        .expect("cast failed");
    assert_eq!(shelf.snapshot().await.expect("snapshot").len(), 2);

    let hits = shelf.search("DUNE").await.expect("search failed");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Dune");
    assert_eq!(shelf.search("  ").await.expect("search failed").len(), 2);

    let remote = h.library.remote_books(&session).await.expect("remote list");
    shelf.apply_remote(remote).expect("cast failed");
    let merged = shelf.snapshot().await.expect("snapshot");
    assert_eq!(merged.len(), 2);
    assert!(merged.iter().all(|b| b.local_id.is_some()));

    let gone = merged[0].remote_key.clone().expect("key");
    shelf.removed(gone.as_str()).expect("cast failed");
    assert_eq!(shelf.snapshot().await.expect("snapshot").len(), 1);
    shelf.stop();
}
