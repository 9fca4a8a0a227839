mod common;

use common::{Harness, draft};
use shelfbank::ShelfError;
use shelfbank::session::Session;
use std::collections::HashSet;

async fn shelf_of(h: &Harness, count: usize) -> (Session, Vec<String>) {
    let session = h.signed_in("ada@example.com").await;
    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let entry = h
            .library
            .add_book(&session, draft(&format!("Book {i}")), None)
            .await
            .expect("add failed");
        keys.push(entry.remote_key.expect("key"));
    }
    keys.sort();
    (session, keys)
}

async fn walk(h: &Harness, session: &Session, size: usize) -> Vec<Vec<String>> {
    let mut pages = Vec::new();
    let mut after: Option<String> = None;
    loop {
        let page = h
            .library
            .page(session, size, after.as_deref())
            .await
            .expect("page failed");
        assert!(page.books.len() <= size);
        pages.push(page.books.iter().map(|e| e.key.clone()).collect());
        match page.next_key {
            Some(next) => after = Some(next),
            None => break,
        }
        assert!(pages.len() <= 100, "pagination did not terminate");
    }
    pages
}

#[tokio::test]
async fn pages_cover_every_record_once_in_key_order() {
    let h = Harness::new().await;
    let (session, keys) = shelf_of(&h, 25).await;

    let pages = walk(&h, &session, 10).await;
    let sizes: Vec<usize> = pages.iter().map(Vec::len).collect();
    assert_eq!(sizes, [10, 10, 5]);

    let seen: Vec<String> = pages.into_iter().flatten().collect();
    assert_eq!(seen, keys);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), keys.len());
}

#[tokio::test]
async fn exact_multiple_ends_without_empty_page() {
    let h = Harness::new().await;
    let (session, keys) = shelf_of(&h, 20).await;

    let pages = walk(&h, &session, 10).await;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages.concat(), keys);
}

#[tokio::test]
async fn next_key_only_when_more_records_exist() {
    let h = Harness::new().await;
    let (session, keys) = shelf_of(&h, 3).await;

    let first = h.library.page(&session, 2, None).await.expect("page");
    assert_eq!(first.next_key.as_deref(), Some(keys[1].as_str()));

    let last = h
        .library
        .page(&session, 2, first.next_key.as_deref())
        .await
        .expect("page");
    assert_eq!(last.books.len(), 1);
    assert_eq!(last.books[0].key, keys[2]);
    assert!(last.next_key.is_none());
}

#[tokio::test]
async fn empty_shelf_has_one_empty_page() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;

    let page = h.library.page(&session, 10, None).await.expect("page");
    assert!(page.books.is_empty());
    assert!(page.next_key.is_none());
}

#[tokio::test]
async fn boundary_deleted_between_pages_loses_nothing() {
    let h = Harness::new().await;
    let (session, keys) = shelf_of(&h, 5).await;

    let first = h.library.page(&session, 2, None).await.expect("page");
    let boundary = first.next_key.clone().expect("next key");
    h.library
        .delete_book(&session, &boundary)
        .await
        .expect("delete");

    let second = h
        .library
        .page(&session, 2, Some(&boundary))
        .await
        .expect("page");
    let got: Vec<&str> = second.books.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(got, [keys[2].as_str(), keys[3].as_str()]);
}

#[tokio::test]
async fn zero_page_size_is_rejected() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;

    assert!(matches!(
        h.library.page(&session, 0, None).await,
        Err(ShelfError::Validation(_))
    ));
}
