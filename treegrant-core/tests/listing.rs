use std::collections::HashSet;
use std::sync::Arc;
use treegrant_core::{
    DocumentRef, ErrorKind, FieldId, GrantManager, InMemoryProvider, ListingService, RawRow,
    TreeHandle, DIRECTORY_MIME, LIST_FILES_CODE,
};

fn handle() -> TreeHandle {
    TreeHandle::parse("tree://providerA/root123").unwrap()
}

fn provider_with(rows: Vec<RawRow>) -> Arc<InMemoryProvider> {
    let provider = Arc::new(InMemoryProvider::new());
    provider.add_tree(&handle(), rows);
    provider
}

#[tokio::test]
async fn test_concrete_listing_scenario() {
    let provider = provider_with(vec![
        RawRow::child("f1", "a.txt", "text/plain"),
        RawRow::child("f2", "sub", DIRECTORY_MIME),
    ]);
    let service = ListingService::new(provider.clone());

    let listing = service
        .list_children("tree://providerA/root123")
        .await
        .unwrap();

    let json = serde_json::to_value(&listing).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"uri": "doc://providerA/root123/f1", "name": "a.txt", "mime": "text/plain"},
            {"uri": "doc://providerA/root123/f2", "name": "sub", "mime": "vnd.provider/directory"}
        ])
    );
    assert!(provider.is_granted(&handle()));
    assert_eq!(provider.open_cursors(), 0);
}

#[tokio::test]
async fn test_empty_tree_yields_empty_listing() {
    let provider = provider_with(vec![]);
    let service = ListingService::new(provider.clone());

    let listing = service
        .list_children("tree://providerA/root123")
        .await
        .unwrap();
    assert!(listing.is_empty());
    assert_eq!(provider.opened_cursors(), 1);
    assert_eq!(provider.open_cursors(), 0);
}

#[tokio::test]
async fn test_row_order_and_reference_derivation() {
    let ids: Vec<String> = (0..25).rev().map(|i| format!("doc-{i}")).collect();
    let rows = ids
        .iter()
        .map(|id| RawRow::child(id, &format!("{id}.bin"), "application/octet-stream"))
        .collect();
    let service = ListingService::new(provider_with(rows));

    let listing = service
        .list_children("tree://providerA/root123")
        .await
        .unwrap();

    assert_eq!(listing.len(), ids.len());
    let mut seen = HashSet::new();
    for (record, id) in listing.iter().zip(&ids) {
        let reference = DocumentRef::parse(&record.reference).unwrap();
        assert_eq!(reference.document_id(), id);
        assert_eq!(reference.tree(), handle());
        assert_eq!(record.reference, DocumentRef::new(&handle(), id).to_string());
        assert!(seen.insert(record.reference.clone()));
    }
}

#[tokio::test]
async fn test_unopenable_query_is_query_unavailable() {
    let provider = provider_with(vec![RawRow::child("f1", "a.txt", "text/plain")]);
    provider.set_null_results(true);
    let service = ListingService::new(provider.clone());

    let err = service
        .list_children("tree://providerA/root123")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueryUnavailable);
    assert_eq!(err.envelope().code, LIST_FILES_CODE);
    assert_eq!(provider.open_cursors(), 0);
}

#[tokio::test]
async fn test_malformed_handle_makes_no_grant_request() {
    let provider = provider_with(vec![]);
    let service = ListingService::new(provider.clone());

    let err = service.list_children("not-a-uri").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedHandle);
    assert_eq!(provider.grant_requests(), 0);
    assert_eq!(provider.opened_cursors(), 0);
    assert!(!provider.is_granted(&handle()));
}

#[tokio::test]
async fn test_missing_field_fails_entire_listing() {
    let provider = provider_with(vec![
        RawRow::child("f1", "a.txt", "text/plain"),
        RawRow::child("f2", "b.txt", "text/plain"),
        RawRow::new()
            .with(FieldId::DocumentId, "f3")
            .with(FieldId::MimeType, "text/plain"),
    ]);
    let service = ListingService::new(provider.clone());

    let err = service
        .list_children("tree://providerA/root123")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRow);
    let envelope = err.envelope();
    assert_eq!(envelope.code, LIST_FILES_CODE);
    assert!(envelope.message.contains("_display_name"));
    assert_eq!(provider.open_cursors(), 0);
}

#[tokio::test]
async fn test_repeated_listing_regrants_idempotently() {
    let provider = provider_with(vec![RawRow::child("f1", "a.txt", "text/plain")]);
    let service = ListingService::new(provider.clone());
    let grants = GrantManager::new(provider.clone());

    service.list_children("tree://providerA/root123").await.unwrap();
    let after_first = grants.granted().await.unwrap();
    service.list_children("tree://providerA/root123").await.unwrap();
    let after_second = grants.granted().await.unwrap();

    assert_eq!(after_first, after_second);
    assert_eq!(provider.grant_requests(), 2);
}

#[tokio::test]
async fn test_concurrent_listings_do_not_interfere() {
    let provider = Arc::new(InMemoryProvider::new());
    let other = TreeHandle::parse("tree://providerA/other").unwrap();
    provider.add_tree(&handle(), vec![RawRow::child("f1", "a.txt", "text/plain")]);
    provider.add_tree(&other, vec![RawRow::child("g1", "g.txt", "text/plain")]);
    let service = ListingService::new(provider.clone());

    let mut tasks = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        let input = if i % 2 == 0 {
            "tree://providerA/root123"
        } else {
            "tree://providerA/other"
        };
        tasks.push(tokio::spawn(async move { service.list_children(input).await }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let listing = task.await.unwrap().unwrap();
        let expected = if i % 2 == 0 { "a.txt" } else { "g.txt" };
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, expected);
    }
    assert_eq!(provider.open_cursors(), 0);
    assert_eq!(provider.grant_requests(), 16);
}
