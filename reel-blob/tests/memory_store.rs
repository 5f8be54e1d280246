use bytes::Bytes;
use futures::StreamExt;
use reel_blob::prelude::*;

fn body_of(data: &[u8]) -> ByteStream {
    let chunks: Vec<Result<Bytes, std::io::Error>> = data
        .chunks(128)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(futures::stream::iter(chunks))
}

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn read_all(result: GetResult) -> Vec<u8> {
    let mut stream = result.stream;
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

fn found(outcome: GetOutcome) -> GetResult {
    match outcome {
        GetOutcome::Found(result) => result,
        other => panic!("expected content, got {other:?}"),
    }
}

fn adapter() -> BlobAdapter {
    BlobAdapter::new(MemoryBlobStore::new(), BlobConfig::default())
}

#[tokio::test]
async fn put_then_get_returns_same_bytes_and_metadata() {
    let blobs = adapter();
    let data = sample(1000);

    let put = blobs
        .put("a.mp4", "video/mp4", Some(1000), body_of(&data))
        .await
        .unwrap();
    assert_eq!(put.size_bytes, 1000);

    let result = found(blobs.open("a.mp4", GetOptions::new()).await.unwrap());
    assert!(!result.is_partial());
    assert_eq!(result.content_length(), 1000);
    assert_eq!(result.head.content_type.as_deref(), Some("video/mp4"));
    assert_eq!(result.head.etag, put.etag);
    assert_eq!(read_all(result).await, data);
}

#[tokio::test]
async fn bounded_range_returns_slice() {
    let blobs = adapter();
    let data = sample(1000);
    blobs.put("a.mp4", "video/mp4", None, body_of(&data)).await.unwrap();

    let options = GetOptions::new().with_range(ByteRange::inclusive(0, 99).unwrap());
    let result = found(blobs.open("a.mp4", options).await.unwrap());

    let range = result.resolved_range.unwrap();
    assert_eq!(range.content_range(), "bytes 0-99/1000");
    assert_eq!(read_all(result).await, data[..100]);
}

#[tokio::test]
async fn range_end_past_object_is_clamped() {
    let blobs = adapter();
    let data = sample(1000);
    blobs.put("a.mp4", "video/mp4", None, body_of(&data)).await.unwrap();

    let options = GetOptions::new().with_range(ByteRange::inclusive(0, 99_999).unwrap());
    let result = found(blobs.open("a.mp4", options).await.unwrap());

    assert_eq!(result.resolved_range.unwrap().content_range(), "bytes 0-999/1000");
    assert_eq!(read_all(result).await.len(), 1000);
}

#[tokio::test]
async fn offset_past_end_serves_full_object() {
    let blobs = adapter();
    let data = sample(1000);
    blobs.put("a.mp4", "video/mp4", None, body_of(&data)).await.unwrap();

    let options = GetOptions::new().with_range(ByteRange::from_offset(1000));
    let result = found(blobs.open("a.mp4", options).await.unwrap());

    assert!(!result.is_partial());
    assert_eq!(read_all(result).await, data);
}

#[tokio::test]
async fn conditional_reads_follow_etag() {
    let blobs = adapter();
    let put = blobs
        .put("a.mp4", "video/mp4", None, body_of(b"hello"))
        .await
        .unwrap();
    let etag = put.etag.unwrap();

    let not_modified = GetOptions::new()
        .with_conditions(Conditions::new().with_if_none_match(format!("\"{etag}\"")));
    assert!(matches!(
        blobs.open("a.mp4", not_modified).await.unwrap(),
        GetOutcome::NotModified { etag: Some(ref e) } if *e == etag
    ));

    let failed = GetOptions::new().with_conditions(Conditions::new().with_if_match("\"other\""));
    assert!(matches!(
        blobs.open("a.mp4", failed).await.unwrap(),
        GetOutcome::PreconditionFailed { .. }
    ));

    let matching = GetOptions::new()
        .with_conditions(Conditions::new().with_if_match(format!("\"{etag}\"")));
    let result = found(blobs.open("a.mp4", matching).await.unwrap());
    assert_eq!(read_all(result).await, b"hello");
}

#[tokio::test]
async fn overwrite_replaces_content_and_etag() {
    let blobs = adapter();
    let first = blobs.put("k", "text/plain", None, body_of(b"first")).await.unwrap();
    let second = blobs
        .put("k", "application/json", None, body_of(b"second!"))
        .await
        .unwrap();
    assert_ne!(first.etag, second.etag);

    let result = found(blobs.open("k", GetOptions::new()).await.unwrap());
    assert_eq!(result.head.size_bytes, 7);
    assert_eq!(result.head.content_type.as_deref(), Some("application/json"));
    assert_eq!(result.head.etag, second.etag);
    assert_eq!(read_all(result).await, b"second!");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let blobs = adapter();
    blobs.put("k", "text/plain", None, body_of(b"x")).await.unwrap();

    blobs.delete("k").await.unwrap();
    blobs.delete("k").await.unwrap();

    let err = blobs.open("k", GetOptions::new()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn failing_stream_leaves_no_object() {
    let store = MemoryBlobStore::new();
    let blobs = BlobAdapter::new(store.clone(), BlobConfig::default());

    let broken: ByteStream = Box::pin(futures::stream::iter(vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::other("client went away")),
    ]));
    let err = blobs.put("k", "video/mp4", None, broken).await.unwrap_err();

    assert!(matches!(err, BlobError::Io { .. }));
    assert!(!store.contains("k").await);
}

#[tokio::test]
async fn oversized_upload_is_rejected_without_object() {
    let store = MemoryBlobStore::new();
    let blobs = BlobAdapter::new(store.clone(), BlobConfig::new().with_max_blob_bytes(100));

    let err = blobs
        .put("big", "video/mp4", None, body_of(&sample(500)))
        .await
        .unwrap_err();
    assert!(matches!(err, BlobError::TooLarge { max_bytes: 100 }));
    assert!(store.is_empty().await);

    let err = blobs
        .put("big", "video/mp4", Some(500), body_of(&sample(500)))
        .await
        .unwrap_err();
    assert!(matches!(err, BlobError::TooLarge { .. }));
}

#[tokio::test]
async fn empty_key_is_invalid() {
    let blobs = adapter();

    let err = blobs.put("", "video/mp4", None, body_of(b"x")).await.unwrap_err();
    assert!(matches!(err, BlobError::Invalid { .. }));
    assert!(matches!(blobs.delete("").await.unwrap_err(), BlobError::Invalid { .. }));
}

#[tokio::test]
async fn empty_object_round_trips() {
    let blobs = adapter();
    blobs.put("empty", "text/plain", None, body_of(b"")).await.unwrap();

    let options = GetOptions::new().with_range(ByteRange::inclusive(0, 10).unwrap());
    let result = found(blobs.open("empty", options).await.unwrap());
    assert!(!result.is_partial());
    assert_eq!(result.content_length(), 0);
    assert!(read_all(result).await.is_empty());
}
