mod common;

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use bytes::Bytes;
use common::{in_memory_storage, jpeg_fixture, png_fixture, spawn_server};
use media_store::{
    ImportRequest, IngestConfig, MediaService, MediaServiceBuilder, MediaServiceImpl,
    RasterTransformer, StorageProvider,
};

const LIMIT: u64 = 64 * 1024;

#[derive(Clone, Default)]
struct Origin {
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

async fn photo() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/jpeg")], jpeg_fixture(32, 32))
}

async fn declared_oversize() -> impl IntoResponse {
    vec![0u8; LIMIT as usize + 1]
}

async fn streamed_oversize() -> impl IntoResponse {
    let stream = async_stream::stream! {
        for _ in 0..10 {
            yield Ok::<_, Infallible>(Bytes::from(vec![7u8; 16 * 1024]));
        }
    };
    Body::from_stream(stream)
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "too late"
}

async fn stalled() -> impl IntoResponse {
    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Bytes::from(vec![1u8; 1024]));
        tokio::time::sleep(Duration::from_secs(3)).await;
        yield Ok::<_, Infallible>(Bytes::from(vec![2u8; 1024]));
    };
    ([(header::CONTENT_TYPE, "image/jpeg")], Body::from_stream(stream))
}

/// PNG bytes served under a misleading type and name
async fn disguised() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/jpeg")], png_fixture(20, 10))
}

async fn empty() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], Bytes::new())
}

async fn tracked(State(origin): State<Origin>) -> impl IntoResponse {
    let now = origin.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    origin.max_in_flight.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    origin.in_flight.fetch_sub(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/jpeg")], jpeg_fixture(8, 8))
}

async fn spawn_origin(origin: Origin) -> SocketAddr {
    let router = Router::new()
        .route("/", get(photo))
        .route("/images/photo.jpg", get(photo))
        .route("/missing.jpg", get(|| async { StatusCode::NOT_FOUND }))
        .route("/big.bin", get(declared_oversize))
        .route("/stream.bin", get(streamed_oversize))
        .route("/slow.jpg", get(slow))
        .route("/empty.png", get(empty))
        .route("/stalled.jpg", get(stalled))
        .route("/disguised.jpg", get(disguised))
        .route("/tracked/{n}", get(tracked))
        .with_state(origin);
    spawn_server(router).await
}

fn service(storage: Arc<dyn StorageProvider>, ingest: IngestConfig) -> MediaServiceImpl {
    MediaServiceBuilder::new()
        .storage(storage)
        .transformer(Arc::new(RasterTransformer::new()))
        .ingest(ingest)
        .build()
        .unwrap()
}

#[tokio::test]
async fn results_follow_input_order_with_reasons() {
    let addr = spawn_origin(Origin::default()).await;
    let storage = in_memory_storage();
    let service = service(
        storage.clone(),
        IngestConfig {
            concurrency: 3,
            fetch_timeout: Duration::from_millis(500),
        },
    );

    let urls = vec![
        format!("http://{}/images/photo.jpg", addr),
        format!("http://{}/missing.jpg", addr),
        format!("http://{}/big.bin", addr),
        format!("http://{}/stream.bin", addr),
        format!("http://{}/slow.jpg", addr),
        format!("http://{}/empty.png", addr),
        "ftp://example.com/file.jpg".to_string(),
    ];
    let requests = urls.iter().map(|u| ImportRequest::new(u.as_str())).collect();

    let report = service.bulk_import_from_urls(requests, LIMIT).await;

    assert_eq!(report.total, 7);
    assert_eq!(report.success_count, 1);
    let got: Vec<&str> = report.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(got, urls.iter().map(String::as_str).collect::<Vec<_>>());

    let imported = report.results[0].upload().unwrap();
    assert!(imported.object_ref.as_str().starts_with("uploads/"));
    assert!(imported.object_ref.as_str().ends_with("-photo.jpg"));
    assert_eq!(imported.content_type, "image/jpeg");
    assert_eq!((imported.width, imported.height), (Some(32), Some(32)));
    let stored = storage.download_bytes(&imported.object_ref).await.unwrap();
    assert_eq!(stored.len() as u64, imported.size);

    let reasons: Vec<&str> = report.results[1..]
        .iter()
        .map(|r| r.failure_reason().unwrap())
        .collect();
    assert_eq!(reasons[0], "remote server answered 404");
    assert_eq!(reasons[1], format!("file too large: exceeds limit of {} bytes", LIMIT));
    assert_eq!(reasons[2], format!("file too large: exceeds limit of {} bytes", LIMIT));
    assert_eq!(reasons[3], "download timed out");
    assert_eq!(reasons[4], "empty download");
    assert!(reasons[5].starts_with("invalid URL"), "{}", reasons[5]);
}

#[tokio::test]
async fn explicit_and_derived_names() {
    let addr = spawn_origin(Origin::default()).await;
    let service = service(in_memory_storage(), IngestConfig::default());

    let report = service
        .bulk_import_from_urls(
            vec![
                ImportRequest::new(format!("http://{}/images/photo.jpg", addr))
                    .with_filename("cover art.jpg"),
                ImportRequest::new(format!("http://{}/", addr)),
            ],
            LIMIT,
        )
        .await;

    assert_eq!(report.success_count, 2);
    let named = report.results[0].upload().unwrap();
    assert!(named.object_ref.as_str().ends_with("-cover_art.jpg"));

    let derived = report.results[1].upload().unwrap();
    let name = derived.object_ref.file_name();
    assert!(name.contains("download_"), "{}", name);
    assert!(name.ends_with(".jpg"), "{}", name);
}

#[tokio::test]
async fn never_exceeds_the_concurrency_limit() {
    let origin = Origin::default();
    let addr = spawn_origin(origin.clone()).await;
    let service = service(
        in_memory_storage(),
        IngestConfig {
            concurrency: 2,
            ..IngestConfig::default()
        },
    );

    let requests = (0..8)
        .map(|n| ImportRequest::new(format!("http://{}/tracked/{}", addr, n)))
        .collect();
    let report = service.bulk_import_from_urls(requests, LIMIT).await;

    assert_eq!(report.success_count, 8);
    let max = origin.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 2, "saw {} downloads in flight", max);
    assert!(max >= 1);
}

#[tokio::test]
async fn empty_batch_yields_empty_report() {
    let service = service(in_memory_storage(), IngestConfig::default());
    let report = service.bulk_import_from_urls(Vec::new(), LIMIT).await;
    assert_eq!(report.total, 0);
    assert_eq!(report.success_count, 0);
    assert!(report.results.is_empty());
}

#[tokio::test]
async fn body_that_stalls_mid_transfer_times_out() {
    let addr = spawn_origin(Origin::default()).await;
    let service = service(
        in_memory_storage(),
        IngestConfig {
            concurrency: 1,
            fetch_timeout: Duration::from_millis(500),
        },
    );

    let report = service
        .bulk_import_from_urls(
            vec![ImportRequest::new(format!("http://{}/stalled.jpg", addr))],
            LIMIT,
        )
        .await;

    assert_eq!(report.success_count, 0);
    assert_eq!(report.results[0].failure_reason(), Some("download timed out"));
}

#[tokio::test]
async fn stored_bytes_decide_the_content_type() {
    let addr = spawn_origin(Origin::default()).await;
    let service = service(in_memory_storage(), IngestConfig::default());

    let report = service
        .bulk_import_from_urls(
            vec![ImportRequest::new(format!("http://{}/disguised.jpg", addr))],
            LIMIT,
        )
        .await;

    let imported = report.results[0].upload().unwrap();
    assert_eq!(imported.content_type, "image/png");
    assert_eq!((imported.width, imported.height), (Some(20), Some(10)));
}
