mod common;

use common::{dimensions, jpeg_fixture, png_fixture};
use futures::stream;
use media_store::{
    create_in_memory_app, BackendKind, ByteStream, CacheStatus, MediaError, MediaService,
    StorageProvider, TransformParams,
};

fn body(data: bytes::Bytes) -> ByteStream {
    Box::pin(stream::iter(vec![Ok(data)]))
}

#[tokio::test]
async fn upload_transform_delete_flow() {
    let app = create_in_memory_app().unwrap();
    assert_eq!(app.storage.kind(), BackendKind::InMemory);
    let service = app.media_service;

    let upload = service
        .upload_original(body(jpeg_fixture(400, 300)), "holiday photo.jpg")
        .await
        .unwrap();
    assert!(upload.object_ref.as_str().starts_with("uploads/"));
    assert!(upload.object_ref.as_str().ends_with("-holiday_photo.jpg"));
    assert_eq!(upload.content_type, "image/jpeg");
    assert_eq!((upload.width, upload.height), (Some(400), Some(300)));
    assert!(upload.size > 0);

    let cover = service
        .fetch_transformed(
            &upload.object_ref,
            TransformParams::builder()
                .width(150)
                .height(150)
                .fit("cover")
                .quality(80)
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(cover.cache_status, CacheStatus::Miss);
    assert_eq!(dimensions(&cover.data), (150, 150));

    // the preset expands to the same transform, so it shares the cache entry
    let thumbnail = service
        .fetch_transformed(
            &upload.object_ref,
            TransformParams::builder().preset("thumbnail").build(),
        )
        .await
        .unwrap();
    assert!(thumbnail.was_cache_hit());
    assert_eq!(thumbnail.data, cover.data);

    service.delete_object(&upload.object_ref).await.unwrap();
    // deleting twice is a no-op
    service.delete_object(&upload.object_ref).await.unwrap();

    let err = service
        .fetch_transformed(
            &upload.object_ref,
            TransformParams::builder().width(10).fresh(true).build(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn explicit_fields_override_preset() {
    let service = create_in_memory_app().unwrap().media_service;
    let upload = service
        .upload_original(body(jpeg_fixture(400, 300)), "wide.jpg")
        .await
        .unwrap();

    let artifact = service
        .fetch_transformed(
            &upload.object_ref,
            TransformParams::builder().preset("thumbnail").width(100).build(),
        )
        .await
        .unwrap();
    assert_eq!(dimensions(&artifact.data), (100, 150));
}

#[tokio::test]
async fn invalid_params_never_touch_storage() {
    let service = create_in_memory_app().unwrap().media_service;
    let missing = media_store::ObjectRef::new("uploads/absent.jpg").unwrap();

    let err = service
        .fetch_transformed(
            &missing,
            TransformParams::builder()
                .width(-5)
                .quality(101)
                .fit("stretch")
                .build(),
        )
        .await
        .unwrap_err();
    match err {
        MediaError::InvalidTransform(spec_err) => assert_eq!(spec_err.violations.len(), 3),
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[tokio::test]
async fn upload_limits_are_enforced() {
    let service = create_in_memory_app().unwrap().media_service;
    let limit = service.max_upload_size();

    let oversize = bytes::Bytes::from(vec![0u8; limit as usize + 1]);
    let err = service
        .upload_original(body(oversize), "huge.bin")
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::PayloadTooLarge { .. }));
    assert_eq!(err.status_code(), http::StatusCode::PAYLOAD_TOO_LARGE);

    let err = service
        .upload_original(body(bytes::Bytes::new()), "empty.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::EmptyPayload));
}

#[tokio::test]
async fn upload_type_comes_from_the_bytes() {
    let service = create_in_memory_app().unwrap().media_service;

    let upload = service
        .upload_original(body(png_fixture(64, 48)), "misnamed.jpg")
        .await
        .unwrap();
    assert!(upload.object_ref.as_str().ends_with("-misnamed.jpg"));
    assert_eq!(upload.content_type, "image/png");
    assert_eq!((upload.width, upload.height), (Some(64), Some(48)));

    // not an image at all, so the name is all there is to go on
    let clip = service
        .upload_original(body(bytes::Bytes::from_static(b"not really a movie")), "clip.mov")
        .await
        .unwrap();
    assert_eq!(clip.content_type, "video/quicktime");
    assert_eq!(clip.width, None);
}
