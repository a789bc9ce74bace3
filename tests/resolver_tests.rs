//! Integration tests for tag resource resolution.
//!
//! Uses wiremock for `image_url` content and tempfile for file, asset and
//! cache directories.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vap_bridge::resolver::{
    ContentResolver, ImageCache, ResolveError, ResourceProvider, ResourceSettings, TagStore,
};
use vap_bridge::Content;

/// A 2x2 transparent PNG.
fn png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::new_rgba8(2, 2)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

struct Fixture {
    _storage: TempDir,
    cache: TempDir,
    store: TagStore,
    resolver: ContentResolver,
}

fn fixture(with_cache: bool) -> Fixture {
    let storage = TempDir::new().expect("Failed to create temp dir");
    let cache = TempDir::new().expect("Failed to create temp dir");
    std::fs::create_dir_all(storage.path().join("assets")).unwrap();
    std::fs::write(storage.path().join("avatar.png"), png_bytes()).unwrap();
    std::fs::write(storage.path().join("assets/head.png"), png_bytes()).unwrap();
    std::fs::write(storage.path().join("notes.txt"), b"hello").unwrap();

    let settings = ResourceSettings {
        storage_dir: storage.path().to_path_buf(),
        asset_root: storage.path().to_path_buf(),
        cache_dir: with_cache.then(|| cache.path().to_path_buf()),
        ..Default::default()
    };
    let store: TagStore = Arc::new(Mutex::new(HashMap::new()));
    let resolver = ContentResolver::new(store.clone(), settings).unwrap();
    Fixture {
        _storage: storage,
        cache,
        store,
        resolver,
    }
}

fn set(store: &TagStore, tag: &str, content: Content) {
    store.lock().unwrap().insert(tag.to_string(), content);
}

#[tokio::test]
async fn test_url_image_is_fetched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let f = fixture(false);
    set(
        &f.store,
        "avatar",
        Content::ImageUrl(format!("{}/a.png", mock_server.uri())),
    );
    assert_eq!(
        f.resolver.resolve_image("avatar").await,
        Some(png_bytes())
    );
}

#[tokio::test]
async fn test_url_error_status_yields_none() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let f = fixture(false);
    let url = format!("{}/missing.png", mock_server.uri());
    set(&f.store, "avatar", Content::ImageUrl(url.clone()));
    assert_eq!(f.resolver.resolve_image("avatar").await, None);

    let err = f
        .resolver
        .resolve_content(&Content::ImageUrl(url))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_url_non_image_body_yields_none_and_is_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let f = fixture(true);
    let url = format!("{}/page", mock_server.uri());
    set(&f.store, "avatar", Content::ImageUrl(url.clone()));
    assert_eq!(f.resolver.resolve_image("avatar").await, None);

    let cache = ImageCache::new(f.cache.path().to_path_buf());
    assert!(cache.get(&url).is_none());
}

#[tokio::test]
async fn test_url_served_from_cache_on_second_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let f = fixture(true);
    let url = format!("{}/a.png", mock_server.uri());
    set(&f.store, "avatar", Content::ImageUrl(url.clone()));

    assert!(f.resolver.resolve_image("avatar").await.is_some());
    assert!(f.resolver.resolve_image("avatar").await.is_some());

    let cache = ImageCache::new(f.cache.path().to_path_buf());
    assert_eq!(cache.get(&url), Some(png_bytes()));
    // MockServer verifies the single-request expectation on drop.
}

#[tokio::test]
async fn test_untagged_url_key_is_fetched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/direct.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .mount(&mock_server)
        .await;

    let f = fixture(false);
    let url = format!("{}/direct.png", mock_server.uri());
    assert_eq!(f.resolver.resolve_image(&url).await, Some(png_bytes()));
}

#[tokio::test]
async fn test_local_sources_resolve() {
    let f = fixture(false);
    set(&f.store, "file", Content::ImageFile("avatar.png".into()));
    set(&f.store, "asset", Content::ImageAsset("assets/head.png".into()));
    set(
        &f.store,
        "inline",
        Content::ImageBase64(format!("data:image/png;base64,{}", STANDARD.encode(png_bytes()))),
    );

    for tag in ["file", "asset", "inline"] {
        assert_eq!(
            f.resolver.resolve_image(tag).await,
            Some(png_bytes()),
            "tag: {}",
            tag
        );
    }
}

#[tokio::test]
async fn test_unresolvable_images_yield_none() {
    let f = fixture(false);
    set(&f.store, "gone", Content::ImageFile("nope.png".into()));
    set(&f.store, "text_file", Content::ImageFile("notes.txt".into()));
    set(&f.store, "garbage", Content::ImageBase64("!!not base64!!".into()));
    set(&f.store, "name", Content::text("Alice"));

    for tag in ["gone", "text_file", "garbage", "name", "unset"] {
        assert_eq!(f.resolver.resolve_image(tag).await, None, "tag: {}", tag);
    }
}

#[tokio::test]
async fn test_image_headers_without_data_are_rejected() {
    let f = fixture(false);
    let png = png_bytes();
    let truncated = STANDARD.encode(&png[..png.len() / 2]);
    // The 8-byte PNG signature and a GIF header with one trailing byte.
    let cases = [
        ("signature", "iVBORw0KGgo=".to_string()),
        ("gif_header", "base64:R0lGODlhAA==".to_string()),
        ("truncated", truncated),
    ];
    for (tag, value) in cases {
        set(&f.store, tag, Content::ImageBase64(value.clone()));
        assert_eq!(f.resolver.resolve_image(tag).await, None, "tag: {}", tag);

        let err = f
            .resolver
            .resolve_content(&Content::ImageBase64(value))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotAnImage { .. }), "tag: {}", tag);
    }
}

#[tokio::test]
async fn test_url_image_header_only_is_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stub.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"\x89PNG\r\n\x1a\n"[..]))
        .mount(&mock_server)
        .await;

    let f = fixture(true);
    let url = format!("{}/stub.png", mock_server.uri());
    set(&f.store, "avatar", Content::ImageUrl(url.clone()));
    assert_eq!(f.resolver.resolve_image("avatar").await, None);

    let cache = ImageCache::new(f.cache.path().to_path_buf());
    assert!(cache.get(&url).is_none());
}

#[tokio::test]
async fn test_resolve_text_only_for_text_content() {
    let f = fixture(false);
    set(&f.store, "name", Content::text("Alice"));
    set(&f.store, "avatar", Content::ImageFile("avatar.png".into()));

    assert_eq!(f.resolver.resolve_text("name").as_deref(), Some("Alice"));
    assert_eq!(f.resolver.resolve_text("avatar"), None);
    assert_eq!(f.resolver.resolve_text("unset"), None);

    // The store is shared, so later updates are visible.
    set(&f.store, "name", Content::text("Bob"));
    assert_eq!(f.resolver.resolve_text("name").as_deref(), Some("Bob"));
}
