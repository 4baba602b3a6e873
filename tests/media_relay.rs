// tests/media_relay.rs
// Download-then-upload against stub image host and stub WordPress media endpoint.
mod common;

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use serde_json::json;

use common::{config, serve, Hits};
use cryptonews_relay::media::{MediaRelay, RehostedMedia};
use cryptonews_relay::publish::wordpress::WordPressClient;

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

#[derive(Clone, Default)]
struct Upstream {
    image_hits: Hits,
    media_hits: Hits,
    uploads: Arc<Mutex<Vec<(HeaderMap, Bytes)>>>,
    referers: Arc<Mutex<Vec<String>>>,
}

fn router(up: Upstream, media_status: StatusCode) -> Router {
    let img = up.clone();
    let media = up.clone();
    let png_hits = up.image_hits.clone();
    Router::new()
        .route(
            "/img/chart.png",
            get(move |headers: HeaderMap| {
                let img = img.clone();
                async move {
                    img.image_hits.hit();
                    let referer = headers
                        .get(header::REFERER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    img.referers.lock().unwrap().push(referer);
                    // wrong header on purpose; bytes win
                    ([(header::CONTENT_TYPE, "image/jpeg")], PNG.to_vec())
                }
            }),
        )
        .route(
            "/img/missing.jpg",
            get(move || {
                let hits = png_hits.clone();
                async move {
                    hits.hit();
                    StatusCode::NOT_FOUND
                }
            }),
        )
        .route(
            "/wp-json/wp/v2/media",
            post(move |headers: HeaderMap, body: Bytes| {
                let media = media.clone();
                async move {
                    media.media_hits.hit();
                    media.uploads.lock().unwrap().push((headers, body));
                    if media_status != StatusCode::CREATED {
                        return (media_status, Json(json!({"code": "rest_upload_error"}))).into_response();
                    }
                    (
                        StatusCode::CREATED,
                        Json(json!({
                            "id": 42,
                            "source_url": "https://cms/wp-content/uploads/chart.png",
                            "guid": { "rendered": "https://cms/?attachment_id=42" }
                        })),
                    )
                        .into_response()
                }
            }),
        )
}

async fn relay(media_status: StatusCode) -> (MediaRelay, Upstream, String) {
    let up = Upstream::default();
    let base = serve(router(up.clone(), media_status)).await;
    let cfg = config(&[("WP_BASE_URL", base.as_str())]);
    let store = Arc::new(WordPressClient::new(&cfg.wordpress).unwrap());
    (MediaRelay::new(store).unwrap(), up, base)
}

#[tokio::test]
async fn empty_image_url_makes_no_http_call() {
    let (relay, up, _base) = relay(StatusCode::CREATED).await;
    assert_eq!(relay.rehost("").await, None);
    assert_eq!(relay.rehost("   ").await, None);
    assert_eq!(up.image_hits.count(), 0);
    assert_eq!(up.media_hits.count(), 0);
}

#[tokio::test]
async fn rehosts_with_sniffed_type_and_basic_auth() {
    let (relay, up, base) = relay(StatusCode::CREATED).await;

    let out = relay.rehost(&format!("{base}/img/chart.png")).await;
    assert_eq!(
        out,
        Some(RehostedMedia {
            id: 42,
            url: "https://cms/wp-content/uploads/chart.png".into()
        })
    );
    assert_eq!(up.image_hits.count(), 1);
    assert_eq!(up.referers.lock().unwrap()[0], format!("{base}/"));

    let uploads = up.uploads.lock().unwrap();
    let (headers, body) = &uploads[0];
    assert_eq!(body.as_ref(), PNG);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"chart.png\""
    );
    let expected = format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode("editor:app pass")
    );
    assert_eq!(headers[header::AUTHORIZATION], expected.as_str());
}

#[tokio::test]
async fn download_failure_means_no_image() {
    let (relay, up, base) = relay(StatusCode::CREATED).await;
    assert_eq!(relay.rehost(&format!("{base}/img/missing.jpg")).await, None);
    // 404 is not retried and nothing is uploaded
    assert_eq!(up.image_hits.count(), 1);
    assert_eq!(up.media_hits.count(), 0);
}

#[tokio::test]
async fn rejected_upload_means_no_image() {
    let (relay, up, base) = relay(StatusCode::INTERNAL_SERVER_ERROR).await;
    assert_eq!(relay.rehost(&format!("{base}/img/chart.png")).await, None);
    assert_eq!(up.media_hits.count(), 1);
}
