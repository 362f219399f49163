//! API route definitions.

mod api;
mod health;

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the complete API router.
///
/// # Route Structure
///
/// - `GET /health` - Health check
/// - `GET|POST /api` - Random image selection
///
/// `OPTIONS` requests are answered by the CORS layer. The no-cache layer
/// wraps it so those responses are marked uncacheable too.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api", get(api::random_image).post(api::random_image))
        .layer(cors_layer())
        .layer(middleware::map_response(add_no_cache_headers))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::USER_AGENT, header::ACCEPT])
        .max_age(Duration::from_secs(86400))
}

/// Mark every response as uncacheable.
///
/// Each request should produce a fresh random pick, so neither browsers nor
/// CDNs may reuse a previous response.
async fn add_no_cache_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate, max-age=0"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    if let Ok(value) = HeaderValue::from_str(&chrono::Utc::now().timestamp_millis().to_string()) {
        headers.insert("x-timestamp", value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use randimg_core::ImageSet;
    use tower::ServiceExt;

    use crate::config::Config;

    const IPHONE_UA: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";

    fn image_set() -> ImageSet {
        ImageSet::new(
            (0..30).map(|i| format!("wide-{i:02}.png")).collect(),
            (0..10).map(|i| format!("tall-{i:02}.png")).collect(),
        )
    }

    fn app_with(config: Config, set: ImageSet) -> Router {
        router(AppState::with_image_set(config, set))
    }

    fn app() -> Router {
        app_with(Config::default(), image_set())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, "x.test")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn missing_type_returns_help_text() {
        let response = app().oneshot(get_request("/api")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let body = body_string(response).await;
        assert!(body.contains("pc: 30"));
        assert!(body.contains("pe: 10"));
    }

    #[tokio::test]
    async fn invalid_type_is_bad_request() {
        let response = app().oneshot(get_request("/api?type=zz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn json_selection() {
        let response = app()
            .oneshot(get_request("/api?type=pc&count=3&img_format=webp"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::ETAG));

        let body = body_json(response).await;
        assert_eq!(body["type"], "pc");
        assert_eq!(body["count"], 3);
        let images = body["images"].as_array().unwrap();
        assert_eq!(images.len(), 3);
        for image in images {
            let filename = image["filename"].as_str().unwrap();
            assert!(filename.starts_with("wide-"));
            let expected = format!(
                "http://x.test/converted/pc/webp/{}.webp",
                filename.trim_end_matches(".png")
            );
            assert_eq!(image["url"], expected);
        }
    }

    #[tokio::test]
    async fn text_selection() {
        let response = app()
            .oneshot(get_request("/api?type=pe&count=4&format=text"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.starts_with("http://x.test/images/pe/tall-")));
    }

    #[tokio::test]
    async fn redirect_selection() {
        let response = app()
            .oneshot(get_request("/api?type=pc&return=redirect&count=5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("http://x.test/images/pc/wide-"));
    }

    #[tokio::test]
    async fn user_agent_detection() {
        let request = Request::builder()
            .uri("/api?type=ua")
            .header(header::HOST, "x.test")
            .header(header::USER_AGENT, IPHONE_UA)
            .body(Body::empty())
            .unwrap();
        let body = body_json(app().oneshot(request).await.unwrap()).await;
        assert_eq!(body["type"], "pe");
        assert_eq!(body["detected_by"], "user-agent");
    }

    #[tokio::test]
    async fn user_agent_debug_probe() {
        let request = Request::builder()
            .uri("/api?type=ua&debug")
            .header(header::USER_AGENT, IPHONE_UA)
            .header("x-real-ip", "198.51.100.7")
            .body(Body::empty())
            .unwrap();
        let body = body_json(app().oneshot(request).await.unwrap()).await;
        assert_eq!(body["detected"], "ua");
        assert_eq!(body["isMobile"], true);
        assert_eq!(body["deviceType"], "pe");
        assert_eq!(body["realIP"], "198.51.100.7");
        assert!(body.get("images").is_none());
    }

    #[tokio::test]
    async fn auto_format_uses_accept_header() {
        let request = Request::builder()
            .uri("/api?type=pc&img_format=auto")
            .header(header::HOST, "x.test")
            .header(header::ACCEPT, "image/avif,image/webp,*/*")
            .body(Body::empty())
            .unwrap();
        let body = body_json(app().oneshot(request).await.unwrap()).await;
        assert_eq!(body["format"], "avif");
        assert!(
            body["image"]["url"]
                .as_str()
                .unwrap()
                .starts_with("http://x.test/converted/pc/avif/")
        );
    }

    #[tokio::test]
    async fn empty_set_is_not_found() {
        let set = ImageSet::new(vec!["a.png".to_string()], Vec::new());
        let response = app_with(Config::default(), set)
            .oneshot(get_request("/api?type=pe"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn external_origin_and_absolute_entries() {
        let config = Config {
            external_base_url: Some("https://cdn.example.com".to_string()),
            ..Config::default()
        };
        let set = ImageSet::new(
            vec!["a.png".to_string()],
            vec!["https://elsewhere.example.org/p.webp".to_string()],
        );
        let app = app_with(config, set);

        let body = body_json(
            app.clone()
                .oneshot(get_request("/api?type=pc&external=true"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["image"]["url"], "https://cdn.example.com/images/pc/a.png");

        let body = body_json(app.oneshot(get_request("/api?type=pe")).await.unwrap()).await;
        assert_eq!(body["image"]["url"], "https://elsewhere.example.org/p.webp");
    }

    #[tokio::test]
    async fn consecutive_picks_do_not_repeat() {
        let app = app();
        let mut previous: Option<String> = None;
        for _ in 0..20 {
            let body = body_json(
                app.clone()
                    .oneshot(get_request("/api?type=pe"))
                    .await
                    .unwrap(),
            )
            .await;
            let filename = body["image"]["filename"].as_str().unwrap().to_string();
            assert_ne!(previous.as_deref(), Some(filename.as_str()));
            previous = Some(filename);
        }
    }

    #[tokio::test]
    async fn post_is_accepted() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api?type=pc")
            .header(header::HOST, "x.test")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bare_options_returns_preflight_headers() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(
            headers[header::CACHE_CONTROL]
                .to_str()
                .unwrap()
                .contains("no-store")
        );
        assert_eq!(headers[header::PRAGMA], "no-cache");
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api?type=pc")
            .header(header::ORIGIN, "https://blog.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::EXPIRES], "0");
    }

    #[tokio::test]
    async fn repeated_query_keys_use_first_value() {
        let response = app()
            .oneshot(get_request("/api?type=pc&count=2&count=3&type=pe"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["type"], "pc");
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    async fn help_survives_unavailable_library() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            image_dir: dir.path().join("missing"),
            ..Config::default()
        };
        let app = router(AppState::new(config).unwrap());

        let response = app.clone().oneshot(get_request("/api")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("pc: 0"));
        assert!(body.contains("pe: 0"));

        let response = app.oneshot(get_request("/api?type=pc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn responses_are_not_cacheable() {
        for uri in ["/api", "/api?type=pc", "/api?type=zz"] {
            let response = app().oneshot(get_request(uri)).await.unwrap();
            let headers = response.headers();
            assert!(
                headers[header::CACHE_CONTROL]
                    .to_str()
                    .unwrap()
                    .contains("no-store"),
                "{uri}"
            );
            assert_eq!(headers[header::PRAGMA], "no-cache");
            assert_eq!(headers[header::EXPIRES], "0");
            assert!(headers.contains_key("x-timestamp"));
        }
    }

    #[tokio::test]
    async fn health_check() {
        let response = app().oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }
}
