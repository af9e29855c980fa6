//! Actix Web server exposing the dashboard, the MJPEG preview and the
//! session control API.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer,
    error::{InternalError, JsonPayloadError},
    http::header,
    web::{self, Bytes},
};
use anyhow::{Context, Result};
use async_stream::stream;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::pointer::{
    control::SessionController,
    encoding::{BOUNDARY, encode_jpeg, multipart_chunk},
    frames::FramePacket,
    gesture::RearmPolicy,
    telemetry,
};

/// Shared state backing HTTP handlers.
pub(crate) struct ServerState {
    pub(crate) controller: Arc<SessionController>,
    pub(crate) placeholder: Arc<RgbImage>,
    pub(crate) jpeg_quality: u8,
    pub(crate) stream_interval: Duration,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ApiResponse {
    status: String,
    message: String,
}

fn success(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        status: "success".to_string(),
        message: message.into(),
    })
}

fn failure(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        status: "error".to_string(),
        message: message.into(),
    })
}

#[derive(Deserialize)]
struct RearmRequest {
    policy: RearmPolicy,
}

/// Register every route on `cfg`. Handlers expect `web::Data<ServerState>`.
pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .content_type_required(false)
            .error_handler(json_error),
    )
    .route("/", web::get().to(index_route))
    .route("/video_feed", web::get().to(video_feed))
    .route("/frame.jpg", web::get().to(frame_handler))
    .route("/metrics", web::get().to(metrics_handler))
    .service(
        web::scope("/api")
            .route("/start_camera", web::post().to(start_camera))
            .route("/stop_camera", web::post().to(stop_camera))
            .route("/enable_tracking", web::post().to(enable_tracking))
            .route("/disable_tracking", web::post().to(disable_tracking))
            .route("/set_click_distance", web::post().to(set_click_distance))
            .route("/set_rearm_policy", web::post().to(set_rearm_policy))
            .route("/status", web::get().to(status)),
    );
}

/// Bind `bind` and serve until the process receives Ctrl+C.
pub(crate) fn run_server(bind: SocketAddr, state: ServerState) -> Result<()> {
    let data = web::Data::new(state);
    actix_web::rt::System::new().block_on(async move {
        let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
            .bind(bind)
            .with_context(|| format!("failed to bind HTTP server to {bind}"))?
            .run();
        info!("dashboard available at http://{bind}/");
        server.await.context("HTTP server error")
    })
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid request body: {err}");
    InternalError::from_response(
        err,
        HttpResponse::BadRequest().json(ApiResponse {
            status: "error".to_string(),
            message,
        }),
    )
    .into()
}

/// Serve the dashboard page.
async fn index_route() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(crate::html::dashboard::DASHBOARD_HTML)
}

async fn start_camera(state: web::Data<ServerState>) -> HttpResponse {
    let controller = state.controller.clone();
    match web::block(move || controller.start()).await {
        Ok(Ok(())) => success("Camera started"),
        Ok(Err(err)) => {
            warn!("start_camera failed: {err}");
            failure(format!("Failed to start camera: {err}"))
        }
        Err(err) => failure(format!("Failed to start camera: {err}")),
    }
}

async fn stop_camera(state: web::Data<ServerState>) -> HttpResponse {
    let controller = state.controller.clone();
    if let Err(err) = web::block(move || controller.stop()).await {
        warn!("stop_camera did not complete: {err}");
    }
    success("Camera stopped")
}

async fn enable_tracking(state: web::Data<ServerState>) -> HttpResponse {
    state.controller.set_tracking(true);
    success("Tracking enabled")
}

async fn disable_tracking(state: web::Data<ServerState>) -> HttpResponse {
    state.controller.set_tracking(false);
    success("Tracking disabled")
}

async fn set_click_distance(
    state: web::Data<ServerState>,
    body: web::Json<Value>,
) -> HttpResponse {
    match body.get("distance").and_then(coerce_distance) {
        Some(distance) => {
            state.controller.set_pinch_threshold(distance);
            success(format!("Click distance set to {distance}"))
        }
        None => failure("No distance provided"),
    }
}

/// Accept a JSON number or a numeric string. Any finite value goes through;
/// a negative threshold simply never fires.
fn coerce_distance(value: &Value) -> Option<f64> {
    let distance = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    distance.is_finite().then_some(distance)
}

async fn set_rearm_policy(
    state: web::Data<ServerState>,
    body: web::Json<RearmRequest>,
) -> HttpResponse {
    let policy = body.into_inner().policy;
    state.controller.set_rearm_policy(policy);
    success(format!("Re-arm policy set to {}", policy.label()))
}

async fn status(state: web::Data<ServerState>) -> HttpResponse {
    HttpResponse::Ok().json(&*state.controller.snapshot())
}

/// Latest published frame, or the placeholder when nothing has been captured.
enum PreviewImage {
    Frame(Arc<FramePacket>),
    Placeholder(Arc<RgbImage>),
}

impl PreviewImage {
    fn current(state: &ServerState) -> Self {
        match state.controller.slot().latest() {
            Some(packet) => PreviewImage::Frame(packet),
            None => PreviewImage::Placeholder(state.placeholder.clone()),
        }
    }

    fn image(&self) -> &RgbImage {
        match self {
            PreviewImage::Frame(packet) => &packet.image,
            PreviewImage::Placeholder(image) => image,
        }
    }
}

async fn encode_preview(state: &ServerState) -> Result<Vec<u8>> {
    encode_snapshot(PreviewImage::current(state), state.jpeg_quality).await
}

async fn encode_snapshot(preview: PreviewImage, quality: u8) -> Result<Vec<u8>> {
    web::block(move || encode_jpeg(preview.image(), quality))
        .await
        .context("JPEG encode task was cancelled")?
}

/// Return a single JPEG of the current preview.
///
/// Captured frames carry their sequence number, capture time and FPS as
/// headers; the placeholder carries none.
async fn frame_handler(state: web::Data<ServerState>) -> HttpResponse {
    let preview = PreviewImage::current(&state);
    let packet = match &preview {
        PreviewImage::Frame(packet) => Some(packet.clone()),
        PreviewImage::Placeholder(_) => None,
    };
    match encode_snapshot(preview, state.jpeg_quality).await {
        Ok(jpeg) => {
            let mut response = HttpResponse::Ok();
            response.insert_header((header::CACHE_CONTROL, "no-cache"));
            if let Some(packet) = packet {
                response
                    .insert_header(("X-Frame-Number", packet.frame_number.to_string()))
                    .insert_header(("X-Frame-Timestamp", packet.timestamp_ms.to_string()))
                    .insert_header(("X-Capture-Fps", format!("{:.1}", packet.fps)));
            }
            response.content_type("image/jpeg").body(jpeg)
        }
        Err(err) => {
            metrics::counter!("pointer_stream_encode_errors_total").increment(1);
            HttpResponse::InternalServerError().body(format!("{err:#}"))
        }
    }
}

/// Counts connected stream clients for the lifetime of one response.
struct StreamClient;

impl StreamClient {
    fn connect() -> Self {
        metrics::gauge!("pointer_stream_clients").increment(1.0);
        debug!("preview client connected");
        StreamClient
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        metrics::gauge!("pointer_stream_clients").decrement(1.0);
        debug!("preview client disconnected");
    }
}

/// Stream the annotated preview as MJPEG until the client goes away.
async fn video_feed(state: web::Data<ServerState>) -> HttpResponse {
    let state = state.clone();
    let stream = stream! {
        let _client = StreamClient::connect();
        let mut interval = actix_web::rt::time::interval(state.stream_interval);
        loop {
            interval.tick().await;
            match encode_preview(&state).await {
                Ok(jpeg) => yield Ok::<Bytes, actix_web::Error>(Bytes::from(multipart_chunk(&jpeg))),
                Err(err) => {
                    metrics::counter!("pointer_stream_encode_errors_total").increment(1);
                    debug!("skipping preview frame: {err:#}");
                }
            }
        }
    };

    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .content_type(format!("multipart/x-mixed-replace; boundary={BOUNDARY}"))
        .streaming(stream)
}

/// Prometheus text exposition.
async fn metrics_handler() -> HttpResponse {
    match telemetry::prometheus_handle() {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::ServiceUnavailable().body("metrics recorder not installed"),
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;

    use actix_web::{
        body::MessageBody,
        http::{StatusCode, header::ContentType},
        test,
    };
    use serde_json::json;

    use super::*;
    use crate::pointer::{control::tests::fake_controller, frames::placeholder_image};

    fn state_with(controller: SessionController) -> web::Data<ServerState> {
        web::Data::new(ServerState {
            controller: Arc::new(controller),
            placeholder: Arc::new(placeholder_image()),
            jpeg_quality: 80,
            stream_interval: Duration::from_millis(5),
        })
    }

    fn idle_state() -> web::Data<ServerState> {
        state_with(fake_controller(true, true).0)
    }

    macro_rules! post_api {
        ($app:expr, $uri:expr, $body:expr) => {{
            let req = test::TestRequest::post()
                .uri($uri)
                .set_json($body)
                .to_request();
            let resp: ApiResponse = test::call_and_read_body_json(&$app, req).await;
            resp
        }};
    }

    #[actix_web::test]
    async fn index_serves_dashboard() {
        let app = test::init_service(App::new().app_data(idle_state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        let html = std::str::from_utf8(&body).expect("utf-8");
        assert!(html.contains("/video_feed"));
        assert!(html.contains("/api/start_camera"));
    }

    #[actix_web::test]
    async fn camera_lifecycle_messages() {
        let state = idle_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let started = post_api!(app, "/api/start_camera", json!({}));
        assert_eq!(
            started,
            ApiResponse {
                status: "success".into(),
                message: "Camera started".into()
            }
        );
        assert!(state.controller.snapshot().camera_active);

        let again = post_api!(app, "/api/start_camera", json!({}));
        assert_eq!(again.status, "error");
        assert!(again.message.starts_with("Failed to start camera"));

        let stopped = post_api!(app, "/api/stop_camera", json!({}));
        assert_eq!(stopped.message, "Camera stopped");
        assert!(!state.controller.snapshot().camera_active);

        let stopped_twice = post_api!(app, "/api/stop_camera", json!({}));
        assert_eq!(stopped_twice.status, "success");
    }

    #[actix_web::test]
    async fn camera_open_failure_is_reported() {
        let state = state_with(fake_controller(false, true).0);
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
        let resp = post_api!(app, "/api/start_camera", json!({}));
        assert_eq!(resp.status, "error");
        assert!(resp.message.contains("Could not open camera"));
        assert!(!state.controller.snapshot().camera_active);
    }

    #[actix_web::test]
    async fn tracking_toggles() {
        let state = idle_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let enabled = post_api!(app, "/api/enable_tracking", json!({}));
        assert_eq!(enabled.message, "Tracking enabled");
        assert!(state.controller.snapshot().tracking_enabled);

        let disabled = post_api!(app, "/api/disable_tracking", json!({}));
        assert_eq!(disabled.message, "Tracking disabled");
        assert!(!state.controller.snapshot().tracking_enabled);
    }

    #[actix_web::test]
    async fn click_distance_accepts_numbers_and_numeric_strings() {
        let state = idle_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let resp = post_api!(app, "/api/set_click_distance", json!({ "distance": 35 }));
        assert_eq!(resp.message, "Click distance set to 35");
        assert_eq!(state.controller.snapshot().pinch_threshold, 35.0);

        let resp = post_api!(app, "/api/set_click_distance", json!({ "distance": "42.5" }));
        assert_eq!(resp.message, "Click distance set to 42.5");
        assert_eq!(state.controller.snapshot().pinch_threshold, 42.5);

        let resp = post_api!(app, "/api/set_click_distance", json!({ "distance": -3 }));
        assert_eq!(resp.status, "success");
        assert_eq!(resp.message, "Click distance set to -3");
        assert_eq!(state.controller.snapshot().pinch_threshold, -3.0);
    }

    #[actix_web::test]
    async fn click_distance_without_value_does_not_mutate() {
        let state = idle_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        for body in [json!({}), json!({ "distance": "far" }), json!({ "distance": "inf" }), json!({ "distance": null })] {
            let resp = post_api!(app, "/api/set_click_distance", body);
            assert_eq!(
                resp,
                ApiResponse {
                    status: "error".into(),
                    message: "No distance provided".into()
                }
            );
        }
        assert_eq!(state.controller.snapshot().pinch_threshold, 20.0);
    }

    #[actix_web::test]
    async fn malformed_json_is_a_bad_request() {
        let state = idle_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/set_click_distance")
            .insert_header(ContentType::json())
            .set_payload("{\"distance\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiResponse = test::read_body_json(resp).await;
        assert_eq!(body.status, "error");
        assert_eq!(state.controller.snapshot().pinch_threshold, 20.0);
    }

    #[actix_web::test]
    async fn rearm_policy_and_status() {
        let state = idle_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let resp = post_api!(app, "/api/set_rearm_policy", json!({ "policy": "release" }));
        assert_eq!(resp.status, "success");

        let req = test::TestRequest::get().uri("/api/status").to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            status,
            json!({
                "camera_active": false,
                "tracking_enabled": false,
                "pinch_threshold": 20.0,
                "rearm_policy": "release"
            })
        );
    }

    #[actix_web::test]
    async fn frame_endpoint_serves_placeholder_jpeg() {
        let app = test::init_service(App::new().app_data(idle_state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/frame.jpg").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/jpeg"
        );
        let body = test::read_body(resp).await;
        let decoded = image::load_from_memory(&body).expect("jpeg").to_rgb8();
        assert_eq!(decoded.dimensions(), (640, 480));
    }

    #[actix_web::test]
    async fn video_feed_emits_multipart_chunks() {
        let app = test::init_service(App::new().app_data(idle_state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/video_feed").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "multipart/x-mixed-replace; boundary=frame"
        );

        let mut body = Box::pin(resp.into_body());
        for _ in 0..2 {
            let chunk = poll_fn(|cx| body.as_mut().poll_next(cx))
                .await
                .expect("stream continues")
                .expect("chunk");
            let prefix = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
            assert!(chunk.starts_with(prefix));
            assert!(chunk.ends_with(b"\r\n"));
            assert_eq!(&chunk[prefix.len()..prefix.len() + 2], &[0xFF, 0xD8]);
        }
    }

    #[actix_web::test]
    async fn metrics_endpoint_renders_prometheus_text() {
        telemetry::init_metrics_recorder();
        metrics::counter!("pointer_frames_total").increment(0);
        let app = test::init_service(App::new().app_data(idle_state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
