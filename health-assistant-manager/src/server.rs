use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use health_assistant_core::config::{ServerConfig, SessionsConfig};
use health_assistant_core::session::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::panic_response;
use crate::handlers::{
    appointments_handler, chat_handler, create_appointment_handler, health_data_handler,
    health_handler, records_handler, root_handler, search_records_handler, session_handler,
};
use crate::state::AppState;

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/records", get(records_handler))
        .route("/api/records/search", get(search_records_handler))
        .route(
            "/api/appointments",
            get(appointments_handler).post(create_appointment_handler),
        )
        .route("/api/health-data", get(health_data_handler))
        .route("/api/sessions/:session_id", get(session_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    // Credentials rule out the `*` wildcard, so "*" mirrors the caller's origin.
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Periodically evict idle sessions until shutdown is signalled
pub fn spawn_session_sweeper(
    sessions: Arc<SessionManager>,
    config: &SessionsConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let ttl = Duration::from_secs(config.idle_ttl_secs);
    let period = Duration::from_secs(config.sweep_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = sessions.evict_idle(ttl);
                    tracing::debug!("Session sweep evicted {}, {} remain", evicted, sessions.len());
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("Session sweeper stopping");
                    break;
                }
            }
        }
    })
}

pub async fn run_server(
    state: AppState,
    server: &ServerConfig,
    sessions: &SessionsConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let sweeper = spawn_session_sweeper(
        state.sessions().clone(),
        sessions,
        shutdown_rx.resubscribe(),
    );
    let app = build_router(state, &server.cors_origins);

    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    if let Err(e) = sweeper.await {
        tracing::warn!("Session sweeper ended abnormally: {}", e);
    }
    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use health_assistant_agent::ConversationAgent;
    use health_assistant_providers::{
        LLMProvider, LLMResponse, Message, ProviderError, ProviderResult,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Answers every prompt with a fixed reply, or fails when none is set
    struct FixedProvider(Option<&'static str>);

    #[async_trait]
    impl LLMProvider for FixedProvider {
        async fn chat(
            &self,
            _messages: Vec<Message>,
            _model: Option<String>,
            _max_tokens: u32,
            _temperature: f32,
        ) -> ProviderResult<LLMResponse> {
            match self.0 {
                Some(text) => Ok(LLMResponse::text(text)),
                None => Err(ProviderError::ApiError("HTTP 500: upstream".to_string())),
            }
        }

        fn get_default_model(&self) -> String {
            "fixed".to_string()
        }
    }

    fn app(reply: Option<&'static str>) -> Router {
        let agent = ConversationAgent::new(
            Arc::new(FixedProvider(reply)),
            Arc::new(SessionManager::default()),
        );
        build_router(
            AppState::new(Arc::new(agent)),
            &["http://localhost:5003".to_string()],
        )
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let response = app(None).oneshot(get_req("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"message": "AI Health Assistant API", "status": "running"})
        );

        let response = app(None).oneshot(get_req("/health")).await.unwrap();
        assert_eq!(body_json(response).await, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_chat_emergency() {
        let response = app(Some("unused"))
            .oneshot(post_json("/api/chat", json!({"message": "我胸痛，感觉很难受"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["emergency"], true);
        assert!(body["message"].as_str().unwrap().contains("120"));
        assert!(!body["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_reply_is_stored_in_session() {
        let app = app(Some("多喝温水，注意休息。"));

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/chat",
                json!({"message": "有点咳嗽", "session_id": "web-1"}),
            ))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["emergency"], false);
        assert_eq!(body["session_id"], "web-1");
        assert!(body["message"].as_str().unwrap().contains("仅供参考"));

        let response = app.oneshot(get_req("/api/sessions/web-1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session = body_json(response).await;
        assert_eq!(session["session_id"], "web-1");
        assert_eq!(session["messages"][0], json!({"role": "user", "content": "有点咳嗽"}));
        assert_eq!(session["messages"][1]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_chat_model_failure_still_succeeds() {
        let response = app(None)
            .oneshot(post_json("/api/chat", json!({"message": "我最近有点头痛，持续了三天"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["emergency"], false);
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("偏头痛"));
        assert!(message.contains("AI 服务暂时不可用"));
    }

    #[tokio::test]
    async fn test_chat_answers_empty_message() {
        let response = app(Some("请描述一下你的症状。"))
            .oneshot(post_json("/api/chat", json!({"message": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["emergency"], false);
        assert!(body["message"].as_str().unwrap().starts_with("请描述一下你的症状。"));
    }

    #[tokio::test]
    async fn test_chat_rejects_missing_message_field() {
        let response = app(None)
            .oneshot(post_json("/api/chat", json!({"session_id": "x"})))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_emergency_turn_creates_empty_session() {
        let app = app(None);
        app.clone()
            .oneshot(post_json(
                "/api/chat",
                json!({"message": "呼吸困难", "session_id": "urgent"}),
            ))
            .await
            .unwrap();

        let response = app.oneshot(get_req("/api/sessions/urgent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_handler_panic_is_500_with_detail() {
        async fn broken() -> &'static str {
            panic!("session store unavailable")
        }
        let app = Router::new()
            .route("/broken", get(broken))
            .layer(CatchPanicLayer::custom(panic_response));

        let response = app.oneshot(get_req("/broken")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["detail"],
            "session store unavailable"
        );
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let response = app(None)
            .oneshot(get_req("/api/sessions/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn test_mock_endpoints() {
        let records = body_json(app(None).oneshot(get_req("/api/records")).await.unwrap()).await;
        assert_eq!(records.as_array().unwrap().len(), 2);
        assert_eq!(records[0]["type"], "体检报告");
        assert_eq!(records[1]["doctor"], "系统记录");

        let appointments =
            body_json(app(None).oneshot(get_req("/api/appointments")).await.unwrap()).await;
        assert_eq!(appointments[0]["department"], "内科");
        assert_eq!(appointments[0]["status"], "已预约");

        let data = body_json(app(None).oneshot(get_req("/api/health-data")).await.unwrap()).await;
        assert_eq!(data["bloodPressure"], "120/80");
        assert_eq!(data["heartRate"], 72);

        let search = body_json(
            app(None)
                .oneshot(get_req("/api/records/search?q=blood"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(search, json!([]));
    }

    #[tokio::test]
    async fn test_create_appointment() {
        let response = app(None)
            .oneshot(post_json(
                "/api/appointments",
                json!({"doctor": "李医生", "date": "2024-02-01", "time": "09:30"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["appointment_id"], "apt_2024-02-01_09:30");
        assert_eq!(body["status"], "待确认");

        let response = app(None)
            .oneshot(post_json(
                "/api/appointments",
                json!({"doctor": "", "date": "2024-02-01", "time": ""}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("doctor, time"));
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .header(header::ORIGIN, "http://localhost:5003")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app(None).oneshot(request).await.unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5003"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn test_cors_rejects_unknown_origin() {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap();

        let response = app(None).oneshot(request).await.unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_sweeper_evicts_and_stops_on_shutdown() {
        let sessions = Arc::new(SessionManager::default());
        sessions.get_or_create("stale");

        let config = SessionsConfig {
            idle_ttl_secs: 0,
            sweep_interval_secs: 1,
            ..SessionsConfig::default()
        };
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let sweeper = spawn_session_sweeper(sessions.clone(), &config, shutdown_rx);

        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert!(sessions.is_empty());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), sweeper)
            .await
            .unwrap()
            .unwrap();
    }
}
