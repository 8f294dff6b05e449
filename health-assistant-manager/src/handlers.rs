use axum::{
    extract::{Path, Query, State},
    Json,
};
use health_assistant_agent::{AppointmentConfirmation, ChatReply, RecordMatch};
use health_assistant_core::session::Role;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::mock::{self, Appointment, HealthData, HealthRecord};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatReply> {
    let outcome = state
        .agent
        .process_message(&payload.message, payload.session_id)
        .await;

    tracing::info!(
        session_id = %outcome.reply().session_id,
        outcome = outcome.kind(),
        "Chat turn complete"
    );
    Json(outcome.into_reply())
}

pub async fn records_handler() -> Json<Vec<HealthRecord>> {
    Json(mock::health_records())
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_records_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<RecordMatch>> {
    Json(state.records.retrieve(&query.q))
}

pub async fn appointments_handler() -> Json<Vec<Appointment>> {
    Json(mock::appointments())
}

#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    pub doctor: String,
    pub date: String,
    pub time: String,
}

pub async fn create_appointment_handler(
    State(state): State<AppState>,
    Json(payload): Json<AppointmentRequest>,
) -> Result<Json<AppointmentConfirmation>, ApiError> {
    let missing: Vec<&str> = [
        ("doctor", &payload.doctor),
        ("date", &payload.date),
        ("time", &payload.time),
    ]
    .iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| *name)
    .collect();

    if !missing.is_empty() {
        return Err(ApiError::Validation(format!(
            "fields must not be empty: {}",
            missing.join(", ")
        )));
    }

    let confirmation =
        state
            .appointments
            .create_appointment(&payload.doctor, &payload.date, &payload.time);
    tracing::info!("Appointment requested: {}", confirmation.appointment_id);
    Ok(Json(confirmation))
}

pub async fn health_data_handler() -> Json<HealthData> {
    Json(mock::health_data())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub messages: Vec<SessionMessage>,
}

pub async fn session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = state
        .sessions()
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))?;

    let session = handle.lock().await;
    let messages = session
        .messages
        .iter()
        .map(|m| SessionMessage {
            role: m.role,
            content: m.content.clone(),
        })
        .collect();

    Ok(Json(SessionView {
        session_id: session.key.clone(),
        messages,
    }))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "AI Health Assistant API", "status": "running" }))
}
