//! In-process mock of the Mautic REST endpoints the bridge calls.
//!
//! Every route lives under `/api` and requires HTTP Basic credentials.
//! Failures use Mautic's error envelope: `{"errors":[{"code","message","type"}]}`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub id: u64,
    pub name: String,
    pub alias: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomField {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: u64,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct Mautic {
    pub segments: BTreeMap<u64, Segment>,
    pub custom_fields: Vec<CustomField>,
    pub contacts: BTreeMap<u64, Contact>,
    pub memberships: BTreeMap<u64, Vec<u64>>,
    next_contact_id: u64,
}

impl Mautic {
    /// Two segments (`1` Newsletter, `42` Leads) and one custom field.
    pub fn seeded() -> Self {
        let mut mautic = Mautic::default();
        for (id, name, alias) in [(1, "Newsletter", "newsletter"), (42, "Leads", "leads")] {
            mautic.segments.insert(
                id,
                Segment {
                    id,
                    name: name.to_string(),
                    alias: alias.to_string(),
                },
            );
        }
        mautic.custom_fields.push(CustomField {
            id: "e1_T".to_string(),
            name: "company_size".to_string(),
        });
        mautic
    }

    fn create_contact(&mut self, fields: BTreeMap<String, String>) -> Contact {
        self.next_contact_id += 1;
        let contact = Contact {
            id: self.next_contact_id,
            fields,
        };
        self.contacts.insert(contact.id, contact.clone());
        contact
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RwLock<Mautic>>,
    authorization: Arc<String>,
}

impl AppState {
    pub fn new(mautic: Mautic, username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        Self {
            db: Arc::new(RwLock::new(mautic)),
            authorization: Arc::new(format!("Basic {encoded}")),
        }
    }
}

type ApiResult = Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    app_with_state(AppState::new(Mautic::seeded(), USERNAME, PASSWORD))
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/api/segments", get(list_segments))
        .route("/api/segments/{id}", get(get_segment))
        .route("/api/marketing/field_definitions", get(list_custom_fields))
        .route("/api/contacts/new", post(create_contact))
        .route(
            "/api/segments/{segment_id}/contact/{contact_id}/add",
            post(add_contact_to_segment),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn error(status: StatusCode, message: &str, kind: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "errors": [{ "code": status.as_u16(), "message": message, "type": kind }]
        })),
    )
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if supplied == Some(state.authorization.as_str()) {
        return Ok(());
    }
    debug!("rejecting request with bad credentials");
    Err(error(
        StatusCode::UNAUTHORIZED,
        "API authorization denied.",
        "unauthorized",
    ))
}

fn not_found() -> (StatusCode, Json<Value>) {
    error(StatusCode::NOT_FOUND, "Item was not found.", "null")
}

async fn list_segments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let limit = query
        .get("page_size")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(30);
    let db = state.db.read().await;
    // Mautic keys the lists object by segment ID.
    let lists: serde_json::Map<String, Value> = db
        .segments
        .values()
        .take(limit)
        .map(|s| (s.id.to_string(), json!(s)))
        .collect();
    Ok((
        StatusCode::OK,
        Json(json!({ "total": db.segments.len(), "lists": lists })),
    ))
}

async fn get_segment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let db = state.db.read().await;
    let segment = id
        .parse::<u64>()
        .ok()
        .and_then(|id| db.segments.get(&id))
        .ok_or_else(not_found)?;
    Ok((StatusCode::OK, Json(json!({ "list": segment }))))
}

async fn list_custom_fields(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    authorize(&state, &headers)?;
    let db = state.db.read().await;
    Ok((
        StatusCode::OK,
        Json(json!({ "custom_fields": db.custom_fields })),
    ))
}

async fn create_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult {
    authorize(&state, &headers)?;
    let fields: BTreeMap<String, String> = serde_json::from_str(&body).map_err(|_| {
        error(
            StatusCode::BAD_REQUEST,
            "Request body must be a JSON object.",
            "bad_request",
        )
    })?;

    let mut db = state.db.write().await;
    if let Some(email) = fields.get("email").filter(|e| !e.is_empty()) {
        let duplicate = db
            .contacts
            .values()
            .any(|c| c.fields.get("email") == Some(email));
        if duplicate {
            return Err(error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Email already exists",
                "validation",
            ));
        }
    }

    let contact = db.create_contact(fields);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "contact": { "id": contact.id, "fields": { "all": contact.fields } } })),
    ))
}

async fn add_contact_to_segment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((segment_id, contact_id)): Path<(String, String)>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let segment_id = segment_id.parse::<u64>().map_err(|_| not_found())?;
    let contact_id = contact_id.parse::<u64>().map_err(|_| not_found())?;

    let mut db = state.db.write().await;
    if !db.segments.contains_key(&segment_id) || !db.contacts.contains_key(&contact_id) {
        return Err(not_found());
    }
    let members = db.memberships.entry(segment_id).or_default();
    if !members.contains(&contact_id) {
        members.push(contact_id);
    }
    Ok((StatusCode::OK, Json(json!({ "success": 1 }))))
}
