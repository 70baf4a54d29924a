//! Stateless HTTP request builder and response parser for the Mautic API.
//!
//! # Design
//! `MauticClient` holds the base URL and the credentials and nothing else.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`;
//! `MauticApi` runs the round-trip in between. Building fails with
//! `ApiError::Configuration` when a credential is blank, so a request with
//! missing credentials never reaches a transport.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Credentials;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Contact, CreatedContact, CustomFieldDefinition, CustomFieldList, ResourceId, Segment,
    SegmentEnvelope, SegmentList,
};

/// Largest page Mautic serves for list endpoints.
pub const SEGMENT_PAGE_SIZE: u32 = 1000;

/// Synchronous, stateless client for the Mautic REST API.
#[derive(Debug, Clone)]
pub struct MauticClient {
    base_url: String,
    credentials: Credentials,
}

impl MauticClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_get_segments(&self) -> Result<HttpRequest, ApiError> {
        let page_size = SEGMENT_PAGE_SIZE.to_string();
        self.request(HttpMethod::Get, "segments", &[("page_size", page_size.as_str())], None)
    }

    pub fn build_get_segment(&self, segment_id: &ResourceId) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, &format!("segments/{segment_id}"), &[], None)
    }

    pub fn build_get_custom_fields(&self) -> Result<HttpRequest, ApiError> {
        self.request(HttpMethod::Get, "/marketing/field_definitions", &[], None)
    }

    pub fn build_create_contact(&self, contact: &Contact) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(contact).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.request(HttpMethod::Post, "contacts/new", &[], Some(body))
    }

    pub fn build_add_contact_to_segment(
        &self,
        segment_id: &ResourceId,
        contact_id: &ResourceId,
    ) -> Result<HttpRequest, ApiError> {
        self.request(
            HttpMethod::Post,
            &format!("segments/{segment_id}/contact/{contact_id}/add"),
            &[],
            None,
        )
    }

    pub fn parse_get_segments(&self, response: HttpResponse) -> Result<SegmentList, ApiError> {
        expect_status(&response, &[200])?;
        decode(&response.body)
    }

    pub fn parse_get_segment(&self, response: HttpResponse) -> Result<Segment, ApiError> {
        expect_status(&response, &[200])?;
        decode::<SegmentEnvelope>(&response.body).map(|envelope| envelope.list)
    }

    pub fn parse_get_custom_fields(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<CustomFieldDefinition>, ApiError> {
        expect_status(&response, &[200])?;
        let list: CustomFieldList = decode(&response.body)?;
        Ok(list.into_definitions())
    }

    pub fn parse_create_contact(&self, response: HttpResponse) -> Result<CreatedContact, ApiError> {
        expect_status(&response, &[200, 201])?;
        decode::<Value>(&response.body).map(CreatedContact::new)
    }

    pub fn parse_add_contact_to_segment(&self, response: HttpResponse) -> Result<(), ApiError> {
        expect_status(&response, &[200])
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<HttpRequest, ApiError> {
        if self.credentials.is_blank() {
            return Err(ApiError::missing_credentials());
        }

        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if method == HttpMethod::Get && !query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&encoded);
        }

        // Non-GET requests always carry a JSON body, `[]` when empty.
        let body = match method {
            HttpMethod::Get => None,
            HttpMethod::Post => Some(body.unwrap_or_else(|| "[]".to_string())),
        };

        Ok(HttpRequest {
            method,
            url,
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), self.authorization()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        })
    }

    fn authorization(&self) -> String {
        let raw = format!("{}:{}", self.credentials.username, self.credentials.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

/// Accept only the listed statuses; anything else is classified.
fn expect_status(response: &HttpResponse, accepted: &[u16]) -> Result<(), ApiError> {
    if accepted.contains(&response.status) {
        return Ok(());
    }
    Err(classify_error(response))
}

/// Turn an unexpected response into an `ApiError`: the service's
/// `errors[0].message` when it sent one, otherwise the raw response.
pub fn classify_error(response: &HttpResponse) -> ApiError {
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            body.pointer("/errors/0/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            format!(
                "unexpected response from Mautic (HTTP {}): {}",
                response.status, response.body
            )
        });
    ApiError::Service {
        status: response.status,
        message,
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}
