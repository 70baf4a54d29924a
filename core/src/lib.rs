//! Gravity Forms to Mautic bridge.
//!
//! # Overview
//! Maps a submitted form entry onto a Mautic contact and adds that contact to
//! the segment a feed points at, over Mautic's REST API with HTTP Basic auth.
//!
//! # Design
//! - `MauticClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `MauticApi` pairs the client with a `Transport`; `UreqTransport` is the
//!   blocking default.
//! - `FeedProcessor` is constructed explicitly from `Settings` and a
//!   transport, and turns every submission into a `FeedReport`, never an
//!   error or a panic.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod field_map;
pub mod http;
pub mod types;

pub use api::MauticApi;
pub use client::MauticClient;
pub use config::{Credentials, Feed, Settings};
pub use error::{ApiError, TransportError};
pub use feed::{FeedNote, FeedProcessor, FeedReport, FeedStage, NoteLevel};
pub use field_map::{Entry, FieldMapping, StandardField};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{Contact, CreatedContact, CustomFieldDefinition, ResourceId, Segment, SegmentList};
