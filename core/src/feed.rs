//! Feed processing: one form submission into one Mautic segment.
//!
//! # Design
//! The processor is built explicitly from `Settings` and a transport. The
//! credential check and probe happen once, in `connect`; afterwards the
//! processor either holds a working `MauticApi` or the reason it has none.
//!
//! `process_feed` never fails and never panics past its boundary. Every
//! outcome, good or bad, comes back as a `FeedReport` whose notes the host
//! attaches to the entry and the feed log.
//!
//! A failed segment lookup does not stop the workflow: the configured ID is
//! used as-is for the attach step.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::MauticApi;
use crate::config::{Feed, Settings};
use crate::error::ApiError;
use crate::field_map::{self, Entry, FieldMapEntry};
use crate::http::Transport;
use crate::types::ResourceId;

/// Progress of one submission through the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStage {
    NotStarted,
    CredentialsChecked,
    SegmentResolved,
    ContactCreated,
    SegmentAttached,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteLevel {
    Success,
    Error,
}

/// A line for the entry notes or the feed error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedNote {
    pub level: NoteLevel,
    pub message: String,
}

impl FeedNote {
    fn success(message: String) -> Self {
        Self {
            level: NoteLevel::Success,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: NoteLevel::Error,
            message,
        }
    }
}

/// Result of one `process_feed` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedReport {
    pub feed_id: Option<ResourceId>,
    pub entry_id: Option<ResourceId>,
    /// `Done` or `Failed`.
    pub stage: FeedStage,
    /// Last stage completed before the run ended.
    pub reached: FeedStage,
    pub contact_id: Option<ResourceId>,
    pub notes: Vec<FeedNote>,
}

impl FeedReport {
    pub fn succeeded(&self) -> bool {
        self.stage == FeedStage::Done
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.notes
            .iter()
            .filter(|n| n.level == NoteLevel::Error)
            .map(|n| n.message.as_str())
    }
}

/// Failures inside the workflow. Converted to notes at the boundary.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Unable to process feed because API could not be initialized.")]
    Unavailable,

    #[error("Unable to add recipient to segment: {0}")]
    CreateContact(ApiError),

    #[error("Unable to add recipient to segment: Mautic did not return a contact ID.")]
    MissingContactId,

    #[error("Unable to add contact #{contact_id} to segment #{segment_id}: {source}")]
    AttachContact {
        segment_id: ResourceId,
        contact_id: ResourceId,
        source: ApiError,
    },

    #[error("Could not load the contact lists: {0}")]
    LoadSegments(ApiError),

    #[error("Unable to process feed: {0}")]
    Panicked(String),
}

/// Why the processor has no API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    MissingCredentials,
    Rejected,
}

enum ApiState<T> {
    Ready(MauticApi<T>),
    Unavailable(Unavailable),
}

/// Runs feeds against one Mautic account.
pub struct FeedProcessor<T> {
    state: ApiState<T>,
}

impl<T: Transport> FeedProcessor<T> {
    /// Checks the credentials and probes them once. Blank credentials are
    /// rejected without any I/O.
    pub fn connect(settings: &Settings, transport: T) -> Self {
        let credentials = settings.credentials();
        if credentials.is_blank() {
            debug!("mautic credentials are not configured");
            return Self {
                state: ApiState::Unavailable(Unavailable::MissingCredentials),
            };
        }

        debug!("validating mautic credentials");
        let api = MauticApi::new(&settings.base_url, credentials, transport);
        let state = if api.valid_key() {
            debug!("mautic successfully authenticated");
            ApiState::Ready(api)
        } else {
            debug!("unable to authenticate with mautic");
            ApiState::Unavailable(Unavailable::Rejected)
        };
        Self { state }
    }

    pub fn api(&self) -> Option<&MauticApi<T>> {
        match &self.state {
            ApiState::Ready(api) => Some(api),
            ApiState::Unavailable(_) => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&Unavailable> {
        match &self.state {
            ApiState::Ready(_) => None,
            ApiState::Unavailable(reason) => Some(reason),
        }
    }

    /// Feeds can only be created against a working account.
    pub fn can_create_feed(&self) -> bool {
        self.api().is_some()
    }

    /// Sends one entry to the feed's segment.
    pub fn process_feed(&self, feed: &Feed, entry: &Entry) -> FeedReport {
        let mut reached = FeedStage::NotStarted;
        let mut contact_id = None;

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run(feed, entry, &mut reached, &mut contact_id)
        }))
        .unwrap_or_else(|panic| Err(FeedError::Panicked(panic_message(panic.as_ref()))));

        let (stage, note) = match outcome {
            Ok(segment_id) => {
                let message = format!(
                    "Successfully passed the lead details to the Mautic segment list #{}.",
                    feed.segment_id
                );
                info!(segment_id = %segment_id, contact_id = ?contact_id, "feed processed");
                (FeedStage::Done, FeedNote::success(message))
            }
            Err(err) => {
                error!(stage = ?reached, error = %err, "feed processing failed");
                (FeedStage::Failed, FeedNote::error(err.to_string()))
            }
        };

        FeedReport {
            feed_id: feed.id.clone(),
            entry_id: entry.id.clone(),
            stage,
            reached,
            contact_id,
            notes: vec![note],
        }
    }

    fn run(
        &self,
        feed: &Feed,
        entry: &Entry,
        reached: &mut FeedStage,
        contact_id: &mut Option<ResourceId>,
    ) -> Result<ResourceId, FeedError> {
        let api = self.api().ok_or(FeedError::Unavailable)?;
        *reached = FeedStage::CredentialsChecked;

        let segment_id = match api.get_segment(&feed.segment_id) {
            Ok(segment) => segment.id,
            Err(err) => {
                warn!(
                    segment_id = %feed.segment_id,
                    error = %err,
                    "segment lookup failed, using configured id"
                );
                feed.segment_id.clone()
            }
        };
        *reached = FeedStage::SegmentResolved;

        let contact = feed.mapping.build_contact(entry);
        debug!(fields = contact.len(), "creating contact");
        let created = api
            .create_contact(&contact)
            .map_err(FeedError::CreateContact)?;
        let id = created.id().ok_or(FeedError::MissingContactId)?;
        *contact_id = Some(id.clone());
        *reached = FeedStage::ContactCreated;

        api.add_contact_to_segment(&segment_id, &id)
            .map_err(|source| FeedError::AttachContact {
                segment_id: segment_id.clone(),
                contact_id: id.clone(),
                source,
            })?;
        *reached = FeedStage::SegmentAttached;

        Ok(segment_id)
    }

    /// Options for the segment picker: a placeholder, then `name (alias)`.
    pub fn segment_choices(&self) -> Result<Vec<Choice>, FeedError> {
        let api = self.api().ok_or(FeedError::Unavailable)?;
        let segments = api.get_segments().map_err(|err| {
            error!(error = %err, "could not retrieve the contact lists");
            FeedError::LoadSegments(err)
        })?;

        if segments.lists.is_empty() {
            error!("API returned an empty set of lists");
        }

        let mut choices = vec![Choice {
            label: "Select a Mautic list".to_string(),
            value: String::new(),
        }];
        choices.extend(segments.lists.into_iter().map(|segment| Choice {
            label: format!("{} ({})", segment.name, segment.alias),
            value: segment.id.to_string(),
        }));
        Ok(choices)
    }

    /// Segment name for the feed list, or the configured ID when it cannot
    /// be looked up.
    pub fn segment_column_value(&self, feed: &Feed) -> String {
        let Some(api) = self.api() else {
            return feed.segment_id.to_string();
        };
        match api.get_segment(&feed.segment_id) {
            Ok(segment) => segment.name,
            Err(err) => {
                error!(segment_id = %feed.segment_id, error = %err, "could not retrieve the contact list");
                feed.segment_id.to_string()
            }
        }
    }

    /// Custom-field rows for the feed settings. Empty when the account has
    /// none or they cannot be fetched.
    pub fn custom_field_map(&self) -> Vec<FieldMapEntry> {
        let Some(api) = self.api() else {
            return Vec::new();
        };
        match api.get_custom_fields() {
            Ok(fields) if !fields.is_empty() => field_map::custom_field_map(&fields),
            Ok(_) => {
                error!("API returned an empty set of custom fields");
                Vec::new()
            }
            Err(err) => {
                error!(error = %err, "could not retrieve custom fields");
                Vec::new()
            }
        }
    }
}

/// One option of a settings select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected failure".to_string())
}
