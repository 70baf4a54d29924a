//! Executing facade over `MauticClient`.
//!
//! Each call builds the request, hands it to the transport and parses the
//! response. A request that cannot be built (blank credentials) never
//! reaches the transport.

use tracing::debug;

use crate::client::MauticClient;
use crate::config::Credentials;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::{Contact, CreatedContact, CustomFieldDefinition, ResourceId, Segment, SegmentList};

/// The Mautic operations the feed workflow needs, bound to a transport.
#[derive(Debug, Clone)]
pub struct MauticApi<T> {
    client: MauticClient,
    transport: T,
}

impl<T: Transport> MauticApi<T> {
    pub fn new(base_url: &str, credentials: Credentials, transport: T) -> Self {
        Self {
            client: MauticClient::new(base_url, credentials),
            transport,
        }
    }

    pub fn client(&self) -> &MauticClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn get_segments(&self) -> Result<SegmentList, ApiError> {
        let req = self.client.build_get_segments()?;
        self.client.parse_get_segments(self.send(&req)?)
    }

    pub fn get_segment(&self, segment_id: &ResourceId) -> Result<Segment, ApiError> {
        let req = self.client.build_get_segment(segment_id)?;
        self.client.parse_get_segment(self.send(&req)?)
    }

    pub fn get_custom_fields(&self) -> Result<Vec<CustomFieldDefinition>, ApiError> {
        let req = self.client.build_get_custom_fields()?;
        self.client.parse_get_custom_fields(self.send(&req)?)
    }

    pub fn create_contact(&self, contact: &Contact) -> Result<CreatedContact, ApiError> {
        let req = self.client.build_create_contact(contact)?;
        self.client.parse_create_contact(self.send(&req)?)
    }

    pub fn add_contact_to_segment(
        &self,
        segment_id: &ResourceId,
        contact_id: &ResourceId,
    ) -> Result<(), ApiError> {
        let req = self
            .client
            .build_add_contact_to_segment(segment_id, contact_id)?;
        self.client.parse_add_contact_to_segment(self.send(&req)?)
    }

    /// Credential probe: the segment listing succeeds.
    pub fn valid_key(&self) -> bool {
        match self.get_segments() {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "credential probe failed");
                false
            }
        }
    }

    fn send(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.transport.execute(req)?;
        debug!(
            method = req.method.as_str(),
            url = %req.url,
            status = response.status,
            "mautic request completed"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubTransport;

    const SEGMENTS: &str = r#"{"total":1,"lists":{"42":{"id":42,"name":"Leads","alias":"leads"}}}"#;

    fn api(transport: &StubTransport) -> MauticApi<&StubTransport> {
        MauticApi::new("https://mautic.test/api", Credentials::new("admin", "secret"), transport)
    }

    #[test]
    fn blank_credentials_perform_no_io() {
        let transport = StubTransport::new();
        for (user, pass) in [("", "secret"), ("admin", "")] {
            let api = MauticApi::new("https://mautic.test/api", Credentials::new(user, pass), &transport);
            assert!(matches!(api.get_segments(), Err(ApiError::Configuration(_))));
            assert!(matches!(api.get_segment(&"42".into()), Err(ApiError::Configuration(_))));
            assert!(matches!(api.get_custom_fields(), Err(ApiError::Configuration(_))));
            assert!(matches!(api.create_contact(&Contact::new()), Err(ApiError::Configuration(_))));
            assert!(matches!(
                api.add_contact_to_segment(&"42".into(), &"7".into()),
                Err(ApiError::Configuration(_))
            ));
            assert!(!api.valid_key());
        }
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn valid_key_is_idempotent() {
        let transport = StubTransport::always(200, SEGMENTS);
        let api = api(&transport);
        assert!(api.valid_key());
        assert!(api.valid_key());
        assert_eq!(transport.calls(), 2);
        let urls = transport.urls();
        assert_eq!(urls[0], urls[1]);
    }

    #[test]
    fn valid_key_is_false_on_unauthorized() {
        let transport = StubTransport::new().reply(
            401,
            r#"{"errors":[{"code":401,"message":"API authorization denied.","type":"unauthorized"}]}"#,
        );
        assert!(!api(&transport).valid_key());
    }

    #[test]
    fn transport_failure_propagates_verbatim() {
        let transport = StubTransport::new().fail("dns error: no such host");
        let err = api(&transport).get_segment(&"42".into()).unwrap_err();
        assert_eq!(err, ApiError::Transport("dns error: no such host".to_string()));
    }

    #[test]
    fn create_then_attach() {
        let transport = StubTransport::new()
            .reply(201, r#"{"contact":{"id":7}}"#)
            .reply(200, r#"{"success":1}"#);
        let api = api(&transport);
        let contact: Contact = [("email", "a@b.com")].into_iter().collect();

        let created = api.create_contact(&contact).unwrap();
        let contact_id = created.id().unwrap();
        api.add_contact_to_segment(&"42".into(), &contact_id).unwrap();

        assert_eq!(
            transport.urls(),
            vec![
                "https://mautic.test/api/contacts/new".to_string(),
                "https://mautic.test/api/segments/42/contact/7/add".to_string(),
            ]
        );
    }
}
