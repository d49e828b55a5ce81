//! Omnichannel platform adapter.
//!
//! Translates room operations into authenticated REST calls against the
//! platform. Successful responses carry nothing we need, so bodies are
//! ignored; failures surface as [`ClientError`] unchanged.

mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
pub use webhook::*;

use crate::{
    client::{ClientError, ClientResult, HttpClient},
    config::OmnichannelConfig,
    sanitizer::Sanitizer,
};

const ROOM_TAG_CREATE_PATH: &str = "/api/v1/room_tag/create";
const MARK_AS_RESOLVED_PATH: &str = "/api/v1/admin/service/mark_as_resolved";

/// Room operations on the chat platform.
#[async_trait]
pub trait Omnichannel: Send + Sync {
    /// Attach `tag` to the room.
    async fn tag_room(&self, room_id: &str, tag: &str) -> ClientResult<()>;

    /// Mark the room's session as resolved.
    ///
    /// Resolving an already resolved room is expected to be harmless on the
    /// platform side; nothing here checks it.
    async fn resolve_room(&self, room_id: &str) -> ClientResult<()>;
}

#[derive(Serialize)]
struct TagRoomRequest<'a> {
    room_id: &'a str,
    tag: &'a str,
}

#[derive(Serialize)]
struct ResolveRoomRequest<'a> {
    room_id: &'a str,
}

/// [`Omnichannel`] backed by the Qiscus omnichannel REST API.
pub struct QiscusOmnichannel {
    client: HttpClient,
    base_url: String,
    auth_headers: HeaderMap,
}

impl QiscusOmnichannel {
    pub fn new(
        client: HttpClient,
        base_url: &str,
        app_id_header: &str,
        app_id: &str,
        secret_key_header: &str,
        secret_key: &str,
    ) -> ClientResult<Self> {
        let mut auth_headers = HeaderMap::new();
        auth_headers.insert(
            parse_header_name(app_id_header)?,
            parse_header_value(app_id_header, app_id)?,
        );
        let mut secret = parse_header_value(secret_key_header, secret_key)?;
        secret.set_sensitive(true);
        auth_headers.insert(parse_header_name(secret_key_header)?, secret);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_headers,
        })
    }

    /// Build the adapter and its HTTP client from configuration.
    ///
    /// When `debug` is on, request bodies are logged through `sanitizer`.
    pub fn from_config(
        config: &OmnichannelConfig,
        sanitizer: Arc<Sanitizer>,
    ) -> ClientResult<Self> {
        let client = HttpClient::new(&config.http_client, config.retry.clone())?
            .with_debug(config.debug);
        let client = if config.debug {
            client.with_sanitizer(sanitizer)
        } else {
            client
        };

        Self::new(
            client,
            &config.base_url,
            &config.app_id_header,
            &config.app_id,
            &config.secret_key_header,
            &config.secret_key,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Omnichannel for QiscusOmnichannel {
    async fn tag_room(&self, room_id: &str, tag: &str) -> ClientResult<()> {
        let body = TagRoomRequest { room_id, tag };
        self.client
            .call(
                Method::POST,
                &self.url(ROOM_TAG_CREATE_PATH),
                Some(&body),
                &self.auth_headers,
            )
            .await?;

        tracing::debug!(room_id = %room_id, tag = %tag, "Tagged room");
        Ok(())
    }

    async fn resolve_room(&self, room_id: &str) -> ClientResult<()> {
        let body = ResolveRoomRequest { room_id };
        self.client
            .call(
                Method::POST,
                &self.url(MARK_AS_RESOLVED_PATH),
                Some(&body),
                &self.auth_headers,
            )
            .await?;

        tracing::debug!(room_id = %room_id, "Marked room as resolved");
        Ok(())
    }
}

fn parse_header_name(name: &str) -> ClientResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ClientError::InvalidRequest(format!("invalid header name '{name}'")))
}

fn parse_header_value(name: &str, value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::InvalidRequest(format!("invalid value for header '{name}'")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    use super::*;
    use crate::config::{HttpClientConfig, RetryConfig};

    fn adapter(server: &MockServer, max_retries: u32) -> QiscusOmnichannel {
        let retry = RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            ..Default::default()
        };
        let client = HttpClient::new(&HttpClientConfig::default(), retry).unwrap();
        QiscusOmnichannel::new(
            client,
            &format!("{}/", server.uri()),
            "Qiscus-App-Id",
            "app-1",
            "Qiscus-Secret-Key",
            "secret-1",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_tag_room() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/room_tag/create"))
            .and(header("Qiscus-App-Id", "app-1"))
            .and(header("Qiscus-Secret-Key", "secret-1"))
            .and(body_json(json!({"room_id": "room-123", "tag": "room-123"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        adapter(&server, 3)
            .tag_room("room-123", "room-123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resolve_room() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/admin/service/mark_as_resolved"))
            .and(header("Qiscus-App-Id", "app-1"))
            .and(header("Qiscus-Secret-Key", "secret-1"))
            .and(body_json(json!({"room_id": "room-123"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;

        adapter(&server, 3).resolve_room("room-123").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_propagates_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/admin/service/mark_as_resolved"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let error = adapter(&server, 3)
            .resolve_room("room-123")
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
        assert_eq!(error.raw_body(), Some("bad credentials"));
    }

    #[tokio::test]
    async fn test_resolve_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/admin/service/mark_as_resolved"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let error = adapter(&server, 1)
            .resolve_room("room-123")
            .await
            .unwrap_err();
        assert!(matches!(error, ClientError::RetriesExhausted { attempts: 2, .. }));
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let client =
            HttpClient::new(&HttpClientConfig::default(), RetryConfig::default()).unwrap();
        let result = QiscusOmnichannel::new(
            client,
            "https://platform.test",
            "bad header",
            "app-1",
            "Qiscus-Secret-Key",
            "secret-1",
        );
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }
}
