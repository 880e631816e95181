use bytes::Bytes;
use elevatr_api::{ApiEnvelope, ErrorKind};
use mime::Mime;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Error;

/// A fully received HTTP response, before any interpretation.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    pub async fn read(resp: reqwest::Response) -> Result<Self, Error> {
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let body = resp.bytes().await.map_err(Error::transport)?;
        Ok(Self {
            status,
            content_type,
            body,
        })
    }

    #[inline]
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `false` only when the server declared a content type that
    /// is not JSON. A missing header is tolerated.
    fn is_json(&self) -> bool {
        let Some(content_type) = &self.content_type else {
            return true;
        };
        content_type
            .parse::<Mime>()
            .map(|m| {
                m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON)
            })
            .unwrap_or(false)
    }
}

/// Interprets a response as an [`ApiEnvelope`] with `success: true`.
///
/// `fallback` is used as the error message when the server rejects the
/// request without saying why.
pub fn decode_envelope<T: DeserializeOwned>(
    raw: RawResponse,
    fallback: &str,
) -> Result<ApiEnvelope<T>, Error> {
    if !raw.is_success() {
        let server_message = serde_json::from_slice::<Value>(&raw.body)
            .ok()
            .and_then(|v| v.get("error")?.as_str().map(ToOwned::to_owned));
        return Err(Error::new(
            format!("request failed with status {}", raw.status),
            ErrorKind::Status(raw.status),
        )
        .with_server_message(server_message));
    }

    if !raw.is_json() {
        return Err(Error::new(
            format!("unexpected content type: {:?}", raw.content_type),
            ErrorKind::MalformedResponse,
        ));
    }

    // The envelope must at least be an object with a boolean `success`.
    let value: Value = serde_json::from_slice(&raw.body)
        .map_err(|err| Error::malformed(format!("invalid JSON: {err}")))?;
    if !value.get("success").is_some_and(Value::is_boolean) {
        return Err(Error::malformed("missing `success` field"));
    }
    let envelope: ApiEnvelope<T> = serde_json::from_value(value)
        .map_err(|err| Error::malformed(format!("unexpected shape: {err}")))?;

    if !envelope.success {
        let server_message = envelope.error.clone();
        return Err(Error::new(
            server_message.clone().unwrap_or_else(|| fallback.to_owned()),
            ErrorKind::Rejected,
        )
        .with_server_message(server_message));
    }

    Ok(envelope)
}

/// Takes the `data` payload out of a successful envelope.
#[inline]
pub fn require_data<T>(envelope: ApiEnvelope<T>) -> Result<T, Error> {
    envelope
        .data
        .ok_or_else(|| Error::malformed("missing `data` field"))
}

#[cfg(test)]
mod tests {
    use elevatr_api::{BackendError, ChatReply};
    use serde_json::json;

    use super::*;

    fn raw(status: u16, content_type: Option<&str>, body: Value) -> RawResponse {
        RawResponse {
            status,
            content_type: content_type.map(ToOwned::to_owned),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_success() {
        let resp = raw(
            200,
            Some("application/json; charset=utf-8"),
            json!({
                "success": true,
                "data": {
                    "message": "Hi!",
                    "messageId": "m1",
                    "conversationId": "c1",
                    "isNewConversation": true
                }
            }),
        );
        let envelope = decode_envelope::<ChatReply>(resp, "failed").unwrap();
        let reply = require_data(envelope).unwrap();
        assert_eq!(reply.message, "Hi!");
    }

    #[test]
    fn test_status_with_server_message() {
        let resp = raw(
            400,
            Some("application/json"),
            json!({ "success": false, "error": "Message is too long" }),
        );
        let err = decode_envelope::<ChatReply>(resp, "failed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status(400));
        assert_eq!(err.server_message(), Some("Message is too long"));
    }

    #[test]
    fn test_status_without_body() {
        let resp = RawResponse {
            status: 502,
            content_type: Some("text/html".to_owned()),
            body: Bytes::from_static(b"<html>Bad Gateway</html>"),
        };
        let err = decode_envelope::<ChatReply>(resp, "failed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status(502));
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn test_rejected_uses_fallback() {
        let resp = raw(200, None, json!({ "success": false }));
        let err = decode_envelope::<ChatReply>(resp, "Failed to load")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(err.message(), "Failed to load");
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn test_missing_success() {
        let resp = raw(200, None, json!({ "data": {} }));
        let err = decode_envelope::<ChatReply>(resp, "failed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_wrong_content_type() {
        let resp = RawResponse {
            status: 200,
            content_type: Some("text/html".to_owned()),
            body: Bytes::from_static(b"<html></html>"),
        };
        let err = decode_envelope::<ChatReply>(resp, "failed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_missing_data() {
        let resp = raw(200, None, json!({ "success": true }));
        let envelope = decode_envelope::<ChatReply>(resp, "failed").unwrap();
        let err = require_data(envelope).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }
}
