//! Client for the remote AI image-editing service.
//!
//! One request carries the source image, either a text instruction or a
//! second image (for try-on style edits), and an optional mask. Binary
//! payloads travel base64-encoded inside JSON:
//!
//! ```json
//! {"image": "...", "mime_type": "image/png", "instruction": "remove the car", "mask": "..."}
//! ```
//!
//! The reply is JSON with an `image` field holding either a `data:` URL or
//! raw base64, and an optional `message` explaining an empty result.
//!
//! There is no retry. Cancellation is the caller dropping the future or
//! ignoring a stale result (see `PreviewSession::begin_remote`).

use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RemoteConfig;
use crate::error::{Error, Result};

/// What the service should do with the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteInput {
    /// Free-text edit instruction.
    Instruction(String),
    /// Reference image (e.g. a garment for virtual try-on).
    SecondImage { bytes: Vec<u8>, mime_type: String },
}

/// One edit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    /// Encoded source image.
    pub image: Vec<u8>,
    pub mime_type: String,
    pub input: RemoteInput,
    /// Encoded white-on-black mask image, if the edit is local.
    pub mask: Option<Vec<u8>>,
}

#[derive(Serialize)]
struct RequestBody<'a> {
    image: String,
    mime_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instruction: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    second_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    second_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mask: Option<String>,
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    image: Option<String>,
    #[serde(default, alias = "text")]
    message: Option<String>,
}

impl RemoteRequest {
    /// Request driven by a text instruction.
    pub fn instruction(image: Vec<u8>, mime_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            image,
            mime_type: mime_type.into(),
            input: RemoteInput::Instruction(text.into()),
            mask: None,
        }
    }

    pub fn with_mask(mut self, mask: Vec<u8>) -> Self {
        self.mask = Some(mask);
        self
    }

    fn body(&self) -> RequestBody<'_> {
        let (instruction, second_image, second_mime_type) = match &self.input {
            RemoteInput::Instruction(text) => (Some(text.as_str()), None, None),
            RemoteInput::SecondImage { bytes, mime_type } => {
                (None, Some(general_purpose::STANDARD.encode(bytes)), Some(mime_type.as_str()))
            }
        };
        RequestBody {
            image: general_purpose::STANDARD.encode(&self.image),
            mime_type: &self.mime_type,
            instruction,
            second_image,
            second_mime_type,
            mask: self.mask.as_ref().map(|m| general_purpose::STANDARD.encode(m)),
        }
    }

    /// JSON body as sent on the wire.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.body())
            .map_err(|e| Error::InvalidInput(format!("request serialization failed: {e}")))
    }
}

/// HTTP client bound to one service endpoint.
pub struct RemoteClient {
    http_client: reqwest::Client,
    config: RemoteConfig,
}

impl RemoteClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Transport(format!("cannot create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    /// Send one request and return the produced image bytes.
    ///
    /// # Errors
    /// * `Transport` - unreachable, timeout, non-success status, oversized
    ///   or malformed reply
    /// * `EmptyResult` - the service answered without an image
    pub async fn submit(&self, request: &RemoteRequest) -> Result<Vec<u8>> {
        let body = request.to_json()?;
        debug!(endpoint = %self.config.endpoint, bytes = body.len(), "sending remote edit request");

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "remote service rejected request");
            return Err(Error::Transport(format!("HTTP {}", status.as_u16())));
        }

        let limit = self.config.max_response_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(Error::Transport(format!("reply exceeds {limit} bytes")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;
        if bytes.len() as u64 > limit {
            return Err(Error::Transport(format!("reply exceeds {limit} bytes")));
        }

        let image = parse_response(&bytes)?;
        info!(bytes = image.len(), "remote edit completed");
        Ok(image)
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Transport(format!("timed out after {}s", self.config.timeout_secs))
        } else if e.is_connect() {
            Error::Transport(format!("cannot connect: {e}"))
        } else {
            Error::Transport(format!("request failed: {e}"))
        }
    }
}

/// Extract the image bytes from a reply body.
pub fn parse_response(body: &[u8]) -> Result<Vec<u8>> {
    let reply: ResponseBody = serde_json::from_slice(body)
        .map_err(|e| Error::Transport(format!("malformed reply: {e}")))?;

    match reply.image.filter(|s| !s.trim().is_empty()) {
        Some(payload) => decode_payload(&payload),
        None => Err(Error::EmptyResult(
            reply
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "the service returned no image".to_string()),
        )),
    }
}

/// Decode a `data:<mime>;base64,<data>` URL or bare base64.
fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let data = match payload.find(";base64,") {
        Some(start) if payload.starts_with("data:") => &payload[start + 8..],
        _ => payload,
    };
    general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| Error::Transport(format!("malformed image payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_request_json_fields() {
        let request = RemoteRequest::instruction(vec![1, 2, 3], "image/png", "remove the car").with_mask(vec![255]);
        let value: serde_json::Value = serde_json::from_str(&request.to_json().unwrap()).unwrap();
        assert_eq!(value["image"], "AQID");
        assert_eq!(value["mime_type"], "image/png");
        assert_eq!(value["instruction"], "remove the car");
        assert_eq!(value["mask"], "/w==");
        assert!(value.get("second_image").is_none());
    }

    #[test]
    fn test_second_image_request() {
        let request = RemoteRequest {
            image: vec![0],
            mime_type: "image/jpeg".into(),
            input: RemoteInput::SecondImage { bytes: vec![9, 9], mime_type: "image/png".into() },
            mask: None,
        };
        let value: serde_json::Value = serde_json::from_str(&request.to_json().unwrap()).unwrap();
        assert_eq!(value["second_image"], "CQk=");
        assert_eq!(value["second_mime_type"], "image/png");
        assert!(value.get("instruction").is_none());
        assert!(value.get("mask").is_none());
    }

    #[test]
    fn test_parse_data_url_and_raw() {
        assert_eq!(parse_response(br#"{"image":"data:image/png;base64,AQID"}"#).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_response(br#"{"image":"AQID"}"#).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_empty_result_keeps_message() {
        match parse_response(br#"{"message":"no people found"}"#) {
            Err(Error::EmptyResult(msg)) => assert_eq!(msg, "no people found"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse_response(br#"{"image":""}"#), Err(Error::EmptyResult(_))));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_response(b"<html>"), Err(Error::Transport(_))));
        assert!(matches!(parse_response(br#"{"image":"***"}"#), Err(Error::Transport(_))));
    }

    /// Serve one canned HTTP reply on a local port.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // read headers, then the announced body
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).unwrap();
        });
        format!("http://{addr}/edit")
    }

    fn client_for(endpoint: String) -> RemoteClient {
        let config = RemoteConfig {
            endpoint,
            timeout_secs: 5,
            connect_timeout_secs: 2,
            ..RemoteConfig::default()
        };
        RemoteClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_submit_returns_image() {
        let client = client_for(serve_once("200 OK", r#"{"image":"data:image/png;base64,AQID"}"#));
        let request = RemoteRequest::instruction(vec![7; 16], "image/png", "brighten");
        assert_eq!(client.submit(&request).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_submit_http_error_is_transport() {
        let client = client_for(serve_once("500 Internal Server Error", "{}"));
        let request = RemoteRequest::instruction(vec![7], "image/png", "x");
        assert!(matches!(client.submit(&request).await, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_submit_empty_result() {
        let client = client_for(serve_once("200 OK", r#"{"message":"refused"}"#));
        let request = RemoteRequest::instruction(vec![7], "image/png", "x");
        assert!(matches!(client.submit(&request).await, Err(Error::EmptyResult(_))));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport() {
        // bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let client = client_for(format!("http://{addr}/edit"));
        let request = RemoteRequest::instruction(vec![7], "image/png", "x");
        let err = client.submit(&request).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "{err:?}");
    }
}
