//! The HTTP transport the operations send through.
//!
//! The core never retries, pools, or times out on its own; all of that
//! belongs to the transport.

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Method};
use tracing::debug;

use crate::config::TransportOptions;
use crate::request::{AssembledRequest, Headers, HttpMethod};
use crate::response::RawResponse;
use crate::TransportError;

/// Sends one assembled request and reads the full response into memory.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &AssembledRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn with_options(options: &TransportOptions) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self { client: builder.build()? })
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &AssembledRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.uri);

        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => headers
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string()),
                Err(_) => debug!("dropping non-ASCII response header '{}'", name.as_str()),
            }
        }

        let has_length = response.headers().contains_key(CONTENT_LENGTH);
        let body = response.bytes().await?;
        Ok(RawResponse {
            status,
            headers,
            body: response_body(body.to_vec(), has_length),
        })
    }
}

/// `None` for a bodiless reply (nothing read, no `Content-Length`);
/// an explicit `Content-Length: 0` stays an empty body.
fn response_body(bytes: Vec<u8>, has_content_length: bool) -> Option<Vec<u8>> {
    if bytes.is_empty() && !has_content_length {
        None
    } else {
        Some(bytes)
    }
}
