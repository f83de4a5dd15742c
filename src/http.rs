//! HTTP transport used by the broker client and the file fetcher.
use std::io::Read;
use std::time::Duration;

use crate::error::GillError;

/// Response to a GET request. The body is streamed.
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Read the remaining body into a string.
    pub fn text(mut self) -> Result<String, GillError> {
        let mut text = String::new();
        self.body.read_to_string(&mut text)?;
        Ok(text)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Blocking HTTP GET with a per-request timeout.
pub trait HttpClient: Send {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, GillError>;
}

/// [HttpClient] backed by [reqwest::blocking::Client].
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> ReqwestClient {
        ReqwestClient::default()
    }

    pub fn with_client(client: reqwest::blocking::Client) -> ReqwestClient {
        ReqwestClient { client }
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, GillError> {
        let response = self.client.get(url).timeout(timeout).send()?;
        Ok(HttpResponse {
            status: response.status().as_u16(),
            body: Box::new(response),
        })
    }
}
