// Box API HTTP client
//
// Wraps `reqwest::Client` with box-specific URL construction, bearer
// authentication, and JSON / blob decoding. The client is stateless with
// respect to origin and session: callers pass both per request because
// the reachable origin and the session token change at runtime.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

const JSON_MIME: &str = "application/json";

/// Build `<origin>/api/v<version>/<path>`.
///
/// Leading slashes on `path` and trailing slashes on `origin` are
/// collapsed so `https://box:3000/` + `/services` yields a single separator.
pub fn api_url(origin: &Url, version: u32, path: &str) -> Result<Url, Error> {
    let full = format!(
        "{}/api/v{version}/{}",
        origin.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&full)?)
}

/// Raw HTTP client for the box API.
#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
}

impl HubClient {
    /// Create a new hub client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Create a hub client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// The underlying HTTP client (shared with discovery).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Reachability ─────────────────────────────────────────────────

    /// Request `<origin>/ping`. Any 2xx counts as reachable; transport
    /// failures and other statuses count as unreachable. Never errors.
    pub async fn ping(&self, origin: &Url) -> bool {
        let url = format!("{}/ping", origin.as_str().trim_end_matches('/'));
        trace!(%url, "ping");

        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(%url, error = %e, "ping failed");
                false
            }
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request and decode the JSON response.
    ///
    /// An empty response body decodes as JSON `null`, so callers asking for
    /// `serde_json::Value` or `Option<T>` tolerate verbs that answer with
    /// no content.
    pub async fn request_json<B, T>(
        &self,
        method: Method,
        url: Url,
        session: Option<&SecretString>,
        body: Option<&B>,
    ) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("{method} {url}");

        let resp = self
            .build(method, url, session, body, JSON_MIME)
            .send()
            .await
            .map_err(Error::Transport)?;
        let resp = check_status(resp).await?;

        let text = resp.text().await.map_err(Error::Transport)?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };

        serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text.to_owned(),
        })
    }

    /// Send a request and return the raw response bytes.
    pub async fn request_blob<B>(
        &self,
        method: Method,
        url: Url,
        session: Option<&SecretString>,
        body: Option<&B>,
        accept: &str,
    ) -> Result<Bytes, Error>
    where
        B: Serialize + ?Sized,
    {
        debug!("{method} {url} (blob, accept {accept})");

        let resp = self
            .build(method, url, session, body, accept)
            .send()
            .await
            .map_err(Error::Transport)?;
        let resp = check_status(resp).await?;

        resp.bytes().await.map_err(Error::Transport)
    }

    fn build<B>(
        &self,
        method: Method,
        url: Url,
        session: Option<&SecretString>,
        body: Option<&B>,
        accept: &str,
    ) -> reqwest::RequestBuilder
    where
        B: Serialize + ?Sized,
    {
        let carries_body = method != Method::GET && method != Method::HEAD;
        let mut req = self.http.request(method, url).header(ACCEPT, accept);

        if let Some(token) = session {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }

        if carries_body {
            req = req.header(CONTENT_TYPE, JSON_MIME);
            if let Some(body) = body {
                req = req.json(body);
            }
        }

        req
    }
}

/// Turn a non-2xx response into [`Error::Status`], keeping the body text.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status {
        status: status.as_u16(),
        url,
        body,
    })
}
