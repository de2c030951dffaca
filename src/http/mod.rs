
use std::time::Duration;

use crate::auth::{AuthError, TokenProvider};
use crate::credentials::Credentials;
use crate::EventHandler;

/// Base URL of the production CLMS download API.
pub(crate) const DEFAULT_API_BASE: &str = "https://land.copernicus.eu/api";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Timeout for token, search and metadata calls.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for file transfers.
const TRANSFER_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read timeout for file transfers. Generous, since the pre-packaged
/// rasters are multi-gigabyte archives.
const TRANSFER_READ_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] Box<ureq::Error>),
}

impl From<ureq::Error> for RequestError {
    fn from(value: ureq::Error) -> Self {
        RequestError::Http(Box::new(value))
    }
}

/// HTTP client for the CLMS API.
///
/// Every request carries a bearer token obtained, and cached, by the
/// [`TokenProvider`]. The client is used from a single thread; the
/// token cache has a single mutation point behind `&mut self` and
/// needs no locking.
pub(crate) struct Client<'a, E> {
    api: ureq::Agent,
    transfer: ureq::Agent,
    tokens: TokenProvider,
    event_handler: &'a E,
    api_base: String,
}

impl<'a, E: EventHandler> Client<'a, E> {
    pub fn new(credentials: Credentials, api_base: String, event_handler: &'a E) -> Self {
        let api = ureq::AgentBuilder::new()
            .timeout_connect(API_TIMEOUT)
            .timeout_read(API_TIMEOUT)
            .build();

        let transfer = ureq::AgentBuilder::new()
            .timeout_connect(TRANSFER_CONNECT_TIMEOUT)
            .timeout_read(TRANSFER_READ_TIMEOUT)
            .build();

        Client {
            api,
            transfer,
            tokens: TokenProvider::new(credentials),
            event_handler,
            api_base,
        }
    }

    pub fn events(&self) -> &'a E {
        self.event_handler
    }

    /// URL for a path under the API base.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Send an authenticated `GET` request to the API.
    pub fn get(&mut self, url: &str, query: &[(&str, &str)]) -> Result<ureq::Response, RequestError> {
        let request = self.api.get(url).set("Accept", "application/json");
        let request = query.iter().fold(request, |r, (k, v)| r.query(k, v));

        self.send(request)
    }

    /// Open an authenticated, streamed `GET` request for a file
    /// transfer. Uses the long read timeout.
    pub fn get_stream(&mut self, url: &str) -> Result<ureq::Response, RequestError> {
        let request = self.transfer.get(url);

        self.send(request)
    }

    fn send(&mut self, request: ureq::Request) -> Result<ureq::Response, RequestError> {
        let token = self.tokens.access_token(&self.api, self.event_handler)?;

        self.event_handler.api_request(request.url());

        let response = request
            .set("User-Agent", USER_AGENT)
            .set("Authorization", &format!("Bearer {token}"))
            .call()?;

        Ok(response)
    }
}
