use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::{credentials::Credentials, EventHandler};

/// Grant type of the OAuth2 token exchange.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of the signed assertion sent to the token endpoint.
const ASSERTION_LIFETIME: Duration = Duration::from_secs(300);

/// A cached token is treated as expired this long before its declared
/// expiry, to absorb clock skew and in-flight latency.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Token lifetime assumed when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("failed to sign the token assertion: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    #[error("token request failed: {0}")]
    Exchange(#[from] Box<ureq::Error>),

    #[error("invalid JSON in token response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("token response is missing the access token")]
    MissingToken,
}

impl From<ureq::Error> for AuthError {
    fn from(value: ureq::Error) -> Self {
        AuthError::Exchange(Box::new(value))
    }
}

/// Claim set of the signed assertion, per the CLMS token docs.
#[derive(serde::Serialize)]
struct Claims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

/// Produces bearer tokens for the CLMS API.
///
/// The provider owns the token cache. The client is used from a single
/// thread, so the cache needs no locking; re-issuance is its only
/// mutation point.
pub(crate) struct TokenProvider {
    credentials: Credentials,
    cached: Option<CachedToken>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl TokenProvider {
    pub fn new(credentials: Credentials) -> Self {
        TokenProvider {
            credentials,
            cached: None,
        }
    }

    /// Return a bearer token for the CLMS API.
    ///
    /// The token from a previous exchange is reused while more than
    /// [`EXPIRY_MARGIN`] remains before its declared expiry. Otherwise
    /// a new assertion is signed and exchanged with a single request.
    pub fn access_token<E: EventHandler>(
        &mut self,
        agent: &ureq::Agent,
        events: &E,
    ) -> Result<String, AuthError> {
        if let Some(cached) = &self.cached {
            if Instant::now() + EXPIRY_MARGIN < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        events.token_request(&self.credentials.token_uri);

        let assertion = self.sign_assertion()?;

        let response = agent
            .post(&self.credentials.token_uri)
            .set("Accept", "application/json")
            .send_form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])?;

        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
            expires_in: Option<u64>,
        }

        let tokens: TokenResponse = serde_json::from_reader(response.into_reader())?;

        let token = tokens.access_token.ok_or(AuthError::MissingToken)?;
        let expires_in = tokens.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);

        self.cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        });

        Ok(token)
    }

    fn sign_assertion(&self) -> Result<String, jsonwebtoken::errors::Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let claims = Claims {
            iss: &self.credentials.client_id,
            sub: &self.credentials.user_id,
            aud: &self.credentials.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME.as_secs(),
        };

        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        jsonwebtoken::encode(&header, &claims, &self.credentials.signing_key)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tiny_http::Response;

    use super::*;
    use crate::http::tests::{http_server, test_credentials};
    use crate::NoEventHandler;

    /// Token endpoint issuing `token-N` tokens, counting the exchanges.
    fn token_endpoint(body_template: &'static str, exchanges: Arc<AtomicUsize>) -> u16 {
        http_server(move |_, mut req| {
            let mut body = String::new();
            req.as_reader().read_to_string(&mut body).unwrap();

            assert!(
                body.contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
            );
            assert!(body.contains("assertion="));

            let n = exchanges.fetch_add(1, Ordering::SeqCst);
            let json = body_template.replace("{n}", &n.to_string());
            req.respond(Response::from_string(json)).expect("send token");

            true
        })
    }

    fn agent() -> ureq::Agent {
        ureq::AgentBuilder::new().build()
    }

    #[test]
    fn cached_token_is_reused() {
        let exchanges = Arc::new(AtomicUsize::new(0));
        let port = token_endpoint(
            r#"{"access_token": "token-{n}", "expires_in": 3600}"#,
            exchanges.clone(),
        );

        let mut provider = TokenProvider::new(test_credentials(port));

        let first = provider.access_token(&agent(), &NoEventHandler).unwrap();
        let second = provider.access_token(&agent(), &NoEventHandler).unwrap();

        assert_eq!(first, "token-0");
        assert_eq!(second, "token-0");
        assert_eq!(exchanges.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn token_within_the_expiry_margin_is_replaced() {
        // The declared lifetime does not exceed the skew margin, so the
        // cached token is already stale on the second call.
        let exchanges = Arc::new(AtomicUsize::new(0));
        let port = token_endpoint(
            r#"{"access_token": "token-{n}", "expires_in": 60}"#,
            exchanges.clone(),
        );

        let mut provider = TokenProvider::new(test_credentials(port));

        let first = provider.access_token(&agent(), &NoEventHandler).unwrap();
        let second = provider.access_token(&agent(), &NoEventHandler).unwrap();

        assert_eq!(first, "token-0");
        assert_eq!(second, "token-1");
        assert_eq!(exchanges.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_expiry_defaults_to_an_hour() {
        let exchanges = Arc::new(AtomicUsize::new(0));
        let port = token_endpoint(r#"{"access_token": "token-{n}"}"#, exchanges.clone());

        let mut provider = TokenProvider::new(test_credentials(port));

        provider.access_token(&agent(), &NoEventHandler).unwrap();
        provider.access_token(&agent(), &NoEventHandler).unwrap();

        assert_eq!(exchanges.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_exchange_is_an_error() {
        let port = http_server(|_, req| {
            let response = Response::from_string("server error").with_status_code(500);
            req.respond(response).expect("send response");
            true
        });

        let mut provider = TokenProvider::new(test_credentials(port));
        let error = provider.access_token(&agent(), &NoEventHandler).unwrap_err();

        assert!(matches!(error, AuthError::Exchange(_)));
    }

    #[test]
    fn missing_access_token_is_an_error() {
        let port = http_server(|_, req| {
            let response = Response::from_string(r#"{"expires_in": 3600}"#);
            req.respond(response).expect("send response");
            true
        });

        let mut provider = TokenProvider::new(test_credentials(port));
        let error = provider.access_token(&agent(), &NoEventHandler).unwrap_err();

        assert!(matches!(error, AuthError::MissingToken));
    }
}
