use jsonwebtoken::EncodingKey;

/// Token endpoint of the production CLMS service, used when no other
/// URI is configured.
pub const DEFAULT_TOKEN_URI: &str = "https://land.copernicus.eu/@@oauth2-token";

/// Errors from [`Credentials::new`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid RSA private key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
}

/// Credentials of a CLMS service key.
///
/// The values come from the service key created in the CLMS user
/// profile: the OAuth2 client identifier, the user identifier, and the
/// PEM-encoded RSA private key used to sign token assertions.
///
/// Credentials are immutable for the lifetime of the process. The key
/// material is validated at construction, before any network call.
#[derive(Clone)]
pub struct Credentials {
    pub(crate) client_id: String,
    pub(crate) user_id: String,
    pub(crate) signing_key: EncodingKey,
    pub(crate) token_uri: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        user_id: impl Into<String>,
        private_key: &str,
    ) -> Result<Self, ConfigError> {
        let client_id = client_id.into();
        if client_id.is_empty() {
            return Err(ConfigError::MissingField("client id"));
        }

        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(ConfigError::MissingField("user id"));
        }

        if private_key.trim().is_empty() {
            return Err(ConfigError::MissingField("private key"));
        }

        let signing_key = EncodingKey::from_rsa_pem(private_key.as_bytes())?;

        Ok(Credentials {
            client_id,
            user_id,
            signing_key,
            token_uri: DEFAULT_TOKEN_URI.to_owned(),
        })
    }

    /// Replace the default token endpoint.
    pub fn token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = uri.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_RSA_KEY: &str = include_str!("../tests/data/rsa_key.pem");

    #[test]
    fn valid_key_is_accepted() {
        let credentials = Credentials::new("client", "user", TEST_RSA_KEY).unwrap();
        assert_eq!(credentials.token_uri, DEFAULT_TOKEN_URI);

        let credentials = credentials.token_uri("http://127.0.0.1:8080/token");
        assert_eq!(credentials.token_uri, "http://127.0.0.1:8080/token");
    }

    #[test]
    fn empty_fields_are_rejected() {
        assert!(matches!(
            Credentials::new("", "user", TEST_RSA_KEY),
            Err(ConfigError::MissingField("client id")),
        ));

        assert!(matches!(
            Credentials::new("client", "", TEST_RSA_KEY),
            Err(ConfigError::MissingField("user id")),
        ));

        assert!(matches!(
            Credentials::new("client", "user", " "),
            Err(ConfigError::MissingField("private key")),
        ));
    }

    #[test]
    fn invalid_key_material_is_rejected() {
        assert!(matches!(
            Credentials::new("client", "user", "not a PEM key"),
            Err(ConfigError::InvalidKey(_)),
        ));
    }
}
