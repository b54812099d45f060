use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Network-layer failure: connect, timeout, TLS, body read.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response that is not handled more specifically.
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("authentication failed - check email and password")]
    AuthenticationFailed,

    #[error("token verification failed: {0}")]
    TokenInvalid(String),

    #[error("the CA bundle is invalid or doesn't exist")]
    InvalidCaBundle,

    #[error("the API token is malformed; expected \"<tenant-id>/<secret>\"")]
    InvalidApiToken,

    #[error("not logged in - call login(email, password) first")]
    NotLoggedIn,

    #[error("no tenant selected - call select_tenant(tenant) first")]
    TenantNotSelected,

    #[error("no tenant named {0:?}")]
    TenantNotFound(String),

    #[error("identity token lists more than one tenant named {0:?}")]
    DuplicateTenantName(String),

    #[error("tenant token refresh requires an identity token; log in with email and password")]
    RefreshUnavailable,

    /// GraphQL errors reported by the server, carried verbatim.
    #[error("query returned errors: {}", serde_json::Value::Array(.0.clone()))]
    Query(Vec<serde_json::Value>),

    #[error("invalid API URL: {0}")]
    InvalidApiUrl(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("no bundled query named {0:?}")]
    UnknownQuery(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maximum length of a response body quoted in an error message.
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl Error {
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let body = if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        };
        Error::Status { status, body }
    }
}
