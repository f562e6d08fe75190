// Authorization header lookup. A bearer token wins; username and password
// are the fallback. The resulting string is passed around as-is.

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub const ACCESS_TOKEN_ENV: &str = "PORTAL_BACKEND_ACCESS_TOKEN";
pub const USERNAME_ENV: &str = "PORTAL_BACKEND_USERNAME";
pub const PASSWORD_ENV: &str = "PORTAL_BACKEND_PASSWORD";

#[derive(Debug, thiserror::Error)]
#[error(
    "Missing authentication! Please specify either PORTAL_BACKEND_ACCESS_TOKEN or PORTAL_BACKEND_USERNAME and PORTAL_BACKEND_PASSWORD"
)]
pub struct MissingCredentials;

/// Build the `Authorization` header value from the process environment.
pub fn authorization_header() -> Result<String, MissingCredentials> {
    authorization_header_from(|key| std::env::var(key).ok())
}

/// Same as [`authorization_header`], reading variables through `lookup`.
pub fn authorization_header_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, MissingCredentials> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(token) = non_empty(ACCESS_TOKEN_ENV) {
        return Ok(format!("Bearer {token}"));
    }

    match (non_empty(USERNAME_ENV), non_empty(PASSWORD_ENV)) {
        (Some(user), Some(password)) => {
            let encoded = STANDARD.encode(format!("{user}:{password}"));
            Ok(format!("Basic {encoded}"))
        }
        _ => Err(MissingCredentials),
    }
}
