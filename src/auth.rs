use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Minimum required key length (256 bits of hex or base64 material)
pub const MIN_KEY_LENGTH: usize = 32;

/// The user a request acts for. Every row a request writes carries this id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AuthConfigError {
    #[error("API_KEYS environment variable is not set")]
    Missing,

    #[error("Malformed API_KEYS entry '{0}' (expected user_id:key)")]
    Malformed(String),

    #[error("API key for user '{user}' is too weak (length: {length}, minimum: 32)")]
    WeakKey { user: String, length: usize },

    #[error("No API keys configured")]
    Empty,
}

/// API key to user id mapping
#[derive(Clone, Default)]
pub struct ApiKeys {
    keys: Arc<HashMap<String, String>>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys").field("count", &self.keys.len()).finish()
    }
}

impl ApiKeys {
    /// Parse `user_id:key,user_id:key`.
    pub fn parse(raw: &str) -> Result<Self, AuthConfigError> {
        let mut keys = HashMap::new();

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (user, key) = entry
                .split_once(':')
                .map(|(u, k)| (u.trim(), k.trim()))
                .filter(|(u, k)| !u.is_empty() && !k.is_empty())
                .ok_or_else(|| AuthConfigError::Malformed(entry.chars().take(8).collect()))?;

            if key.len() < MIN_KEY_LENGTH {
                return Err(AuthConfigError::WeakKey {
                    user: user.to_string(),
                    length: key.len(),
                });
            }
            keys.insert(key.to_string(), user.to_string());
        }

        if keys.is_empty() {
            return Err(AuthConfigError::Empty);
        }

        Ok(ApiKeys {
            keys: Arc::new(keys),
        })
    }

    /// Load keys from `API_KEYS`
    ///
    /// # Errors
    /// Fails when the variable is missing, malformed or carries a key shorter
    /// than [`MIN_KEY_LENGTH`]; the server refuses to start without authentication.
    pub fn from_env() -> Result<Self, AuthConfigError> {
        let raw = std::env::var("API_KEYS").map_err(|_| AuthConfigError::Missing)?;
        let keys = Self::parse(&raw)?;
        tracing::info!("✓ API authentication initialized with {} valid key(s)", keys.len());
        Ok(keys)
    }

    pub fn resolve(&self, key: &str) -> Option<CurrentUser> {
        self.keys.get(key).map(|id| CurrentUser { id: id.clone() })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Middleware to require a Bearer API key and attach the [`CurrentUser`]
pub async fn require_auth(
    State(keys): State<ApiKeys>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let user = match auth_header {
        Some(auth) => match auth.strip_prefix("Bearer ") {
            Some(key) => match keys.resolve(key.trim()) {
                Some(user) => user,
                None => {
                    tracing::warn!("Invalid API key attempted");
                    return Err(StatusCode::UNAUTHORIZED);
                }
            },
            None => {
                tracing::warn!("Invalid Authorization header format (expected Bearer token)");
                return Err(StatusCode::UNAUTHORIZED);
            }
        },
        None => {
            tracing::warn!("Missing Authorization header");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const KEY_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn test_api_key_resolution() {
        let keys = ApiKeys::parse(&format!("alice:{}, bob:{}", KEY_A, KEY_B)).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.resolve(KEY_A), Some(CurrentUser { id: "alice".to_string() }));
        assert_eq!(keys.resolve(KEY_B).map(|u| u.id), Some("bob".to_string()));
        assert_eq!(keys.resolve("unknown"), None);
    }

    #[test]
    fn test_rejects_weak_and_malformed_keys() {
        assert_eq!(
            ApiKeys::parse("alice:short").unwrap_err(),
            AuthConfigError::WeakKey {
                user: "alice".to_string(),
                length: 5
            }
        );
        assert!(matches!(
            ApiKeys::parse(KEY_A),
            Err(AuthConfigError::Malformed(_))
        ));
        assert_eq!(ApiKeys::parse(" , ").unwrap_err(), AuthConfigError::Empty);
    }
}
