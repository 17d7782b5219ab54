//! Conditional forwarding of per-user OAuth credentials.
//!
//! Some data sources authenticate with the calling user's own OAuth
//! token instead of a statically configured credential. When a data
//! source opts in, the outbound `Authorization` header is replaced with
//! the user's current token; when the user has no token the headers pass
//! through untouched, since such sources mix authenticated and anonymous
//! access.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::models::UserRef;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// An OAuth token as held by the token store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    /// Scheme prefix for the header value, e.g. `Bearer`.
    pub token_type: String,
}

impl Token {
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Collaborator that resolves the calling user's current OAuth token.
#[async_trait]
pub trait OAuthTokenStore: Send + Sync {
    /// `None` when the user is not OAuth-authenticated or the store has
    /// no token for them. A miss is not an error.
    async fn current_token(&self, user: &UserRef) -> Option<Token>;
}

/// Produce the outbound header map for a backend call.
///
/// Returns a new map; the caller's headers are never mutated, so a
/// cached request template stays reusable. Idempotent: applying this
/// twice with the same store state yields the same `Authorization`
/// value.
pub async fn forward_oauth(
    headers: &HashMap<String, String>,
    enabled: bool,
    store: &dyn OAuthTokenStore,
    user: Option<&UserRef>,
) -> HashMap<String, String> {
    let mut out = headers.clone();
    if !enabled {
        return out;
    }
    let Some(user) = user else {
        return out;
    };
    if let Some(token) = store.current_token(user).await {
        debug!(login = %user.login, "forwarding user OAuth token to backend");
        out.insert(AUTHORIZATION_HEADER.to_string(), token.header_value());
    }
    out
}
