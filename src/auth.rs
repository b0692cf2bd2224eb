//! Bearer token verification
//!
//! Tokens are issued elsewhere (signup, login, OAuth). This service only checks
//! the signature and expiry and reads the owner id from the `userId` claim.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub exp: u64,
}

/// Authenticated owner identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

pub struct AuthGate {
    key: DecodingKey,
    validation: Validation,
}

impl AuthGate {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Returns the owner behind `token`, or `None` if it does not verify.
    pub fn identify(&self, token: &str) -> Option<Owner> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) if !data.claims.user_id.is_empty() => Some(Owner(data.claims.user_id)),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(error = %err, "rejected bearer token");
                None
            }
        }
    }

    /// Reads the `Authorization: Bearer <token>` header and identifies its owner.
    ///
    /// A missing or malformed header is a normal anonymous request.
    pub fn identify_headers(&self, headers: &HeaderMap) -> Option<Owner> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))?;

        self.identify(token.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_secret";

    fn token(user_id: &str, secret: &str, exp_offset: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + exp_offset) as u64;
        let claims = Claims {
            user_id: user_id.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_owner() {
        let gate = AuthGate::new(SECRET);
        let owner = gate.identify(&token("user_1", SECRET, 3600));
        assert_eq!(owner, Some(Owner("user_1".to_string())));
    }

    #[test]
    fn wrong_secret_is_anonymous() {
        let gate = AuthGate::new(SECRET);
        assert_eq!(gate.identify(&token("user_1", "other", 3600)), None);
    }

    #[test]
    fn expired_token_is_anonymous() {
        let gate = AuthGate::new(SECRET);
        assert_eq!(gate.identify(&token("user_1", SECRET, -3600)), None);
    }

    #[test]
    fn garbage_is_anonymous() {
        let gate = AuthGate::new(SECRET);
        assert_eq!(gate.identify("not.a.jwt"), None);
    }

    #[test]
    fn header_requires_bearer_scheme() {
        let gate = AuthGate::new(SECRET);
        let jwt = token("user_1", SECRET, 3600);

        let mut headers = HeaderMap::new();
        assert_eq!(gate.identify_headers(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_str(&jwt).unwrap());
        assert_eq!(gate.identify_headers(&headers), None);

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {jwt}")).unwrap(),
        );
        assert_eq!(
            gate.identify_headers(&headers),
            Some(Owner("user_1".to_string()))
        );
    }
}
