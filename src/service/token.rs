//! HS256 JWT verification for agent connections.

use std::fmt;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use super::TokenVerifier;
use crate::domain::Identity;

/// `sub` may be issued as a number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Subject {
    Number(i64),
    Text(String),
}

impl Subject {
    fn user_id(&self) -> Option<i64> {
        match self {
            Self::Number(id) => Some(*id),
            Self::Text(text) => text.parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Subject,
    #[serde(default)]
    organization_id: Option<i64>,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies tokens signed with a shared HS256 secret.
///
/// `exp` is required and enforced.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// Creates a verifier for `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Option<Identity> {
        let data = match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                return None;
            }
        };
        let user_id = data.claims.sub.user_id()?;
        Some(Identity {
            user_id,
            organization_id: data.claims.organization_id,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    fn mint(secret: &str, claims: &serde_json::Value) -> String {
        let Ok(token) = encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        ) else {
            panic!("encode failed");
        };
        token
    }

    fn future_exp() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let verifier = JwtVerifier::new("s3cret");
        let token = mint(
            "s3cret",
            &json!({"sub": "11", "organization_id": 7, "email": "a@x.io", "exp": future_exp()}),
        );
        let Some(identity) = verifier.verify(&token).await else {
            panic!("token should verify");
        };
        assert_eq!(identity.user_id, 11);
        assert_eq!(identity.organization_id, Some(7));
    }

    #[tokio::test]
    async fn numeric_subject_is_accepted() {
        let verifier = JwtVerifier::new("s3cret");
        let token = mint("s3cret", &json!({"sub": 12, "exp": future_exp()}));
        assert_eq!(verifier.verify(&token).await.map(|i| i.user_id), Some(12));
    }

    #[tokio::test]
    async fn wrong_secret_or_expired_is_rejected() {
        let verifier = JwtVerifier::new("s3cret");
        let forged = mint("other", &json!({"sub": "11", "exp": future_exp()}));
        assert!(verifier.verify(&forged).await.is_none());

        let expired = mint("s3cret", &json!({"sub": "11", "exp": 1_000}));
        assert!(verifier.verify(&expired).await.is_none());

        assert!(verifier.verify("garbage").await.is_none());
    }
}
