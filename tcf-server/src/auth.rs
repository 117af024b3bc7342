//! Bearer token verification
//!
//! Tokens are issued by the external auth provider and signed with a shared
//! HS256 secret. The server only verifies them and maps `sub` to a user row.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience the provider puts on user session tokens
pub const AUDIENCE: &str = "authenticated";

/// Cookie carrying the session token for browser clients
pub const SESSION_COOKIE: &str = "tc_session";

/// Claims read from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Provider account id
    pub sub: Uuid,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,

    #[error("token has expired")]
    Expired,

    #[error("invalid token")]
    Invalid,
}

/// Verifies provider-issued tokens
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                kind => {
                    tracing::debug!(?kind, "token rejected");
                    AuthError::Invalid
                }
            })
    }
}

/// Extract the raw token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Extract the session token from a `Cookie` header value.
pub fn session_cookie(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub(crate) const SECRET: &str = "test-secret-with-enough-length-for-hs256";

    pub(crate) fn token_for(sub: Uuid, exp_offset_secs: i64, aud: &str) -> String {
        let claims = Claims {
            sub,
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
            email: Some("buyer@example.com".into()),
            aud: Some(aud.into()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let sub = Uuid::new_v4();
        let claims = TokenVerifier::new(SECRET)
            .verify(&token_for(sub, 3600, AUDIENCE))
            .unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.email.as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn rejects_expired_token() {
        let token = token_for(Uuid::new_v4(), -3600, AUDIENCE);
        assert_eq!(TokenVerifier::new(SECRET).verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn rejects_wrong_audience_and_secret() {
        let verifier = TokenVerifier::new(SECRET);
        let wrong_aud = token_for(Uuid::new_v4(), 3600, "anon");
        assert_eq!(verifier.verify(&wrong_aud), Err(AuthError::Invalid));

        let other = TokenVerifier::new("a-different-secret-of-similar-length!!");
        let token = token_for(Uuid::new_v4(), 3600, AUDIENCE);
        assert_eq!(other.verify(&token), Err(AuthError::Invalid));
        assert_eq!(verifier.verify("not.a.jwt"), Err(AuthError::Invalid));
    }

    #[test]
    fn header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);

        assert_eq!(session_cookie("theme=dark; tc_session=tok123"), Some("tok123"));
        assert_eq!(session_cookie("theme=dark"), None);
    }
}
