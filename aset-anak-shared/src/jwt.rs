use jsonwebtoken::{self, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id.
    pub sub: String,
    pub email: String,
    /// Session id; the matching session row must exist for the token to be valid.
    pub jti: String,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Decode(String),
    #[error("encoding failed: {0}")]
    Encode(String),
}

pub fn decode_and_verify(token: &str, secret: &[u8]) -> Result<JwtClaims, JwtError> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<JwtClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::Decode(e.to_string()))
}

pub fn encode(claims: &JwtClaims, secret: &[u8]) -> Result<String, JwtError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| JwtError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp: i64) -> JwtClaims {
        JwtClaims {
            sub: "user-1".into(),
            email: "ibu@example.com".into(),
            jti: "session-1".into(),
            exp,
        }
    }

    #[test]
    fn verifies_with_the_signing_secret_only() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = encode(&claims(exp), b"secret").unwrap();
        assert_eq!(decode_and_verify(&token, b"secret").unwrap(), claims(exp));
        assert!(decode_and_verify(&token, b"other").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = encode(&claims(exp), b"secret").unwrap();
        assert!(matches!(
            decode_and_verify(&token, b"secret"),
            Err(JwtError::Decode(_))
        ));
    }
}
