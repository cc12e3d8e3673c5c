//! Signed Access Tokens
//!
//! HS256 JSON Web Tokens with issuer validation. The claims type is chosen
//! by the caller; it must carry the registered `iss`, `iat` and `exp` fields.

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Schemes accepted in the `Authorization` header
const ACCEPTED_SCHEMES: &[&str] = &["Token", "Bearer"];

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Signs and verifies HS256 tokens for a single issuer
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn hs256(secret: &[u8], issuer: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verify signature, issuer and expiry, then decode the claims
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        decode::<C>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }
}

/// Extract the raw token from an `Authorization` header value
///
/// Accepts `Token <jwt>` and `Bearer <jwt>` (scheme is case-insensitive).
/// Anything else, including extra whitespace-separated parts, is rejected.
pub fn parse_authorization(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;

    if parts.next().is_some() {
        return None;
    }

    ACCEPTED_SCHEMES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(scheme))
        .then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestClaims {
        iss: String,
        iat: i64,
        exp: i64,
        sub: String,
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn claims(iss: &str, exp_offset: i64) -> TestClaims {
        let iat = now();
        TestClaims {
            iss: iss.to_string(),
            iat,
            exp: iat + exp_offset,
            sub: "jake".to_string(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = TokenSigner::hs256(b"secret", "conduit");
        let issued = claims("conduit", 3600);

        let token = signer.sign(&issued).unwrap();
        let decoded: TestClaims = signer.verify(&token).unwrap();

        assert_eq!(decoded, issued);
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let token = TokenSigner::hs256(b"secret", "conduit")
            .sign(&claims("conduit", 3600))
            .unwrap();

        let other = TokenSigner::hs256(b"another-secret", "conduit");
        assert!(matches!(
            other.verify::<TestClaims>(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_issuer() {
        let signer = TokenSigner::hs256(b"secret", "conduit");
        let token = signer.sign(&claims("someone-else", 3600)).unwrap();

        assert!(matches!(
            signer.verify::<TestClaims>(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_expired() {
        let signer = TokenSigner::hs256(b"secret", "conduit");
        let token = signer.sign(&claims("conduit", -10)).unwrap();

        assert!(matches!(
            signer.verify::<TestClaims>(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let signer = TokenSigner::hs256(b"secret", "conduit");
        assert!(signer.verify::<TestClaims>("not.a.jwt").is_err());
    }

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_authorization("token abc"), Some("abc"));
        assert_eq!(parse_authorization("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization("abc"), None);
        assert_eq!(parse_authorization("Token"), None);
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("Token abc def"), None);
        assert_eq!(parse_authorization(""), None);
    }
}
