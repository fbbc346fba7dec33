use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use uuid::Uuid;

use notable_types::api::Claims;

use crate::error::AuthError;

/// Issues and validates HS256 session tokens. Issuance and validation share
/// the same secret held here, injected through app state at startup.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No expiry leeway: the configured TTL is the contract.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            validation,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_with_ttl(user_id, self.ttl)
    }

    pub fn issue_with_ttl(&self, user_id: Uuid, ttl: Duration) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id,
            exp: (Utc::now() + ttl).timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Returns the embedded claims exactly as issued, or the specific way
    /// the token failed.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::minutes(60))
    }

    #[test]
    fn roundtrip_preserves_subject() {
        let service = service();
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = service();
        let token = service
            .issue_with_ttl(Uuid::new_v4(), Duration::minutes(-2))
            .unwrap();

        assert_eq!(service.validate(&token).unwrap_err(), AuthError::ExpiredToken);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let service = service();
        let token = service.issue(Uuid::new_v4()).unwrap();

        // Flip the first character of the signature segment.
        let (head, sig) = token.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{}.{}{}", head, flipped, &sig[1..]);

        assert_eq!(
            service.validate(&tampered).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = service().issue(Uuid::new_v4()).unwrap();
        let other = TokenService::new("another-secret", Duration::minutes(60));

        assert_eq!(
            other.validate(&token).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            service().validate("not-a-token").unwrap_err(),
            AuthError::MalformedToken
        );
    }
}
