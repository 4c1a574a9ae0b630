//! HS256 JWT implementation of `SessionTokens`.
//!
//! `exp` is checked against the caller-supplied clock rather than the library's
//! own, with zero leeway, so a token is rejected from the instant it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use domains::{IssuedToken, RoleId, SessionClaims, SessionTokens, TokenError, UserProfile};

/// Validity window used when none is configured.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

pub struct JwtSessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtSessionCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttl(secret, Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }

    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Like [`with_ttl`](Self::with_ttl), for a lifetime read from configuration.
    pub fn with_ttl_hours(secret: &[u8], hours: i64) -> Result<Self, TokenError> {
        match Duration::try_hours(hours) {
            Some(ttl) if hours > 0 => Ok(Self::with_ttl(secret, ttl)),
            _ => Err(TokenError::Signing(format!("token lifetime of {hours}h is out of range"))),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl SessionTokens for JwtSessionCodec {
    fn issue(
        &self,
        profile: &UserProfile,
        roles: &[RoleId],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("expiry is out of range".into()))?;
        let claims = SessionClaims {
            profile: profile.clone(),
            roles: roles.to_vec(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn parse(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| classify(e.kind()))?;

        if data.claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
