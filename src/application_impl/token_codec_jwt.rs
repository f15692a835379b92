use crate::application_port::{CodecError, TokenCodec};
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key material and fixed claims for HS256 tokens. Built once at startup and
/// never mutated afterwards.
#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub signing_key: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String, // user id as string
    jti: String,
    typ: TokenKind,
    iat: i64,
    exp: i64,
    iss: String,
    aud: String,
}

pub struct JwtHs256Codec {
    issuer: String,
    audience: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_audience(&[cfg.audience.clone()]);
        validation.set_issuer(&[cfg.issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            issuer: cfg.issuer,
            audience: cfg.audience,
            validation,
        }
    }

    fn timestamp(secs: i64, field: &str) -> Result<DateTime<Utc>, CodecError> {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| CodecError::Malformed(format!("{field} out of range")))
    }

    fn into_claims(wire: WireClaims) -> Result<TokenClaims, CodecError> {
        let subject = wire
            .sub
            .parse::<UserId>()
            .map_err(|e| CodecError::Malformed(format!("sub: {e}")))?;
        let jti = wire
            .jti
            .parse::<Jti>()
            .map_err(|e| CodecError::Malformed(format!("jti: {e}")))?;
        let issued_at = Self::timestamp(wire.iat, "iat")?;
        let expires_at = Self::timestamp(wire.exp, "exp")?;
        if issued_at > expires_at {
            return Err(CodecError::Malformed("iat after exp".to_string()));
        }

        Ok(TokenClaims {
            subject,
            jti,
            kind: wire.typ,
            issued_at,
            expires_at,
        })
    }
}

impl TokenCodec for JwtHs256Codec {
    fn sign(&self, claims: &TokenClaims) -> Result<String, CodecError> {
        let wire = WireClaims {
            sub: claims.subject.to_string(),
            jti: claims.jti.to_string(),
            typ: claims.kind,
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        encode(&Header::new(Algorithm::HS256), &wire, &self.encoding_key)
            .map_err(|e| CodecError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, CodecError> {
        let data = decode::<WireClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    CodecError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => CodecError::Expired,
                _ => CodecError::Malformed(e.to_string()),
            },
        )?;
        Self::into_claims(data.claims)
    }
}
