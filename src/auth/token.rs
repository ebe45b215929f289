// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token issuance and verification.
//!
//! Tokens are RS256 JWTs asserting "user `sub` acting within account `aud`,
//! authenticated via `amr`, until `exp`". Key material is injected once at
//! construction; rotating keys means building a new [`TokenService`].
//!
//! ## Security
//!
//! - Only RSA-family algorithms are accepted on verify. Any other `alg`
//!   header (HMAC, EC, `none`) is rejected before signature checking, which
//!   closes the algorithm-confusion hole where a public key is replayed as
//!   an HMAC secret.
//! - `exp` is the single validity window. There is no refresh or revocation.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::models::AuthMethod;

/// Default token lifetime (24 hours).
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Algorithm used for issued tokens.
const ISSUE_ALGORITHM: Algorithm = Algorithm::RS256;

/// Algorithms accepted on verify.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: canonical user name (`users/{slug}`)
    pub sub: String,
    /// Audience: bare account identifier
    pub aud: String,
    /// Authentication method reference
    pub amr: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

impl TokenClaims {
    /// Parsed `amr` claim, if it names a known method.
    pub fn auth_method(&self) -> Option<AuthMethod> {
        self.amr.parse().ok()
    }
}

/// Errors raised while loading key material.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid PEM: {0}")]
    Pem(#[from] pem::PemError),

    #[error("{role} key must be RSA (found PEM block '{tag}')")]
    NotRsa { role: &'static str, tag: String },

    #[error("invalid RSA key: {0}")]
    Rsa(#[from] jsonwebtoken::errors::Error),
}

/// Signing/verification key pair. Either half may be absent; the matching
/// operation then fails with an internal error.
#[derive(Clone, Default)]
pub struct TokenKeys {
    signing: Option<EncodingKey>,
    verifying: Option<DecodingKey>,
}

impl TokenKeys {
    /// Load keys from PEM text.
    ///
    /// The signing key must be an RSA private key (PKCS#1 or PKCS#8); the
    /// verification key an RSA public key (SPKI or PKCS#1).
    pub fn from_pem(signing: Option<&[u8]>, verifying: Option<&[u8]>) -> Result<Self, KeyError> {
        Self::default().with_signing(signing)?.with_verifying(verifying)
    }

    /// Set the signing half from an RSA private key PEM. `None` leaves it unset.
    pub fn with_signing(mut self, pem: Option<&[u8]>) -> Result<Self, KeyError> {
        if let Some(bytes) = pem {
            check_pem_tag(bytes, "sign", &["RSA PRIVATE KEY", "PRIVATE KEY"])?;
            self.signing = Some(EncodingKey::from_rsa_pem(bytes)?);
        }
        Ok(self)
    }

    /// Set the verification half from an RSA public key PEM. `None` leaves it unset.
    pub fn with_verifying(mut self, pem: Option<&[u8]>) -> Result<Self, KeyError> {
        if let Some(bytes) = pem {
            check_pem_tag(bytes, "verify", &["PUBLIC KEY", "RSA PUBLIC KEY"])?;
            self.verifying = Some(DecodingKey::from_rsa_pem(bytes)?);
        }
        Ok(self)
    }

    pub fn can_sign(&self) -> bool {
        self.signing.is_some()
    }

    pub fn can_verify(&self) -> bool {
        self.verifying.is_some()
    }
}

fn check_pem_tag(bytes: &[u8], role: &'static str, accepted: &[&str]) -> Result<(), KeyError> {
    let block = pem::parse(bytes)?;
    if accepted.contains(&block.tag()) {
        Ok(())
    } else {
        Err(KeyError::NotRsa {
            role,
            tag: block.tag().to_string(),
        })
    }
}

/// Stateless token issuer/verifier. Cheap to share; requires no locking.
#[derive(Clone)]
pub struct TokenService {
    keys: TokenKeys,
    expiration: Duration,
}

impl TokenService {
    pub fn new(keys: TokenKeys, expiration: Duration) -> Self {
        Self { keys, expiration }
    }

    /// Token lifetime.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    /// Issue a signed token for `subject` within `audience`.
    pub fn issue(
        &self,
        subject: &str,
        audience: &str,
        auth_method: AuthMethod,
    ) -> Result<String, AuthError> {
        self.issue_at(subject, audience, auth_method, Utc::now().timestamp())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &str,
        audience: &str,
        auth_method: AuthMethod,
        issued_at: i64,
    ) -> Result<String, AuthError> {
        let key = self
            .keys
            .signing
            .as_ref()
            .ok_or(AuthError::SigningKeyMissing)?;

        let lifetime = i64::try_from(self.expiration.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            sub: subject.to_string(),
            aud: audience.to_string(),
            amr: auth_method.as_str().to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(lifetime),
        };

        encode(&Header::new(ISSUE_ALGORITHM), &claims, key)
            .map_err(|e| AuthError::SigningFailed(e.to_string()))
    }

    /// Verify signature, algorithm and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let key = self
            .keys
            .verifying
            .as_ref()
            .ok_or(AuthError::VerifyingKeyMissing)?;

        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::DisallowedAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(ISSUE_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // Issuer and verifier share a clock.
        validation.leeway = 0;
        // Audience is matched against the target account by the caller.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        let token_data = decode::<TokenClaims>(token, key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => {
                AuthError::DisallowedAlgorithm(format!("{:?}", header.alg))
            }
            ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
            _ => AuthError::MalformedToken,
        })?;

        Ok(token_data.claims)
    }
}
