//! HS256 session tokens issued by the external identity provider.
//!
//! The service never mints tokens itself. It only verifies the bearer token a
//! caller presents and maps the outcome onto a [`SignInState`].

use character_votes_flow::{Identity, IdentityProvider, SignInAffordances, SignInState};
use character_votes_shared::types::UserId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::AuthSettings;

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject, the user's stable identifier.
    pub sub: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Display name, when the provider includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
    affordances: SignInAffordances,
}

impl JwtIdentityProvider {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &settings.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            validation,
            affordances: SignInAffordances {
                sign_in_url: settings.sign_in_url.clone(),
                sign_up_url: settings.sign_up_url.clone(),
            },
        }
    }

    /// Validate and decode a token, returning the embedded [`Claims`].
    ///
    /// Checks the signature, the expiration and, when configured, the issuer.
    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(token_data.claims)
    }
}

/// Failures of the provider itself rather than of the caller's token.
fn is_provider_failure(kind: &ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::Crypto(_)
    )
}

#[async_trait::async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, token: Option<&str>) -> SignInState {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return SignInState::SignedOut;
        };

        match self.validate_token(token) {
            Ok(claims) if claims.sub.is_empty() => {
                debug!("Rejecting token with an empty subject");
                SignInState::SignedOut
            }
            Ok(claims) => SignInState::SignedIn(Identity {
                user_id: UserId::new(claims.sub),
                display_name: claims.name,
            }),
            Err(e) if is_provider_failure(e.kind()) => {
                error!(error = %e, "Identity provider could not verify token");
                SignInState::Loading
            }
            Err(e) => {
                debug!(error = %e, "Rejecting session token");
                SignInState::SignedOut
            }
        }
    }

    fn affordances(&self) -> SignInAffordances {
        self.affordances.clone()
    }
}
