//! JWT token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::infrastructure::config::JwtConfig;
use crate::shared::constants::roles;

/// Claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub iss: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub idp_userid: Option<String>,
    #[serde(default, rename = "loginSource")]
    pub login_source: Option<String>,
    #[serde(default)]
    pub realm_access: RealmAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.realm_access.roles.iter().any(|r| r == role)
    }

    pub fn is_staff(&self) -> bool {
        self.has_role(roles::STAFF)
    }

    /// Identity-provider user id; falls back to `sub`
    pub fn idp_userid(&self) -> &str {
        self.idp_userid.as_deref().unwrap_or(&self.sub)
    }
}

/// Raw bearer token of the current request, forwarded to sibling services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// JWT verification service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

impl JwtService {
    /// HS256 verifier (and signer) from a shared secret
    pub fn new(secret: &str, issuer: Option<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        Self::configure(&mut validation, issuer, None);
        Self {
            encoding_key: Some(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verifier built from configuration; an RS256 public key wins over a secret
    pub fn from_config(config: &JwtConfig) -> Result<Self, AuthError> {
        if let Some(pem) = &config.public_key {
            let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AuthError::AuthenticationFailed(format!("invalid public key: {}", e)))?;
            let mut validation = Validation::new(Algorithm::RS256);
            Self::configure(&mut validation, config.issuer.clone(), config.audience.clone());
            return Ok(Self {
                encoding_key: None,
                decoding_key,
                validation,
            });
        }

        let secret = config
            .secret
            .as_deref()
            .ok_or_else(|| AuthError::AuthenticationFailed("no JWT secret or public key configured".into()))?;
        let mut service = Self::new(secret, config.issuer.clone());
        Self::configure(&mut service.validation, config.issuer.clone(), config.audience.clone());
        Ok(service)
    }

    fn configure(validation: &mut Validation, issuer: Option<String>, audience: Option<String>) {
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
    }

    /// Signs claims; only available for secret-based services
    pub fn generate_token(&self, claims: &Claims) -> Result<String, AuthError> {
        let key = self
            .encoding_key
            .as_ref()
            .ok_or_else(|| AuthError::AuthenticationFailed("signing key not available".into()))?;
        encode(&Header::default(), claims, key)
            .map_err(|e| AuthError::AuthenticationFailed(format!("token generation failed: {}", e)))
    }

    /// Verifies a token and returns its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Claims for a token valid for one hour
pub fn claims_for(sub: &str, issuer: &str, roles: &[&str]) -> Claims {
    let now = Utc::now();
    Claims {
        sub: sub.to_string(),
        iss: issuer.to_string(),
        exp: (now + Duration::hours(1)).timestamp(),
        iat: Some(now.timestamp()),
        username: Some(sub.to_string()),
        realm_access: RealmAccess {
            roles: roles.iter().map(|r| r.to_string()).collect(),
        },
        ..Claims::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_roles() {
        let service = JwtService::new("test-secret", Some("issuer".into()));
        let token = service.generate_token(&claims_for("user-1", "issuer", &["staff"])).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.is_staff());
        assert!(!claims.has_role("system"));
        assert_eq!(claims.idp_userid(), "user-1");
    }

    #[test]
    fn test_rejects_wrong_issuer_and_expired() {
        let service = JwtService::new("test-secret", Some("issuer".into()));
        let other = JwtService::new("test-secret", Some("someone-else".into()));
        let token = other.generate_token(&claims_for("u", "someone-else", &[])).unwrap();
        assert!(matches!(service.verify_token(&token), Err(AuthError::InvalidToken)));

        let mut expired = claims_for("u", "issuer", &[]);
        expired.exp = (Utc::now() - Duration::hours(2)).timestamp();
        let token = service.generate_token(&expired).unwrap();
        assert!(matches!(service.verify_token(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_from_config_requires_key_material() {
        let config = JwtConfig {
            secret: None,
            public_key: None,
            issuer: None,
            audience: None,
        };
        assert!(JwtService::from_config(&config).is_err());
    }
}
