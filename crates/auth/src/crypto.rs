use super::claims::Claims;

/// Why a credential could not be verified.
#[derive(Debug)]
pub enum AuthError {
    /// `JWT_SECRET` is absent; refusing to start beats silently
    /// accepting tokens signed with an empty key.
    MissingSecret,
    /// Signature, shape, or expiry check failed.
    BadToken(jsonwebtoken::errors::Error),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSecret => write!(f, "JWT_SECRET is not set"),
            Self::BadToken(e) => write!(f, "token rejected: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

/// Validates bearer tokens against the shared signing secret.
///
/// Production tokens come from the external issuance service holding the
/// same secret; [`issue`](Self::issue) exists for tests and local
/// tooling only.
pub struct Verifier {
    decoding: jsonwebtoken::DecodingKey,
    encoding: jsonwebtoken::EncodingKey,
}

impl Verifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding: jsonwebtoken::DecodingKey::from_secret(secret),
            encoding: jsonwebtoken::EncodingKey::from_secret(secret),
        }
    }
    /// Builds from `JWT_SECRET`, failing fast when it is missing.
    pub fn from_env() -> Result<Self, AuthError> {
        std::env::var("JWT_SECRET")
            .map(|secret| Self::new(secret.as_bytes()))
            .map_err(|_| AuthError::MissingSecret)
    }
    /// Checks signature and expiry, yielding the verified claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = jsonwebtoken::Validation::default();
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::BadToken)
    }
    /// Signs claims with this verifier's secret (tests and tooling).
    pub fn issue(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), claims, &self.encoding)
            .map_err(AuthError::BadToken)
    }
}
