/// Session token generation and validation
///
/// A successful sign-in yields an HS256 JWT whose subject is the user ID. The
/// token carries identity only; the role is read from the store on every request
/// so a demoted admin loses access immediately.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable, 24 hours by default
/// - **Validation**: Signature, expiration, not-before and issuer checks
/// - **Secret**: At least 32 bytes, enforced by the API config
///
/// # Example
///
/// ```
/// use taskman_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "test-secret-key-at-least-32-bytes-long";
///
/// let token = create_token(&Claims::new(user_id), secret)?;
/// let claims = validate_token(&token, secret)?;
///
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of the `iss` claim
pub const ISSUER: &str = "taskman";

/// Lifetime of a token issued by [`Claims::new`]
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Longest lifetime the API accepts for session tokens (one year)
pub const MAX_TTL_HOURS: i64 = 8760;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer")]
    InvalidIssuer,
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "taskman"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Claims for `user_id` with the default lifetime
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self::issued(user_id, now, now + Duration::hours(DEFAULT_TTL_HOURS))
    }

    /// Claims for `user_id` expiring after `expires_in`
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::CreateError`] when the expiry is past the last
    /// representable date.
    pub fn with_expiration(user_id: Uuid, expires_in: Duration) -> Result<Self, JwtError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(expires_in)
            .ok_or_else(|| JwtError::CreateError("Token expiry is out of range".to_string()))?;

        Ok(Self::issued(user_id, now, exp))
    }

    /// Claims for `user_id` expiring after `hours`
    pub fn with_ttl_hours(user_id: Uuid, hours: i64) -> Result<Self, JwtError> {
        let expires_in = Duration::try_hours(hours).ok_or_else(|| {
            JwtError::CreateError(format!("Token lifetime of {hours} hours is out of range"))
        })?;

        Self::with_expiration(user_id, expires_in)
    }

    fn issued(user_id: Uuid, now: DateTime<Utc>, exp: DateTime<Utc>) -> Self {
        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a token and returns its claims
///
/// Rejects a bad signature, an expired or not-yet-valid token, and any issuer
/// other than [`ISSUER`].
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
