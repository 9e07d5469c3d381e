/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Session token generation and validation
/// - [`middleware`]: Bearer-token middleware that resolves the [`middleware::CurrentUser`]
/// - [`authorization`]: Ownership and role predicates
///
/// # Example
///
/// ```
/// use taskman_shared::auth::jwt::{create_token, validate_token, Claims};
/// use taskman_shared::auth::password::{hash_password, verify_password, HashingParams};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password", &HashingParams::fast())?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(Uuid::new_v4()), "secret-key-at-least-32-bytes-long")?;
/// validate_token(&token, "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
