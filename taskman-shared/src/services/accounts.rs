//! Account registration, sign-in and maintenance.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};
use uuid::Uuid;

use super::{ServiceError, ServiceResult, TAKEN};
use crate::auth::authorization::{can_administer_users, can_manage_user};
use crate::auth::password::{hash_password, verify_password, HashingParams};
use crate::models::user::{
    normalize_email, NewUserRecord, Registration, Role, User, UserChanges, UserRecordChanges,
};
use crate::store::Store;
use crate::validation::ValidationErrors;

/// Hashed once and verified against when the email is unknown
const DUMMY_PASSWORD: &str = "taskman-unknown-account";

/// Reason recorded when a non-admin tries to grant or change a role
pub const ADMIN_ONLY: &str = "can only be assigned by an admin";

/// Account operations over a [`Store`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    hashing: HashingParams,
    dummy_hash: Arc<OnceLock<String>>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, hashing: HashingParams) -> Self {
        Self {
            store,
            hashing,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Validates a sign-up form and creates the account.
    ///
    /// All field problems, including a taken email, are reported together.
    pub async fn register(&self, mut form: Registration) -> ServiceResult<User> {
        form.email = normalize_email(&form.email);

        let (role, mut errors) = match form.check() {
            Ok(role) => (role, ValidationErrors::new()),
            Err(errors) => (Default::default(), errors),
        };

        if !errors.has_field("email") && self.store.find_user_by_email(&form.email).await?.is_some()
        {
            errors.add("email", TAKEN);
        }
        errors.into_result()?;

        let password_hash = hash_password(&form.password, &self.hashing)?;
        let user = self
            .store
            .insert_user(NewUserRecord {
                email: form.email,
                password_hash,
                role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Registration on behalf of a caller, who may be anonymous.
    ///
    /// Only an admin may create another admin.
    pub async fn sign_up(&self, actor: Option<&User>, form: Registration) -> ServiceResult<User> {
        let wants_admin = form.role.as_deref() == Some(Role::Admin.as_str());
        if wants_admin && !actor.map(can_administer_users).unwrap_or(false) {
            let mut errors = form.check().err().unwrap_or_default();
            errors.add("role", ADMIN_ONLY);
            return Err(errors.into());
        }

        self.register(form).await
    }

    /// Creates an admin account unless the email is already registered.
    ///
    /// Returns `None` when the account already exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> ServiceResult<Option<User>> {
        if self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let user = self
            .register(Registration {
                email: email.to_string(),
                password: password.to_string(),
                password_confirmation: password.to_string(),
                role: Some(Role::Admin.as_str().to_string()),
            })
            .await?;
        Ok(Some(user))
    }

    /// Returns the account matching the credentials.
    ///
    /// Unknown email and wrong password give the same error, and both run one
    /// Argon2 verification.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let email = normalize_email(email);

        match self.store.find_user_by_email(&email).await? {
            Some(user) => {
                if verify_password(password, &user.password_hash)? {
                    debug!(user_id = %user.id, "Credentials verified");
                    Ok(user)
                } else {
                    debug!(user_id = %user.id, "Wrong password");
                    Err(ServiceError::AuthenticationFailed)
                }
            }
            None => {
                let _ = verify_password(password, self.dummy_hash()?)?;
                debug!("Sign-in for unknown email");
                Err(ServiceError::AuthenticationFailed)
            }
        }
    }

    pub async fn find(&self, id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.store.find_user(id).await?)
    }

    /// Changes email, password or role of `user_id`.
    ///
    /// Returns `None` when the account is missing or the actor may not manage
    /// it. The stored hash is replaced only when `password` is present and does
    /// not already verify against it.
    pub async fn update(
        &self,
        actor: &User,
        user_id: Uuid,
        mut changes: UserChanges,
    ) -> ServiceResult<Option<User>> {
        if !can_manage_user(actor, user_id) {
            debug!(actor_id = %actor.id, %user_id, "Account update denied");
            return Ok(None);
        }
        let Some(current) = self.store.find_user(user_id).await? else {
            return Ok(None);
        };

        changes.email = changes.email.as_deref().map(normalize_email);

        let (role, mut errors) = match changes.check() {
            Ok(role) => (role, ValidationErrors::new()),
            Err(errors) => (None, errors),
        };

        let role = role.filter(|role| *role != current.role);
        if role.is_some() && !can_administer_users(actor) {
            errors.add("role", ADMIN_ONLY);
        }

        let email = changes.email.filter(|email| *email != current.email);
        if let Some(email) = &email {
            if !errors.has_field("email") {
                if let Some(other) = self.store.find_user_by_email(email).await? {
                    if other.id != current.id {
                        errors.add("email", TAKEN);
                    }
                }
            }
        }
        errors.into_result()?;

        let password_hash = match changes.password.as_deref() {
            Some(password) if !verify_password(password, &current.password_hash)? => {
                Some(hash_password(password, &self.hashing)?)
            }
            _ => None,
        };

        let record = UserRecordChanges {
            email,
            password_hash,
            role,
        };
        if record.is_empty() {
            return Ok(Some(current));
        }

        let password_changed = record.password_hash.is_some();
        let updated = self.store.update_user(user_id, record).await?;

        if let Some(user) = &updated {
            info!(
                user_id = %user.id,
                actor_id = %actor.id,
                role = %user.role,
                password_changed,
                "User updated"
            );
        }
        Ok(updated)
    }

    /// Deletes an account and everything it owns. Admins only.
    pub async fn delete(&self, actor: &User, user_id: Uuid) -> ServiceResult<bool> {
        if !can_administer_users(actor) {
            debug!(actor_id = %actor.id, %user_id, "Account deletion denied");
            return Ok(false);
        }

        let deleted = self.store.delete_user(user_id).await?;
        if deleted {
            info!(%user_id, actor_id = %actor.id, "User deleted");
        }
        Ok(deleted)
    }

    fn dummy_hash(&self) -> ServiceResult<&str> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash);
        }
        let hash = hash_password(DUMMY_PASSWORD, &self.hashing)?;
        Ok(self.dummy_hash.get_or_init(|| hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::store::MemoryStore;

    fn service() -> (AccountService, MemoryStore) {
        let store = MemoryStore::new();
        let service = AccountService::new(Arc::new(store.clone()), HashingParams::fast());
        (service, store)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "secret1".to_string(),
            password_confirmation: "secret1".to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let (service, _) = service();

        let user = service.register(registration("  Ann@Example.COM ")).await.unwrap();

        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.role, Role::Regular);
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_reports_taken_email_with_other_errors() {
        let (service, store) = service();
        service.register(registration("ann@example.com")).await.unwrap();
        let writes = store.write_count();

        let mut form = registration("ANN@example.com");
        form.password_confirmation = "other".to_string();

        match service.register(form).await {
            Err(ServiceError::ValidationFailed(errors)) => {
                assert_eq!(errors.reasons_for("email"), vec![TAKEN]);
                assert!(errors.has_field("password_confirmation"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_dummy_hash_is_computed_once() {
        let (service, _) = service();

        let first = service.dummy_hash().unwrap().to_string();
        let second = service.dummy_hash().unwrap().to_string();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_update_without_changes_skips_store() {
        let (service, store) = service();
        let ann = service.register(registration("ann@example.com")).await.unwrap();
        let writes = store.write_count();

        let updated = service
            .update(&ann, ann.id, UserChanges::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.password_hash, ann.password_hash);
        assert_eq!(store.write_count(), writes);
    }
}
