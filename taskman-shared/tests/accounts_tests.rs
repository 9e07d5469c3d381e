/// Integration tests for account registration, sign-in and maintenance
///
/// These run against the in-memory store with cheap hashing parameters.

use std::sync::Arc;

use taskman_shared::auth::password::{verify_password, HashingParams};
use taskman_shared::models::task::NewTask;
use taskman_shared::models::user::{Registration, Role, User, UserChanges};
use taskman_shared::services::{AccountService, ServiceError, TaskService};
use taskman_shared::store::{MemoryStore, Store};

struct Harness {
    store: MemoryStore,
    accounts: AccountService,
}

impl Harness {
    fn new() -> Self {
        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        Self {
            accounts: AccountService::new(shared, HashingParams::fast()),
            store,
        }
    }

    async fn register(&self, email: &str, password: &str, role: Role) -> User {
        self.accounts
            .register(Registration {
                email: email.to_string(),
                password: password.to_string(),
                password_confirmation: password.to_string(),
                role: Some(role.as_str().to_string()),
            })
            .await
            .expect("registration should succeed")
    }

    async fn stored(&self, user: &User) -> User {
        self.store
            .find_user(user.id)
            .await
            .unwrap()
            .expect("user should exist")
    }
}

fn validation_errors<T: std::fmt::Debug>(
    result: Result<T, ServiceError>,
) -> taskman_shared::validation::ValidationErrors {
    match result {
        Err(ServiceError::ValidationFailed(errors)) => errors,
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_authenticate_round_trip() {
    let h = Harness::new();
    let user = h.register("ann@example.com", "secret1", Role::Regular).await;

    let signed_in = h
        .accounts
        .authenticate("ann@example.com", "secret1")
        .await
        .unwrap();
    assert_eq!(signed_in, user);
    assert_eq!(signed_in.email, "ann@example.com");

    let wrong = h.accounts.authenticate("ann@example.com", "secret2").await;
    assert!(matches!(wrong, Err(ServiceError::AuthenticationFailed)));
}

#[tokio::test]
async fn test_authenticate_ignores_email_case() {
    let h = Harness::new();
    let user = h.register("ann@example.com", "secret1", Role::Regular).await;

    let signed_in = h
        .accounts
        .authenticate("  ANN@Example.com", "secret1")
        .await
        .unwrap();

    assert_eq!(signed_in, user);
}

#[tokio::test]
async fn test_unknown_email_fails_like_wrong_password() {
    let h = Harness::new();
    h.register("ann@example.com", "secret1", Role::Regular).await;

    let result = h.accounts.authenticate("nobody@example.com", "secret1").await;

    assert!(matches!(result, Err(ServiceError::AuthenticationFailed)));
}

#[tokio::test]
async fn test_duplicate_email_is_validation_failure() {
    let h = Harness::new();
    h.register("ann@example.com", "secret1", Role::Regular).await;

    let result = h
        .accounts
        .register(Registration {
            email: "ann@example.com".to_string(),
            password: "another".to_string(),
            password_confirmation: "another".to_string(),
            role: None,
        })
        .await;

    let errors = validation_errors(result);
    assert_eq!(errors.reasons_for("email"), vec!["has already been taken"]);
}

#[tokio::test]
async fn test_registration_field_errors() {
    let h = Harness::new();

    let errors = validation_errors(
        h.accounts
            .register(Registration {
                email: "not-an-email".to_string(),
                password: "abc".to_string(),
                password_confirmation: "abd".to_string(),
                role: Some("root".to_string()),
            })
            .await,
    );

    assert_eq!(errors.reasons_for("email"), vec!["is incorrect format"]);
    assert_eq!(
        errors.reasons_for("password"),
        vec!["is too short (minimum is 6 characters)"]
    );
    assert_eq!(
        errors.reasons_for("password_confirmation"),
        vec!["doesn't match password"]
    );
    assert_eq!(errors.reasons_for("role"), vec!["is not included in the list"]);
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn test_blank_password_reported() {
    let h = Harness::new();

    let errors = validation_errors(
        h.accounts
            .register(Registration {
                email: "ann@example.com".to_string(),
                password: String::new(),
                password_confirmation: String::new(),
                role: None,
            })
            .await,
    );

    assert_eq!(errors.reasons_for("password"), vec!["can't be blank"]);
}

#[tokio::test]
async fn test_unrelated_updates_keep_hash() {
    let h = Harness::new();
    let ann = h.register("ann@example.com", "secret1", Role::Regular).await;
    let original_hash = h.stored(&ann).await.password_hash;

    for email in ["ann@work.example.com", "ann@home.example.com"] {
        let changes = UserChanges {
            email: Some(email.to_string()),
            ..Default::default()
        };
        let updated = h.accounts.update(&ann, ann.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.email, email);
        assert_eq!(h.stored(&ann).await.password_hash, original_hash);
    }
}

#[tokio::test]
async fn test_resubmitting_same_password_keeps_hash() {
    let h = Harness::new();
    let ann = h.register("ann@example.com", "secret1", Role::Regular).await;
    let original_hash = h.stored(&ann).await.password_hash;

    let changes = UserChanges {
        password: Some("secret1".to_string()),
        password_confirmation: Some("secret1".to_string()),
        ..Default::default()
    };
    h.accounts.update(&ann, ann.id, changes).await.unwrap();

    assert_eq!(h.stored(&ann).await.password_hash, original_hash);
}

#[tokio::test]
async fn test_changing_password_rehashes() {
    let h = Harness::new();
    let ann = h.register("ann@example.com", "secret1", Role::Regular).await;
    let original_hash = h.stored(&ann).await.password_hash;

    let changes = UserChanges {
        password: Some("secret2".to_string()),
        password_confirmation: Some("secret2".to_string()),
        ..Default::default()
    };
    h.accounts.update(&ann, ann.id, changes).await.unwrap();

    let new_hash = h.stored(&ann).await.password_hash;
    assert_ne!(new_hash, original_hash);
    assert!(verify_password("secret2", &new_hash).unwrap());

    assert!(h.accounts.authenticate("ann@example.com", "secret2").await.is_ok());
    assert!(matches!(
        h.accounts.authenticate("ann@example.com", "secret1").await,
        Err(ServiceError::AuthenticationFailed)
    ));
}

#[tokio::test]
async fn test_password_change_requires_confirmation() {
    let h = Harness::new();
    let ann = h.register("ann@example.com", "secret1", Role::Regular).await;

    let changes = UserChanges {
        password: Some("secret2".to_string()),
        ..Default::default()
    };
    let errors = validation_errors(h.accounts.update(&ann, ann.id, changes).await);

    assert_eq!(
        errors.reasons_for("password_confirmation"),
        vec!["doesn't match password"]
    );
}

#[tokio::test]
async fn test_update_email_to_taken_address() {
    let h = Harness::new();
    h.register("ann@example.com", "secret1", Role::Regular).await;
    let bob = h.register("bob@example.com", "secret1", Role::Regular).await;

    let changes = UserChanges {
        email: Some("Ann@Example.com".to_string()),
        ..Default::default()
    };
    let errors = validation_errors(h.accounts.update(&bob, bob.id, changes).await);

    assert_eq!(errors.reasons_for("email"), vec!["has already been taken"]);
}

#[tokio::test]
async fn test_only_admin_changes_roles() {
    let h = Harness::new();
    let admin = h.register("admin@example.com", "secret1", Role::Admin).await;
    let ann = h.register("ann@example.com", "secret1", Role::Regular).await;

    let promote = || UserChanges {
        role: Some("admin".to_string()),
        ..Default::default()
    };

    let errors = validation_errors(h.accounts.update(&ann, ann.id, promote()).await);
    assert!(errors.has_field("role"));

    let promoted = h
        .accounts
        .update(&admin, ann.id, promote())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(promoted.role, Role::Admin);
}

#[tokio::test]
async fn test_regular_user_cannot_update_others() {
    let h = Harness::new();
    let ann = h.register("ann@example.com", "secret1", Role::Regular).await;
    let bob = h.register("bob@example.com", "secret1", Role::Regular).await;

    let changes = UserChanges {
        email: Some("hijacked@example.com".to_string()),
        ..Default::default()
    };

    assert!(h.accounts.update(&ann, bob.id, changes).await.unwrap().is_none());
    assert_eq!(h.stored(&bob).await.email, "bob@example.com");
}

#[tokio::test]
async fn test_admin_deletes_user_and_tasks() {
    let h = Harness::new();
    let admin = h.register("admin@example.com", "secret1", Role::Admin).await;
    let ann = h.register("ann@example.com", "secret1", Role::Regular).await;

    let tasks = TaskService::new(Arc::new(h.store.clone()));
    tasks
        .create(
            &ann,
            NewTask {
                name: "Ann's task".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!h.accounts.delete(&ann, ann.id).await.unwrap());
    assert!(h.accounts.delete(&admin, ann.id).await.unwrap());

    assert!(h.accounts.find(ann.id).await.unwrap().is_none());
    assert!(tasks.visible_tasks_for(&admin).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sign_up_cannot_self_assign_admin() {
    let h = Harness::new();
    let form = || Registration {
        email: "mallory@example.com".to_string(),
        password: "secret1".to_string(),
        password_confirmation: "secret1".to_string(),
        role: Some("admin".to_string()),
    };

    let errors = validation_errors(h.accounts.sign_up(None, form()).await);
    assert_eq!(
        errors.reasons_for("role"),
        vec!["can only be assigned by an admin"]
    );

    let admin = h.register("admin@example.com", "secret1", Role::Admin).await;
    let created = h.accounts.sign_up(Some(&admin), form()).await.unwrap();
    assert_eq!(created.role, Role::Admin);
}

#[tokio::test]
async fn test_ensure_admin_is_idempotent() {
    let h = Harness::new();

    let first = h
        .accounts
        .ensure_admin("root@example.com", "secret1")
        .await
        .unwrap()
        .expect("admin should be created");
    assert_eq!(first.role, Role::Admin);

    let second = h
        .accounts
        .ensure_admin("ROOT@example.com", "different")
        .await
        .unwrap();
    assert!(second.is_none());
    assert!(h.accounts.authenticate("root@example.com", "secret1").await.is_ok());
}
