/// Authorization predicates
///
/// Every check takes the acting user explicitly; nothing here reads request or
/// session state. Denials are plain `false`, and callers decide how to report them.
///
/// # Permission Model
///
/// 1. **Ownership**: a task is *assigned* to the user who owns it
/// 2. **Role**: an admin may see and edit every task and every account
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use taskman_shared::auth::authorization::{assigned, editable};
/// use taskman_shared::models::task::{Task, TaskState};
/// use taskman_shared::models::user::{Role, User};
/// use uuid::Uuid;
///
/// let user = |role| User {
///     id: Uuid::new_v4(),
///     email: "someone@example.com".to_string(),
///     password_hash: String::new(),
///     role,
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
/// };
/// let owner = user(Role::Regular);
/// let admin = user(Role::Admin);
///
/// let task = Task {
///     id: Uuid::new_v4(),
///     user_id: owner.id,
///     name: "Write report".to_string(),
///     description: None,
///     state: TaskState::New,
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
/// };
///
/// assert!(assigned(&task, &owner));
/// assert!(!assigned(&task, &admin));
/// assert!(editable(&task, &admin));
/// ```

use uuid::Uuid;

use crate::models::task::Task;
use crate::models::user::User;

/// Whether the user holds the admin role
pub fn is_admin(user: &User) -> bool {
    user.role.is_admin()
}

/// Whether the task belongs to the user
///
/// Decided by identity alone; an admin is not assigned someone else's task.
pub fn assigned(task: &Task, user: &User) -> bool {
    task.user_id == user.id
}

/// Whether the user may view, change, delete or transition the task
pub fn editable(task: &Task, user: &User) -> bool {
    assigned(task, user) || is_admin(user)
}

/// Whether the actor may change the account `user_id`
pub fn can_manage_user(actor: &User, user_id: Uuid) -> bool {
    actor.id == user_id || is_admin(actor)
}

/// Whether the actor may assign roles or delete accounts
pub fn can_administer_users(actor: &User) -> bool {
    is_admin(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskState;
    use crate::models::user::Role;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn task_for(owner: &User) -> Task {
        Task {
            id: Uuid::new_v4(),
            user_id: owner.id,
            name: "Write report".to_string(),
            description: None,
            state: TaskState::New,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_admin() {
        assert!(is_admin(&user(Role::Admin)));
        assert!(!is_admin(&user(Role::Regular)));
    }

    #[test]
    fn test_owner_is_assigned_and_editable() {
        let owner = user(Role::Regular);
        let task = task_for(&owner);

        assert!(assigned(&task, &owner));
        assert!(editable(&task, &owner));
    }

    #[test]
    fn test_stranger_is_neither() {
        let owner = user(Role::Regular);
        let stranger = user(Role::Regular);
        let task = task_for(&owner);

        assert!(!assigned(&task, &stranger));
        assert!(!editable(&task, &stranger));
    }

    #[test]
    fn test_admin_edits_but_is_not_assigned() {
        let owner = user(Role::Regular);
        let admin = user(Role::Admin);
        let task = task_for(&owner);

        assert!(!assigned(&task, &admin));
        assert!(editable(&task, &admin));
    }

    #[test]
    fn test_account_management() {
        let regular = user(Role::Regular);
        let other = user(Role::Regular);
        let admin = user(Role::Admin);

        assert!(can_manage_user(&regular, regular.id));
        assert!(!can_manage_user(&regular, other.id));
        assert!(can_manage_user(&admin, other.id));

        assert!(can_administer_users(&admin));
        assert!(!can_administer_users(&regular));
    }
}
