//! In-process user store.
//!
//! Backs `DATABASE_URL=memory://` for local runs and the HTTP tests. Applies the
//! same UNIQUE rules as the `users` table (client_id, email).

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{NewUser, StoreError, StoreResult, UserChanges, UserStore};
use crate::models::user::User;

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    next_id: i64,
}

impl Inner {
    /// Name of the first UNIQUE column the given values collide on, ignoring row `except`.
    fn conflict(&self, client_id: Option<&str>, email: Option<&str>, except: Option<i64>) -> Option<&'static str> {
        self.users
            .values()
            .filter(|u| Some(u.id) != except)
            .find_map(|u| {
                if client_id == Some(u.client_id.as_str()) {
                    Some("client_id")
                } else if email == Some(u.email.as_str()) {
                    Some("email")
                } else {
                    None
                }
            })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if let Some(field) = inner.conflict(Some(user.client_id.as_str()), Some(user.email.as_str()), None) {
            return Err(StoreError::Conflict(field.to_string()));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let row = User {
            id: inner.next_id,
            client_id: user.client_id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            hashed_password: user.hashed_password.clone(),
            disabled: false,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_client_id(&self, client_id: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.client_id == client_id).cloned())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: i64, changes: &UserChanges) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Ok(None);
        }
        if let Some(field) = inner.conflict(changes.client_id.as_deref(), changes.email.as_deref(), Some(id)) {
            return Err(StoreError::Conflict(field.to_string()));
        }

        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(client_id) = &changes.client_id {
            user.client_id = client_id.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(full_name) = &changes.full_name {
            user.full_name = Some(full_name.clone());
        }
        if let Some(hash) = &changes.hashed_password {
            user.hashed_password = hash.clone();
        }
        if let Some(disabled) = changes.disabled {
            user.disabled = disabled;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.inner.write().await.users.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(client_id: &str, email: &str) -> NewUser {
        NewUser {
            client_id: client_id.to_string(),
            email: email.to_string(),
            full_name: None,
            hashed_password: "$2b$04$hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert_user(&new_user("alice", "a@x.com")).await.unwrap();
        let b = store.insert_user(&new_user("bob", "b@x.com")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(!a.disabled);
    }

    #[tokio::test]
    async fn test_duplicate_client_id_or_email_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(&new_user("alice", "a@x.com")).await.unwrap();

        let err = store.insert_user(&new_user("alice", "other@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref f) if f == "client_id"));

        let err = store.insert_user(&new_user("carol", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref f) if f == "email"));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let store = MemoryStore::new();
        let before = store.insert_user(&new_user("alice", "a@x.com")).await.unwrap();

        let changes = UserChanges {
            full_name: Some("Alice Liddell".into()),
            ..Default::default()
        };
        let after = store.update_user(before.id, &changes).await.unwrap().unwrap();

        assert_eq!(after.full_name.as_deref(), Some("Alice Liddell"));
        assert_eq!(after.client_id, before.client_id);
        assert_eq!(after.email, before.email);
        assert_eq!(after.hashed_password, before.hashed_password);
        assert_eq!(after.disabled, before.disabled);
    }

    #[tokio::test]
    async fn test_update_to_own_email_is_not_a_conflict() {
        let store = MemoryStore::new();
        let alice = store.insert_user(&new_user("alice", "a@x.com")).await.unwrap();
        let changes = UserChanges {
            email: Some("a@x.com".into()),
            ..Default::default()
        };
        assert!(store.update_user(alice.id, &changes).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_into_taken_email_conflicts() {
        let store = MemoryStore::new();
        let alice = store.insert_user(&new_user("alice", "a@x.com")).await.unwrap();
        store.insert_user(&new_user("bob", "b@x.com")).await.unwrap();

        let changes = UserChanges {
            email: Some("b@x.com".into()),
            ..Default::default()
        };
        let err = store.update_user(alice.id, &changes).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = MemoryStore::new();
        let result = store.update_user(42, &UserChanges::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let store = MemoryStore::new();
        let alice = store.insert_user(&new_user("alice", "a@x.com")).await.unwrap();
        assert!(store.delete_user(alice.id).await.unwrap().is_some());
        assert!(store.delete_user(alice.id).await.unwrap().is_none());
        assert!(store.get_user_by_client_id("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_user(&new_user(&format!("user{i}"), &format!("u{i}@x.com")))
                .await
                .unwrap();
        }
        let page = store.list_users(2, 1).await.unwrap();
        let ids: Vec<i64> = page.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
