use std::collections::HashMap;
use std::sync::Arc;

use rand::{distr::Alphanumeric, Rng};
use tokio::sync::RwLock;

use crate::ids::UserId;

/// Cookie that carries the session token.
pub const SESSION_COOKIE: &str = "sessionid";

const TOKEN_LEN: usize = 32;

/// In-memory session table: opaque token -> user.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, UserId>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for `user_id` and returns its token.
    pub async fn open(&self, user_id: UserId) -> String {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();

        self.sessions.write().await.insert(token.clone(), user_id);
        token
    }

    pub async fn user(&self, token: &str) -> Option<UserId> {
        self.sessions.read().await.get(token).copied()
    }

    pub async fn close(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_resolve_close() {
        let store = SessionStore::new();
        let user = UserId::new();

        let token = store.open(user).await;
        assert_eq!(token.len(), TOKEN_LEN);
        assert_eq!(store.user(&token).await, Some(user));

        assert!(store.close(&token).await);
        assert_eq!(store.user(&token).await, None);
    }

    #[tokio::test]
    async fn tokens_are_distinct_per_session() {
        let store = SessionStore::new();
        let alice = UserId::new();
        let bob = UserId::new();

        let first = store.open(alice).await;
        let second = store.open(alice).await;
        let bobs = store.open(bob).await;
        assert_ne!(first, second);

        store.close(&first).await;
        assert_eq!(store.user(&first).await, None);
        assert_eq!(store.user(&second).await, Some(alice));
        assert_eq!(store.user(&bobs).await, Some(bob));
    }
}
