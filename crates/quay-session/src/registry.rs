use std::collections::HashMap;

use quay_pty::HostEnv;

use crate::error::SessionError;
use crate::options::SessionOptions;
use crate::session::{create_session, Session, SessionId};

/// Owns live sessions keyed by id, for backends serving several terminal
/// tabs at once. Sessions are independent; nothing here coordinates them
/// beyond the map.
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Create a session from options and take ownership of it.
    pub async fn create(
        &mut self,
        options: &SessionOptions,
        env: &HostEnv,
    ) -> Result<SessionId, SessionError> {
        let session = create_session(options, env).await?;
        let id = session.id().clone();
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Kill and drop a session. Removing an unknown id is a no-op.
    pub async fn remove(&mut self, id: &SessionId) {
        if let Some(mut session) = self.sessions.remove(id) {
            session.kill().await;
        }
    }

    pub fn list(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_pty::Platform;
    use std::collections::HashMap;

    fn test_env() -> HostEnv {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("HOME".to_string(), "/tmp".to_string());
        HostEnv::with_platform(Platform::Unix, vars)
    }

    #[tokio::test]
    async fn test_create_and_list_sessions() {
        let mut registry = SessionRegistry::new();
        let env = test_env();
        let options = SessionOptions::local(80, 24);

        let id1 = registry.create(&options, &env).await.unwrap();
        let id2 = registry.create(&options, &env).await.unwrap();

        assert_ne!(id1, id2);
        assert_eq!(registry.list().len(), 2);
        assert!(registry.get(&id1).is_some());
        assert!(registry.get_mut(&id2).is_some());

        registry.remove(&id1).await;
        registry.remove(&id2).await;
    }

    #[tokio::test]
    async fn test_remove_kills_and_drops() {
        let mut registry = SessionRegistry::new();
        let env = test_env();
        let id = registry
            .create(&SessionOptions::local(80, 24), &env)
            .await
            .unwrap();

        registry.remove(&id).await;
        assert!(registry.get(&id).is_none());
        assert!(registry.list().is_empty());
    }

    #[tokio::test]
    async fn test_remove_nonexistent_is_noop() {
        let mut registry = SessionRegistry::new();
        registry.remove(&SessionId::generate()).await;
    }
}
