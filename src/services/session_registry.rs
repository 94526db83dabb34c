use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::services::quiz_session::QuizSession;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<QuizSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Arc<QuizSession>) {
        self.sessions.write().await.insert(session.id(), session);
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<QuizSession>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Quiz attempt {} not found", id)))
    }

    pub async fn close(&self, id: Uuid) -> Result<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Quiz attempt {} not found", id)))?;
        session.close().await;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Closes sessions untouched for longer than `ttl`. A session whose
    /// countdown is still running or whose grading is in flight is kept.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let candidates: Vec<Arc<QuizSession>> =
            self.sessions.read().await.values().cloned().collect();
        let mut abandoned = Vec::new();
        for session in candidates {
            if session.is_abandoned(ttl).await {
                abandoned.push(session.id());
            }
        }
        if abandoned.is_empty() {
            return 0;
        }
        let stale: Vec<Arc<QuizSession>> = {
            let mut sessions = self.sessions.write().await;
            abandoned.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &stale {
            tracing::info!(attempt_id = %session.id(), "Closing idle quiz attempt");
            session.close().await;
        }
        stale.len()
    }
}
