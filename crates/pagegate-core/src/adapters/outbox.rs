use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::interfaces::NotificationDispatcher;
use crate::notify::{Channel, Notification};

/// Writes notification payloads to disk instead of delivering them.
///
/// `notification.json` always; `email.json` and `issue.json` when the
/// channel was requested (the issue only when something failed).
#[derive(Debug, Clone)]
pub struct OutboxDispatcher {
    dir: PathBuf,
}

impl OutboxDispatcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn write(&self, file: &str, value: &impl serde::Serialize) -> anyhow::Result<()> {
        let path = self.dir.join(file);
        tokio::fs::write(&path, serde_json::to_vec_pretty(value)?).await?;
        info!(path = %path.display(), "queued notification");
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for OutboxDispatcher {
    async fn dispatch(&self, notification: &Notification) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        self.write("notification.json", notification).await?;
        if notification.wants(Channel::Email) {
            self.write("email.json", &notification.email_event()).await?;
        }
        if notification.wants(Channel::Issue) {
            if let Some(issue) = notification.issue() {
                self.write("issue.json", &issue).await?;
            }
        }
        Ok(())
    }
}
