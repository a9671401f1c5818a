//! JSON-file session storage
//!
//! One document per session at `<dir>/<user>/<session>.json`. Writes go to a
//! temporary file that is then renamed over the old document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::{FlowError, Result};
use crate::session::service::SessionService;
use crate::session::session::{Session, SessionRecord};

/// Stores sessions as JSON files under a directory
#[derive(Debug, Clone)]
pub struct FileSessionService {
    dir: PathBuf,
}

impl FileSessionService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn user_dir(&self, user_id: &str) -> Result<PathBuf> {
        check_component("user id", user_id)?;
        Ok(self.dir.join(user_id))
    }

    fn path(&self, user_id: &str, session_id: &str) -> Result<PathBuf> {
        check_component("session id", session_id)?;
        Ok(self.user_dir(user_id)?.join(format!("{}.json", session_id)))
    }

    async fn write(&self, session: &Session) -> Result<()> {
        let path = self.path(&session.user_id, &session.id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&session.to_record())?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), "session written");
        Ok(())
    }

    fn not_found(user_id: &str, session_id: &str) -> FlowError {
        FlowError::SessionNotFound {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

/// Ids become path components and must not escape the storage directory
fn check_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value.contains(['/', '\\'])
        || value.contains("..")
    {
        return Err(FlowError::config(format!("Invalid {}: '{}'", what, value)));
    }
    Ok(())
}

#[async_trait]
impl SessionService for FileSessionService {
    async fn create_with_state(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: Map<String, Value>,
    ) -> Result<Session> {
        let session = Session::new(app_name, user_id, session_id, state);
        let path = self.path(user_id, &session.id)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(FlowError::SessionExists(session.id));
        }
        self.write(&session).await?;
        Ok(session)
    }

    async fn get(&self, user_id: &str, session_id: &str) -> Result<Session> {
        let path = self.path(user_id, session_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Self::not_found(user_id, session_id));
            }
            Err(err) => return Err(err.into()),
        };
        let record: SessionRecord = serde_json::from_str(&content)?;
        Ok(Session::from_record(record))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.write(session).await
    }

    async fn delete(&self, user_id: &str, session_id: &str) -> Result<()> {
        let path = self.path(user_id, session_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(Self::not_found(user_id, session_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self, user_id: &str) -> Result<Vec<String>> {
        let dir = self.user_dir(user_id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let service = FileSessionService::new(dir.path());

        let session = service.create("agentflow", "user_123", Some("s1")).await.unwrap();
        session.state.set("final_result", "Finalized: Processed: X");
        service.save(&session).await.unwrap();

        let reloaded = service.get("user_123", "s1").await.unwrap();
        assert_eq!(
            reloaded.state.get("final_result"),
            Some(json!("Finalized: Processed: X"))
        );
        assert!(dir.path().join("user_123").join("s1.json").exists());
        assert_eq!(service.list("user_123").await.unwrap(), vec!["s1"]);
    }

    #[tokio::test]
    async fn test_rejects_path_escape() {
        let dir = tempfile::tempdir().unwrap();
        let service = FileSessionService::new(dir.path());
        assert!(service.get("../etc", "passwd").await.is_err());
        assert!(service.create("app", "u", Some("a/b")).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_session() {
        let dir = tempfile::tempdir().unwrap();
        let service = FileSessionService::new(dir.path());
        assert!(matches!(
            service.get("u", "nope").await,
            Err(FlowError::SessionNotFound { .. })
        ));
        assert!(service.list("u").await.unwrap().is_empty());
    }
}
