use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const ACTIVITY_LOG: &str = "activity.log";

/// Append-only JSON-lines record of executed commands.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    guard: Mutex<()>,
}

impl ActivityLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join(ACTIVITY_LOG),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, command: &str, message: &str) {
        self.append("info", command, message);
    }

    pub fn error(&self, command: &str, message: &str) {
        self.append("error", command, message);
    }

    fn append(&self, level: &str, command: &str, message: &str) {
        // A panicked writer leaves at most a partial line; keep appending.
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut file) => {
                if let Err(error) = writeln!(file, "{payload}") {
                    tracing::warn!(path = %self.path.display(), %error, "failed to append activity log");
                }
            }
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "failed to open activity log");
            }
        }
    }
}
