use async_trait::async_trait;
use florist_core::{Speaker, Transcript, UserId};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Append-only transcript, one file per user: `<dir>/user_<id>.txt`.
pub struct FileTranscript {
    dir: PathBuf,
}

impl FileTranscript {
    /// Creates `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, user: UserId) -> PathBuf {
        self.dir.join(format!("user_{user}.txt"))
    }
}

fn format_line(at: chrono::DateTime<chrono::Local>, speaker: Speaker, text: &str) -> String {
    format!(
        "{} - {}: {text}\n",
        at.format("%Y-%m-%d %H:%M:%S,%3f"),
        speaker.label()
    )
}

#[async_trait]
impl Transcript for FileTranscript {
    async fn record(&self, user: UserId, speaker: Speaker, text: &str) -> anyhow::Result<()> {
        let line = format_line(chrono::Local::now(), speaker, text);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(user))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
