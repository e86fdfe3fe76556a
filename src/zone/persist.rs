//! Zone File Persistence
//!
//! The zone is read once at startup and rewritten in full after every
//! mutation. Writes go to a sibling temporary file which is then renamed over
//! the zone file, so the name server never sees a half-written zone.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::document::ZoneDocument;
use super::error::ZoneResult;

/// Backing file of a zone
#[derive(Debug, Clone)]
pub struct ZoneFile {
    path: PathBuf,
}

impl ZoneFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> ZoneResult<bool> {
        Ok(tokio::fs::try_exists(&self.path).await?)
    }

    /// Read and parse the zone file
    pub async fn load(&self) -> ZoneResult<ZoneDocument> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let doc = ZoneDocument::parse(&text);
        debug!("Loaded {} lines from {:?}", doc.len(), self.path);
        Ok(doc)
    }

    /// Write the whole document (write to temp, then rename)
    pub async fn save(&self, doc: &ZoneDocument) -> ZoneResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path()?;
        let content = doc.render();

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!("Saved {} bytes to {:?}", content.len(), self.path);
        Ok(())
    }

    fn temp_path(&self) -> ZoneResult<PathBuf> {
        let name = self.path.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("zone file path has no file name: {:?}", self.path),
            )
        })?;
        let mut temp_name = OsString::from(name);
        temp_name.push(".tmp");
        Ok(self.path.with_file_name(temp_name))
    }
}
