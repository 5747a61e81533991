use anyhow::{bail, Context};
use crate::Result;
use std::path::{Path, PathBuf};

/// A uniquely named directory that is deleted when dropped. Test support.
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
    cleaned_up: bool,
}

impl TempDir {
    pub fn create(parent: &Path) -> Result<TempDir> {
        let path = parent.join(
            format!("datastash-temp/{pid}_{rand}",
                    pid = std::process::id(),
                    rand = uuid::Uuid::new_v4()));

        tracing::debug!(path = %path.display(), "TempDir::create");

        std::fs::create_dir_all(&*path)?;

        Ok(TempDir {
            path,
            cleaned_up: false,
        })
    }

    pub fn path(&self) -> Result<&Path> {
        if self.cleaned_up {
            bail!("TempDir already cleaned up.")
        } else {
            Ok(&*self.path)
        }
    }

    pub fn cleanup(&mut self) -> Result<()> {
        if self.cleaned_up {
            return Ok(());
        }
        // Set self.cleaned_up = true whether or not the delete succeeds.
        self.cleaned_up = true;

        if !self.path.try_exists()? {
            return Ok(());
        }

        std::fs::remove_dir_all(&*self.path)
            .with_context(|| format!("while cleaning up TempDir path='{path}'",
                                     path = self.path.display()))?;
        Ok(())
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if let Err(err) = self.cleanup() {
            tracing::error!(%err, "TempDir::drop error from cleanup");
        }
    }
}
