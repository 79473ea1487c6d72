use std::io::Write;
use std::path::PathBuf;

use crate::domain::errors::PipelineResult;
use crate::domain::ports::{StageArtifact, StageStore};

/// Stage store writing each artifact to a well-known file in one directory.
///
/// Writes go to a sibling temporary file which is synced and then renamed
/// over the target, so a reader never sees a partially written artifact.
#[derive(Debug, Clone)]
pub struct FileStageStore {
    dir: PathBuf,
}

impl FileStageStore {
    /// Create a store rooted at `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of an artifact.
    fn path(&self, artifact: StageArtifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }
}

impl StageStore for FileStageStore {
    fn write(&self, artifact: StageArtifact, contents: &str) -> PipelineResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.path(artifact);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", artifact.file_name(), std::process::id()));

        let result = (|| -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&tmp, &target)
        })();

        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result?;

        tracing::debug!(artifact = %artifact, path = %target.display(), "Artifact written");
        Ok(())
    }

    fn read(&self, artifact: StageArtifact) -> PipelineResult<Option<String>> {
        match std::fs::read_to_string(self.path(artifact)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn location(&self, artifact: StageArtifact) -> String {
        self.path(artifact).display().to_string()
    }
}
