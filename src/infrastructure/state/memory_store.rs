use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::ports::{StageArtifact, StageStore};

/// Stage store kept in memory; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStageStore {
    artifacts: RwLock<HashMap<StageArtifact, String>>,
}

impl InMemoryStageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `artifact` has been written.
    pub fn contains(&self, artifact: StageArtifact) -> bool {
        self.artifacts
            .read()
            .map(|artifacts| artifacts.contains_key(&artifact))
            .unwrap_or(false)
    }
}

fn poisoned() -> PipelineError {
    PipelineError::Io(std::io::Error::other("stage store lock poisoned"))
}

impl StageStore for InMemoryStageStore {
    fn write(&self, artifact: StageArtifact, contents: &str) -> PipelineResult<()> {
        self.artifacts
            .write()
            .map_err(|_| poisoned())?
            .insert(artifact, contents.to_string());
        Ok(())
    }

    fn read(&self, artifact: StageArtifact) -> PipelineResult<Option<String>> {
        Ok(self
            .artifacts
            .read()
            .map_err(|_| poisoned())?
            .get(&artifact)
            .cloned())
    }

    fn location(&self, artifact: StageArtifact) -> String {
        format!("memory://{}", artifact.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_overwrites() {
        let store = InMemoryStageStore::new();
        assert!(!store.contains(StageArtifact::Candidate));
        store.write(StageArtifact::Candidate, "a").unwrap();
        store.write(StageArtifact::Candidate, "b").unwrap();
        assert_eq!(store.read(StageArtifact::Candidate).unwrap().as_deref(), Some("b"));
        assert_eq!(store.location(StageArtifact::Candidate), "memory://updated_file.rs");
    }
}
