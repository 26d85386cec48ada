use std::path::{Path, PathBuf};

use shopmerge_config::{CountryMapping, Settings};

use crate::model::TaskId;

/// Everything one invocation needs, built once by the caller.
#[derive(Debug, Clone)]
pub struct MergeContext {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub task_id: TaskId,
    pub settings: Settings,
    pub mapping: Option<CountryMapping>,
}

impl MergeContext {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, task_id: TaskId) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            task_id,
            settings: Settings::default(),
            mapping: None,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_mapping(mut self, mapping: CountryMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// `output_dir/{stem}-{task_id}.xlsx`
    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{}-{}.xlsx", stem, self.task_id))
    }

    pub fn warehouse_dir(&self) -> PathBuf {
        self.source_dir.join(&self.settings.warehouse_dir)
    }

    pub fn amazon_dir(&self) -> PathBuf {
        self.source_dir.join(&self.settings.amazon_dir)
    }

    /// Directories under the source root that are not stores.
    pub fn is_reserved_dir(&self, dir: &Path) -> bool {
        dir.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == self.settings.warehouse_dir || name == self.settings.amazon_dir)
    }
}
