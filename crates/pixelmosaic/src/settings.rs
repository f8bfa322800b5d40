use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mosaic::{MosaicFile, Quality};

use crate::paths::AppPaths;

/// Where the configuration comes from and whether it has to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Named on the command line; a missing file is then an error.
    pub explicit: bool,
}

impl ConfigSource {
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self {
                path: path.to_path_buf(),
                explicit: true,
            });
        }
        let paths = AppPaths::discover()?;
        Ok(Self {
            path: paths.config_file(),
            explicit: false,
        })
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the file, falling back to defaults when an implicit file is absent.
    pub fn load(&self) -> Result<MosaicFile> {
        if !self.explicit && !self.exists() {
            tracing::debug!(path = %self.path.display(), "no configuration file; using defaults");
            return Ok(MosaicFile::default());
        }
        let file = MosaicFile::load(&self.path)
            .with_context(|| format!("failed to load configuration {}", self.path.display()))?;
        tracing::debug!(
            path = %self.path.display(),
            palette = file.mosaic.palette.len(),
            theme_variables = file.theme.len(),
            "loaded configuration"
        );
        Ok(file)
    }
}

/// Command-line settings layered on top of every loaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub quality: Option<Quality>,
    pub paused: bool,
}

impl Overrides {
    pub fn apply(&self, mut file: MosaicFile) -> MosaicFile {
        if let Some(quality) = self.quality {
            file.mosaic.quality = quality;
        }
        if self.paused {
            file.mosaic.paused = true;
        }
        file
    }
}
