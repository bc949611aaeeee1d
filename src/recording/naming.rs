// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording file names.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::error::{RecorderError, Result};

/// Issues `REC<YYYYMMDD>_<HHMMSS>.<ext>` paths that are never reused.
#[derive(Debug, Clone)]
pub struct RecordingNamer {
    directory: PathBuf,
    extension: String,
    issued: HashSet<PathBuf>,
}

impl RecordingNamer {
    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
            issued: HashSet::new(),
        }
    }

    /// Create the recordings directory if needed
    pub fn ensure_directory(&self) -> Result<()> {
        fs::create_dir_all(&self.directory).map_err(|e| RecorderError::io(&self.directory, e))
    }

    /// Next path for a take started now
    pub fn next_path(&mut self) -> PathBuf {
        self.next_path_at(Local::now())
    }

    /// Next path for a take started at `at`.
    ///
    /// Two takes started in the same second get `_1`, `_2`, ... suffixes.
    /// Only paths not yet on disk are remembered; written files are caught by
    /// the existence check.
    pub fn next_path_at(&mut self, at: DateTime<Local>) -> PathBuf {
        self.issued.retain(|path| !path.exists());

        let stem = at.format("REC%Y%m%d_%H%M%S").to_string();
        let mut candidate = self.directory.join(format!("{}.{}", stem, self.extension));
        let mut n = 1;
        while self.issued.contains(&candidate) || candidate.exists() {
            candidate = self
                .directory
                .join(format!("{}_{}.{}", stem, n, self.extension));
            n += 1;
        }
        self.issued.insert(candidate.clone());
        candidate
    }
}
