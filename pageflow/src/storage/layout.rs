//! Session-scoped output directory.

use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::utils::file_timestamp;

const RESULTS_DIR: &str = "results";
const PHOTOS_DIR: &str = "photos";

/// The directory every artifact of one session is written beneath.
///
/// Generated once when the session starts. The random suffix keeps
/// concurrent sessions started in the same second apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutput {
    session_id: String,
    dir: PathBuf,
    photos: PathBuf,
}

impl SessionOutput {
    /// Creates `<root>/results/<base>_<yyyymmdd_HHMMSS>_<8 hex>` and its
    /// `photos` sub-directory.
    pub fn create(root: &Path, base_name: &str) -> io::Result<Self> {
        let session_id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{base_name}_{}_{}", file_timestamp(&Utc::now()), &session_id[..8]);
        let dir = root.join(RESULTS_DIR).join(name);
        let photos = dir.join(PHOTOS_DIR);
        fs::create_dir_all(&photos)?;

        tracing::debug!(dir = %dir.display(), "Session output directory created");
        Ok(Self {
            session_id,
            dir,
            photos,
        })
    }

    /// Identifier of the session that owns this directory.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The session directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the extractor may store images.
    #[must_use]
    pub fn photos_dir(&self) -> &Path {
        &self.photos
    }

    /// Path of an artifact inside the session directory.
    #[must_use]
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}
