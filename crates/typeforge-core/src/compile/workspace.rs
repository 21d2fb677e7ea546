//! Scratch workspaces for toolchain validation.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};

use crate::error::Result;
use crate::generate::GeneratedDefinition;
use crate::registry::{CatalogStore, IndexEntry, render_index};

/// Crate root written into every workspace.
pub const CRATE_ROOT: &str = "lib.rs";

/// A throwaway copy of the catalog plus one candidate definition.
///
/// The directory is removed when the workspace is dropped.
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    /// Build a workspace under `parent` (system temp dir if `None`).
    pub fn create(
        parent: Option<&Path>,
        catalog: &CatalogStore,
        candidate: &GeneratedDefinition,
    ) -> Result<Self> {
        let prefix = format!("typeforge-{}-", uuid::Uuid::new_v4());
        let mut builder = Builder::new();
        builder.prefix(&prefix);
        let dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        let published = catalog.copy_into(dir.path())?;
        fs::write(dir.path().join(candidate.file_name()), &candidate.source)?;

        let mut entries: Vec<IndexEntry> = published.iter().map(IndexEntry::from).collect();
        entries.push(IndexEntry::from(candidate));
        fs::write(dir.path().join(CRATE_ROOT), render_index(&entries))?;

        tracing::debug!(
            "Prepared validation workspace {} ({} published entries)",
            dir.path().display(),
            published.len()
        );

        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn crate_root(&self) -> PathBuf {
        self.dir.path().join(CRATE_ROOT)
    }

    /// Directory rustc writes metadata into.
    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }
}
