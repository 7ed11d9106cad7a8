//! Staged publishing of run outputs.
//!
//! Files are written into a hidden staging directory next to the output folder
//! and only moved into the output folder once the whole run has succeeded. A
//! failed run drops the staging directory, so the output folder never mixes
//! fresh files from early stages with stale files from a previous run.
//!
//! Publishing first sets aside every file it is about to replace, plus any
//! retired output names this run did not produce, then moves the new files in.
//! If a move fails, the new files are removed and the set-aside ones restored.

use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;

use crate::error::AppError;

pub struct StagedOutputs {
    staging: TempDir,
    parent: PathBuf,
    target: PathBuf,
    files: Vec<PathBuf>,
}

impl StagedOutputs {
    /// Create a staging directory for outputs that will land in `target`.
    pub fn new(target: &Path) -> Result<Self, AppError> {
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| AppError::io("Failed to create directory", &parent, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".wellplate-staging-")
            .tempdir_in(&parent)
            .map_err(|e| AppError::io("Failed to create staging directory in", &parent, e))?;
        Ok(Self {
            staging,
            parent,
            target: target.to_path_buf(),
            files: Vec::new(),
        })
    }

    /// Staging path for an output file; `file_name` is relative to the output folder.
    pub fn path_for(&mut self, file_name: &str) -> Result<PathBuf, AppError> {
        let rel = Path::new(file_name);
        let is_plain_relative = !file_name.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !is_plain_relative {
            return Err(AppError::config(format!(
                "Output file name '{file_name}' must be a relative path inside the output folder."
            )));
        }
        let path = self.staging.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::io("Failed to create directory", parent, e))?;
        }
        if !self.files.iter().any(|f| f == rel) {
            self.files.push(rel.to_path_buf());
        }
        Ok(path)
    }

    /// Move every staged file into the output folder. Returns the final paths.
    ///
    /// Files in the output folder named in `retired` that this run did not
    /// produce are removed; anything else already there is left alone.
    pub fn publish(self, retired: &[&str]) -> Result<Vec<PathBuf>, AppError> {
        std::fs::create_dir_all(&self.target).map_err(|e| AppError::io("Failed to create output folder", &self.target, e))?;
        let previous = tempfile::Builder::new()
            .prefix(".wellplate-previous-")
            .tempdir_in(&self.parent)
            .map_err(|e| AppError::io("Failed to create staging directory in", &self.parent, e))?;

        let mut set_aside = Vec::new();
        let mut placed = Vec::new();
        match self.swap_in(retired, previous.path(), &mut set_aside, &mut placed) {
            Ok(()) => Ok(placed.iter().map(|rel| self.target.join(rel)).collect()),
            Err(err) => {
                self.roll_back(previous.path(), &set_aside, &placed);
                Err(err)
            }
        }
    }

    fn swap_in(
        &self,
        retired: &[&str],
        previous: &Path,
        set_aside: &mut Vec<PathBuf>,
        placed: &mut Vec<PathBuf>,
    ) -> Result<(), AppError> {
        let stale = retired
            .iter()
            .map(Path::new)
            .filter(|rel| !self.files.iter().any(|f| f == rel));
        for rel in self.files.iter().map(PathBuf::as_path).chain(stale) {
            let existing = self.target.join(rel);
            if !existing.is_file() {
                continue;
            }
            let aside = previous.join(rel);
            create_parent(&aside)?;
            std::fs::rename(&existing, &aside).map_err(|e| AppError::io("Failed to set aside previous output", &existing, e))?;
            set_aside.push(rel.to_path_buf());
        }

        for rel in &self.files {
            let from = self.staging.path().join(rel);
            let to = self.target.join(rel);
            create_parent(&to)?;
            std::fs::rename(&from, &to).map_err(|e| AppError::io("Failed to publish output", &to, e))?;
            placed.push(rel.clone());
        }
        Ok(())
    }

    /// Best effort: the original error is what gets reported.
    fn roll_back(&self, previous: &Path, set_aside: &[PathBuf], placed: &[PathBuf]) {
        for rel in placed {
            std::fs::remove_file(self.target.join(rel)).ok();
        }
        for rel in set_aside {
            std::fs::rename(previous.join(rel), self.target.join(rel)).ok();
        }
    }
}

fn create_parent(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|e| AppError::io("Failed to create directory", parent, e)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_moves_files_into_target() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("results");
        let mut staged = StagedOutputs::new(&target).unwrap();
        std::fs::write(staged.path_for("a.csv").unwrap(), "x").unwrap();
        std::fs::write(staged.path_for("plots/b.svg").unwrap(), "y").unwrap();
        assert!(!target.exists());

        let published = staged.publish(&[]).unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(std::fs::read_to_string(target.join("plots/b.svg")).unwrap(), "y");
        // Staging directory is gone; only `results` remains in the parent.
        let entries: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn dropping_without_publish_leaves_nothing() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("results");
        {
            let mut staged = StagedOutputs::new(&target).unwrap();
            std::fs::write(staged.path_for("a.csv").unwrap(), "x").unwrap();
        }
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn escaping_file_names_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let mut staged = StagedOutputs::new(&root.path().join("out")).unwrap();
        assert!(staged.path_for("../evil.csv").is_err());
        assert!(staged.path_for("/etc/evil.csv").is_err());
        assert!(staged.path_for("").is_err());
    }

    #[test]
    fn publish_replaces_outputs_and_removes_retired_names() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("results");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("a.csv"), "old").unwrap();
        std::fs::write(target.join("MEFL.csv"), "old").unwrap();
        std::fs::write(target.join("notes.txt"), "mine").unwrap();

        let mut staged = StagedOutputs::new(&target).unwrap();
        std::fs::write(staged.path_for("a.csv").unwrap(), "new").unwrap();
        staged.publish(&["a.csv", "MEFL.csv", "calibration.json"]).unwrap();

        assert_eq!(std::fs::read_to_string(target.join("a.csv")).unwrap(), "new");
        assert!(!target.join("MEFL.csv").exists());
        assert_eq!(std::fs::read_to_string(target.join("notes.txt")).unwrap(), "mine");
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_publish_restores_previous_outputs() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("results");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("a.csv"), "old").unwrap();
        std::fs::write(target.join("MEFL.csv"), "old").unwrap();

        let mut staged = StagedOutputs::new(&target).unwrap();
        std::fs::write(staged.path_for("a.csv").unwrap(), "new").unwrap();
        // `b.csv` is registered but never written, so moving it in fails.
        staged.path_for("b.csv").unwrap();
        assert!(staged.publish(&["MEFL.csv"]).is_err());

        assert_eq!(std::fs::read_to_string(target.join("a.csv")).unwrap(), "old");
        assert_eq!(std::fs::read_to_string(target.join("MEFL.csv")).unwrap(), "old");
        assert!(!target.join("b.csv").exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }
}
