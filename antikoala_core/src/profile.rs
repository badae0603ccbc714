//! User profile validation and persistence with file locking.
//!
//! The profile is a single JSON document. Writes go through a temp file
//! and an atomic rename so a crash never leaves a half-written profile.

use crate::{Error, ProfilePatch, Result, UserProfile};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Check a profile before it is saved
///
/// The engine assumes these hold and never re-checks them.
pub fn validate_profile(profile: &UserProfile) -> Result<()> {
    if profile.name.trim().is_empty() {
        return Err(Error::Validation("name must not be empty".into()));
    }
    if !(profile.weight_kg.is_finite() && profile.weight_kg > 0.0) {
        return Err(Error::Validation(format!(
            "weight must be positive, got {}",
            profile.weight_kg
        )));
    }
    if !(profile.capacity.is_finite() && profile.capacity > 0.0) {
        return Err(Error::Validation(format!(
            "capacity must be positive, got {}",
            profile.capacity
        )));
    }
    Ok(())
}

/// The on-disk profile document
#[derive(Clone, Debug)]
pub struct ProfileDocument {
    path: PathBuf,
}

impl ProfileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the profile with a shared lock
    ///
    /// Returns None if the file doesn't exist. A corrupted file is logged and
    /// also reads as None, which sends the user back through profile setup.
    pub fn load(&self) -> Result<Option<UserProfile>> {
        let path = &self.path;
        if !path.exists() {
            tracing::debug!("No profile at {:?}", path);
            return Ok(None);
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<UserProfile>(&contents) {
            Ok(profile) => {
                tracing::debug!("Loaded profile from {:?}", path);
                Ok(Some(profile))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse profile {:?}: {}. Treating as missing.",
                    path,
                    e
                );
                Ok(None)
            }
        }
    }

    /// Validate and atomically replace the stored profile
    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        validate_profile(profile)?;

        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store(format!("profile path {:?} has no parent", self.path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(profile)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Saved profile to {:?}", self.path);
        Ok(())
    }

    /// Merge a partial edit into the stored profile and save it
    ///
    /// With no stored profile the patch must carry every required field.
    pub fn merge(&self, patch: ProfilePatch) -> Result<UserProfile> {
        let profile = match self.load()? {
            Some(mut existing) => {
                patch.apply(&mut existing);
                existing
            }
            None => patch.into_profile()?,
        };
        let profile = UserProfile {
            name: profile.name.trim().to_string(),
            ..profile
        };
        self.save(&profile)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gender;

    fn profile() -> UserProfile {
        UserProfile {
            name: "지은".into(),
            gender: Gender::Female,
            weight_kg: 55.0,
            capacity: 1.5,
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let doc = ProfileDocument::new(temp_dir.path().join("profile.json"));

        doc.save(&profile()).unwrap();
        assert_eq!(doc.load().unwrap(), Some(profile()));
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let doc = ProfileDocument::new(temp_dir.path().join("missing.json"));
        assert_eq!(doc.load().unwrap(), None);
    }

    #[test]
    fn test_corrupted_profile_reads_as_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("profile.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let doc = ProfileDocument::new(&path);
        assert_eq!(doc.load().unwrap(), None);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let temp_dir = tempfile::tempdir().unwrap();
        let doc = ProfileDocument::new(temp_dir.path().join("profile.json"));

        let bad_weight = UserProfile {
            weight_kg: 0.0,
            ..profile()
        };
        assert!(matches!(doc.save(&bad_weight), Err(Error::Validation(_))));

        let bad_capacity = UserProfile {
            capacity: -1.0,
            ..profile()
        };
        assert!(matches!(doc.save(&bad_capacity), Err(Error::Validation(_))));

        let blank_name = UserProfile {
            name: "   ".into(),
            ..profile()
        };
        assert!(doc.save(&blank_name).is_err());
        assert!(!doc.path().exists());
    }

    #[test]
    fn test_merge_updates_single_field() {
        let temp_dir = tempfile::tempdir().unwrap();
        let doc = ProfileDocument::new(temp_dir.path().join("profile.json"));
        doc.save(&profile()).unwrap();

        let merged = doc
            .merge(ProfilePatch {
                capacity: Some(2.5),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(merged.capacity, 2.5);
        assert_eq!(merged.weight_kg, 55.0);
        assert_eq!(doc.load().unwrap().unwrap().capacity, 2.5);
    }

    #[test]
    fn test_merge_creates_profile_from_complete_patch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let doc = ProfileDocument::new(temp_dir.path().join("profile.json"));

        let created = doc
            .merge(ProfilePatch {
                name: Some("  준호 ".into()),
                gender: Some(Gender::Male),
                weight_kg: Some(80.0),
                capacity: Some(3.0),
            })
            .unwrap();
        assert_eq!(created.name, "준호");

        let incomplete = ProfileDocument::new(temp_dir.path().join("other.json"));
        assert!(incomplete
            .merge(ProfilePatch {
                name: Some("x".into()),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let doc = ProfileDocument::new(temp_dir.path().join("profile.json"));
        doc.save(&profile()).unwrap();
        doc.save(&profile()).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "profile.json")
            .collect();
        assert!(extras.is_empty(), "found extras: {:?}", extras);
    }
}
