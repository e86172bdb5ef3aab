//! Where actual and intended configurations come from.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ComplianceError, Result};
use crate::rules::model::Device;
use crate::storage::models::ConfigKind;

/// Loads one configuration artifact for a device.
pub trait ArtifactSource: Send + Sync {
    fn load(&self, device: &Device, kind: ConfigKind) -> Result<String>;
}

/// Artifacts on disk, located by a path template under a repository root
/// per kind. Templates may use `{device}` and `{platform}`.
#[derive(Debug, Clone)]
pub struct FsArtifactSource {
    pub backup_root: PathBuf,
    pub backup_template: String,
    pub intended_root: PathBuf,
    pub intended_template: String,
}

impl FsArtifactSource {
    pub fn new(backup_root: impl Into<PathBuf>, intended_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
            backup_template: "{device}.cfg".to_string(),
            intended_root: intended_root.into(),
            intended_template: "{device}.cfg".to_string(),
        }
    }

    pub fn with_templates(mut self, backup: &str, intended: &str) -> Self {
        self.backup_template = backup.to_string();
        self.intended_template = intended.to_string();
        self
    }

    /// Full path of the artifact for `device`.
    pub fn path_for(&self, device: &Device, kind: ConfigKind) -> PathBuf {
        let (root, template) = match kind {
            ConfigKind::Actual => (&self.backup_root, &self.backup_template),
            ConfigKind::Intended => (&self.intended_root, &self.intended_template),
        };
        root.join(render_template(template, device))
    }
}

fn render_template(template: &str, device: &Device) -> String {
    template
        .replace("{device}", &device.name)
        .replace("{platform}", &device.platform)
}

impl ArtifactSource for FsArtifactSource {
    fn load(&self, device: &Device, kind: ConfigKind) -> Result<String> {
        let path = self.path_for(device, kind);
        read_artifact(&path, device, kind)
    }
}

fn read_artifact(path: &Path, device: &Device, kind: ConfigKind) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ComplianceError::ConfigNotFound {
            device: device.name.clone(),
            kind,
            path: path.to_path_buf(),
        },
        _ => ComplianceError::ConfigUnreadable {
            device: device.name.clone(),
            kind,
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Artifacts handed over by the host, keyed by device name.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactSource {
    artifacts: HashMap<(String, ConfigKind), String>,
}

impl MemoryArtifactSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, device: &str, kind: ConfigKind, content: impl Into<String>) -> &mut Self {
        self.artifacts.insert((device.to_string(), kind), content.into());
        self
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactSource for MemoryArtifactSource {
    fn load(&self, device: &Device, kind: ConfigKind) -> Result<String> {
        self.artifacts
            .get(&(device.name.clone(), kind))
            .cloned()
            .ok_or_else(|| ComplianceError::ConfigNotFound {
                device: device.name.clone(),
                kind,
                path: PathBuf::from(format!("memory://{}/{}", kind, device.name)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    fn device() -> Device {
        Device {
            id: Uuid::new_v4(),
            name: "nyc-rtr-01".to_string(),
            platform: "cisco_ios".to_string(),
        }
    }

    fn scratch_dir() -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let dir = std::env::temp_dir().join(format!("gc-artifacts-{}-{}", std::process::id(), nanos));
        fs::create_dir_all(dir.join("cisco_ios")).unwrap();
        dir
    }

    #[test]
    fn test_template_substitution() {
        let source = FsArtifactSource::new("/backups", "/intended")
            .with_templates("{platform}/{device}.cfg", "{device}.intended.cfg");
        assert_eq!(
            source.path_for(&device(), ConfigKind::Actual),
            PathBuf::from("/backups/cisco_ios/nyc-rtr-01.cfg")
        );
        assert_eq!(
            source.path_for(&device(), ConfigKind::Intended),
            PathBuf::from("/intended/nyc-rtr-01.intended.cfg")
        );
    }

    #[test]
    fn test_reads_existing_file() {
        let dir = scratch_dir();
        fs::write(dir.join("cisco_ios").join("nyc-rtr-01.cfg"), "hostname nyc-rtr-01\n").unwrap();
        let source = FsArtifactSource::new(&dir, &dir).with_templates("{platform}/{device}.cfg", "{device}.cfg");

        assert_eq!(
            source.load(&device(), ConfigKind::Actual).unwrap(),
            "hostname nyc-rtr-01\n"
        );
        let err = source.load(&device(), ConfigKind::Intended).unwrap_err();
        assert_eq!(err.kind(), "config_not_found");
        assert!(err.to_string().starts_with("E3005"));
        assert!(err.to_string().contains("nyc-rtr-01.cfg"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unreadable_file_is_not_reported_missing() {
        let dir = scratch_dir();
        fs::write(dir.join("nyc-rtr-01.cfg"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let source = FsArtifactSource::new(&dir, &dir);

        let err = source.load(&device(), ConfigKind::Actual).unwrap_err();
        assert_eq!(err.kind(), "config_unreadable");
        assert!(err.to_string().contains("nyc-rtr-01.cfg"));
        assert!(!err.to_string().contains("unable to locate"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_memory_source() {
        let mut source = MemoryArtifactSource::new();
        source.insert("nyc-rtr-01", ConfigKind::Actual, "a");
        assert_eq!(source.load(&device(), ConfigKind::Actual).unwrap(), "a");
        let err = source.load(&device(), ConfigKind::Intended).unwrap_err();
        assert!(err.to_string().contains("memory://intended/nyc-rtr-01"));
    }
}
