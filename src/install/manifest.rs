use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

use crate::host::{NmError, Result};

/// Transport tag of a native messaging manifest. Browsers only know `stdio`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
}

/// Represents a native messaging manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostManifest {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
    #[serde(rename = "type", default)]
    pub transport: Transport,
    pub allowed_origins: Vec<String>,
}

impl HostManifest {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        path: impl Into<PathBuf>,
        allowed_origins: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            path: path.into(),
            transport: Transport::Stdio,
            allowed_origins,
        }
    }

    /// Checks the rules browsers apply before they will launch a host.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(NmError::InvalidConfig("host name must not be empty".into()));
        }
        if !self
            .name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(is_name_char))
        {
            return Err(NmError::InvalidConfig(format!(
                "host name {:?} may only contain lowercase alphanumerics, '_' and '.'-separated parts",
                self.name
            )));
        }
        // Chrome only accepts relative `path` values on Windows.
        if cfg!(unix) && !self.path.is_absolute() {
            return Err(NmError::InvalidConfig(format!(
                "host executable path {:?} must be absolute",
                self.path
            )));
        }
        Ok(())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// What [`ensure_registered`] found at the manifest path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyPresent,
}

/// Write `manifest` to `manifest_path` unless a file already exists there.
///
/// An existing file is never inspected or rewritten. Any failure to check the
/// path other than "not found" is returned as [`NmError::Registration`].
pub fn ensure_registered(manifest_path: &Path, manifest: &HostManifest) -> Result<Registration> {
    match fs::metadata(manifest_path) {
        Ok(_) => {
            tracing::debug!(path = %manifest_path.display(), "host manifest already present");
            return Ok(Registration::AlreadyPresent);
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(NmError::Registration {
                path: manifest_path.to_path_buf(),
                source,
            })
        }
    }

    let registration_err = |source| NmError::Registration {
        path: manifest_path.to_path_buf(),
        source,
    };

    let manifest_json = serde_json::to_string_pretty(manifest).map_err(NmError::SerializeJson)?;

    if let Some(parent) = manifest_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(registration_err)?;
        }
    }

    let created = write_new_file(manifest_path, |file| {
        file.write_all(manifest_json.as_bytes())
    })
    .map_err(registration_err)?;
    if !created {
        // Another host instance won the race.
        return Ok(Registration::AlreadyPresent);
    }

    tracing::info!(
        path = %manifest_path.display(),
        host = %manifest.name,
        "wrote host manifest"
    );
    Ok(Registration::Created)
}

/// Fill a temp file next to `path`, then link it into place unless `path` exists.
///
/// Returns `false` if `path` appeared in the meantime. A failed `fill` leaves
/// nothing behind at `path`.
fn write_new_file<F>(path: &Path, fill: F) -> io::Result<bool>
where
    F: FnOnce(&mut NamedTempFile) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    fill(&mut file)?;
    file.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // NamedTempFile creates files 0600.
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    match file.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(path: &str) -> HostManifest {
        HostManifest::new(
            "com.hackclub.odot",
            "Odot",
            path,
            vec!["chrome-extension://knldjmfmopnpolahpmmgbagdohdnhkik/".into()],
        )
    }

    #[test]
    fn serializes_with_browser_field_names() {
        let v = serde_json::to_value(manifest("/opt/odot/odot-host")).unwrap();
        assert_eq!(v["type"], "stdio");
        assert_eq!(v["path"], "/opt/odot/odot-host");
        assert_eq!(
            v["allowed_origins"][0],
            "chrome-extension://knldjmfmopnpolahpmmgbagdohdnhkik/"
        );
        assert!(v.get("transport").is_none());
    }

    #[test]
    fn rejects_bad_host_names() {
        for bad in ["", "Com.Example", "com..example", "com.example.", "com-example"] {
            let mut m = manifest("/opt/odot/odot-host");
            m.name = bad.to_string();
            assert!(m.validate().is_err(), "{bad:?} should be rejected");
        }
        assert!(manifest("/opt/odot/odot-host").validate().is_ok());
    }

    #[test]
    fn failed_write_leaves_no_manifest_behind() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("com.hackclub.odot.json");

        let err = write_new_file(&path, |file| {
            file.write_all(b"{\"name\":")?;
            Err(io::Error::other("disk full"))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 0);

        // The next launch still registers.
        let m = manifest("/opt/odot/odot-host");
        assert_eq!(ensure_registered(&path, &m).unwrap(), Registration::Created);
        let back: HostManifest = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn write_new_file_never_clobbers() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("m.json");
        fs::write(&path, b"first").unwrap();

        let created = write_new_file(&path, |file| file.write_all(b"second")).unwrap();
        assert!(!created);
        assert_eq!(fs::read(&path).unwrap(), b"first");
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn rejects_relative_exe_path_on_unix() {
        let err = manifest("relative/odot-host").validate().unwrap_err();
        assert!(matches!(err, NmError::InvalidConfig(_)));
    }
}
