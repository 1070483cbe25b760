#![allow(dead_code)]

use odot_host::{ChannelConfig, HostManifest};
use std::{collections::HashMap, env, path::Path};
use tempfile::TempDir;

/// Env guard that restores previous env vars on drop.
pub struct EnvGuard {
    old: HashMap<String, Option<String>>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, String)]) -> Self {
        let mut old = HashMap::new();
        for (k, v) in vars {
            old.insert((*k).to_string(), env::var(k).ok());
            env::set_var(k, v);
        }
        Self { old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, prev) in self.old.drain() {
            match prev {
                Some(v) => env::set_var(k, v),
                None => env::remove_var(k),
            }
        }
    }
}

/// Create a temp sandbox and point the profile env vars into it, so manifest
/// path resolution never touches the real user profile.
pub fn sandbox_env() -> (TempDir, EnvGuard) {
    let td = TempDir::new().expect("tempdir");
    let root = td.path().to_path_buf();

    let home = root.join("home");
    let localappdata = root.join("appdata_local");
    let programdata = root.join("programdata");
    let userprofile = root.join("userprofile");

    std::fs::create_dir_all(&home).unwrap();
    std::fs::create_dir_all(&localappdata).unwrap();
    std::fs::create_dir_all(&programdata).unwrap();
    std::fs::create_dir_all(&userprofile).unwrap();

    let guard = EnvGuard::set(&[
        ("HOME", home.to_string_lossy().to_string()),
        ("LOCALAPPDATA", localappdata.to_string_lossy().to_string()),
        ("PROGRAMDATA", programdata.to_string_lossy().to_string()),
        ("USERPROFILE", userprofile.to_string_lossy().to_string()),
    ]);

    (td, guard)
}

pub fn odot_manifest(dir: &Path) -> HostManifest {
    HostManifest::new(
        "com.hackclub.odot",
        "Odot",
        dir.join("odot-host"),
        vec!["chrome-extension://knldjmfmopnpolahpmmgbagdohdnhkik/".to_string()],
    )
}

/// Config whose manifest and downstream files live in `dir`.
pub fn config_in(dir: &Path) -> ChannelConfig {
    ChannelConfig::new(
        dir.join("NativeMessagingHosts").join("com.hackclub.odot.json"),
        dir.join("data.json"),
        odot_manifest(dir),
    )
}

/// 4-byte little-endian length followed by `payload`.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}
