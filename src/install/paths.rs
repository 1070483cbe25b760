use once_cell::sync::Lazy;
use serde::Deserialize;
use std::{collections::BTreeMap, env, fmt, path::PathBuf};

use crate::host::{NmError, Result};

static BROWSERS_TOML: &str = include_str!("browsers.toml");

static BROWSERS: Lazy<BTreeMap<String, BrowserLocations>> = Lazy::new(|| {
    toml::from_str(BROWSERS_TOML).expect("embedded browsers.toml must parse")
});

/// Where a manifest is installed: the current user's profile or machine-wide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    User,
    System,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::User => f.write_str("user"),
            Scope::System => f.write_str("system"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BrowserLocations {
    linux: Option<ScopeDirs>,
    macos: Option<ScopeDirs>,
    windows: Option<ScopeDirs>,
}

#[derive(Debug, Deserialize)]
struct ScopeDirs {
    user: Option<String>,
    system: Option<String>,
}

impl BrowserLocations {
    fn for_os(&self, os: &str) -> Option<&ScopeDirs> {
        match os {
            "linux" => self.linux.as_ref(),
            "macos" => self.macos.as_ref(),
            "windows" => self.windows.as_ref(),
            _ => None,
        }
    }
}

impl ScopeDirs {
    fn for_scope(&self, scope: Scope) -> Option<&str> {
        match scope {
            Scope::User => self.user.as_deref(),
            Scope::System => self.system.as_deref(),
        }
    }
}

/// Browser keys present in the embedded table, in sorted order.
pub fn known_browsers() -> impl Iterator<Item = &'static str> {
    BROWSERS.keys().map(String::as_str)
}

/// Directory in which `browser` looks for host manifests on this OS.
pub fn manifest_dir(browser: &str, scope: Scope) -> Result<PathBuf> {
    let os = env::consts::OS;
    let locations = BROWSERS
        .get(browser)
        .ok_or_else(|| NmError::UnknownBrowser(browser.to_string()))?;
    let template = locations
        .for_os(os)
        .and_then(|dirs| dirs.for_scope(scope))
        .ok_or_else(|| NmError::NoManifestLocation {
            browser: browser.to_string(),
            scope,
            os,
        })?;
    expand_template(template)
}

/// Full manifest path: `<manifest_dir>/<host_name>.json`.
pub fn manifest_path(browser: &str, scope: Scope, host_name: &str) -> Result<PathBuf> {
    Ok(manifest_dir(browser, scope)?.join(format!("{host_name}.json")))
}

/// Replace every `{VAR}` in `template` with the value of that environment variable.
pub fn expand_template(template: &str) -> Result<PathBuf> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            NmError::InvalidConfig(format!("unterminated placeholder in {template:?}"))
        })?;
        let var = &after[..end];
        let value = env::var_os(var).ok_or_else(|| NmError::MissingEnv(var.to_string()))?;
        out.push_str(&value.to_string_lossy());
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(PathBuf::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_lists_chromium_family() {
        let keys: Vec<_> = known_browsers().collect();
        assert_eq!(keys, ["brave", "chrome", "chromium", "edge", "vivaldi"]);
    }

    #[test]
    fn templates_without_placeholders_pass_through() {
        let p = expand_template("/etc/opt/chrome/native-messaging-hosts").unwrap();
        assert_eq!(p, PathBuf::from("/etc/opt/chrome/native-messaging-hosts"));
    }

    #[test]
    fn unterminated_placeholder_is_rejected() {
        let err = expand_template("{HOME/x").unwrap_err();
        assert!(matches!(err, NmError::InvalidConfig(_)));
    }

    #[test]
    fn unset_variable_is_reported_by_name() {
        let err = expand_template("{ODOT_HOST_SURELY_UNSET_VAR}/x").unwrap_err();
        assert!(matches!(err, NmError::MissingEnv(v) if v == "ODOT_HOST_SURELY_UNSET_VAR"));
    }

    #[test]
    fn unknown_browser_is_rejected() {
        let err = manifest_dir("netscape", Scope::User).unwrap_err();
        assert!(matches!(err, NmError::UnknownBrowser(b) if b == "netscape"));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn brave_has_no_system_location_on_linux() {
        let err = manifest_dir("brave", Scope::System).unwrap_err();
        assert!(matches!(err, NmError::NoManifestLocation { scope: Scope::System, .. }));
    }
}
