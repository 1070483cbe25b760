mod common;

use odot_host::config::{ChannelConfig, Overrides};
use odot_host::install::paths;
use odot_host::Scope;
use serial_test::serial;

#[test]
#[serial]
fn manifest_path_resolves_for_known_browsers_user_scope() {
    let (td, _env) = common::sandbox_env();

    let host = "com.example.testhost";

    for key in paths::known_browsers() {
        // Some OS/browser combinations have no location; skip those.
        match paths::manifest_path(key, Scope::User, host) {
            Ok(p) => {
                let s = p.to_string_lossy();
                assert!(
                    p.starts_with(td.path()),
                    "user path should live in the sandbox: {s}"
                );
                assert!(
                    s.ends_with(&format!("{host}.json")),
                    "path should end with <host>.json: {s}"
                );
            }
            Err(_e) => {}
        }
    }
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn chrome_user_manifest_on_linux() {
    let (td, _env) = common::sandbox_env();
    let p = paths::manifest_path("chrome", Scope::User, "com.hackclub.odot").unwrap();
    assert_eq!(
        p,
        td.path()
            .join("home/.config/google-chrome/NativeMessagingHosts/com.hackclub.odot.json")
    );

    let p = paths::manifest_path("chrome", Scope::System, "com.hackclub.odot").unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/etc/opt/chrome/native-messaging-hosts/com.hackclub.odot.json")
    );
}

#[test]
#[serial]
#[cfg(unix)]
fn default_config_points_into_the_user_profile() {
    let (td, _env) = common::sandbox_env();
    let cfg = ChannelConfig::load(None, Overrides::default()).unwrap();

    assert!(cfg.manifest_path.starts_with(td.path()));
    assert!(cfg
        .manifest_path
        .ends_with("NativeMessagingHosts/com.hackclub.odot.json"));
    assert_eq!(
        cfg.downstream_path,
        td.path().join("home").join(".odot-tracker-data.json")
    );
}

#[test]
#[serial]
fn config_file_is_read_from_disk() {
    let (td, _env) = common::sandbox_env();
    let file = td.path().join("odot-host.toml");
    std::fs::write(
        &file,
        r#"
        browser = "edge"
        downstream_path = "{HOME}/odot/data.json"

        [host]
        description = "Odot (dev)"
        "#,
    )
    .unwrap();

    let cfg = ChannelConfig::load(Some(file.as_path()), Overrides::default()).unwrap();
    assert_eq!(cfg.host.description, "Odot (dev)");
    assert_eq!(
        cfg.downstream_path,
        td.path().join("home").join("odot").join("data.json")
    );
    assert_eq!(
        cfg.manifest_path,
        paths::manifest_path("edge", Scope::User, "com.hackclub.odot").unwrap()
    );
}
