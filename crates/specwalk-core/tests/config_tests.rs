use specwalk_core::config::{
    ConfigError, DEFAULT_DEBOUNCE_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RUNNER_PROGRAM,
    DEFAULT_SUCCESS_MARKER,
};
use specwalk_core::{Config, TestKind};
use std::collections::HashMap;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.runner.program, DEFAULT_RUNNER_PROGRAM);
    assert_eq!(config.runner.success_marker, DEFAULT_SUCCESS_MARKER);
    assert_eq!(config.runner.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert_eq!(config.discovery.debounce_ms, DEFAULT_DEBOUNCE_MS);
}

#[test]
fn test_default_kind_table() {
    let kinds = Config::default().kinds;
    assert_eq!(kinds.get(TestKind::Comp).command, "ctest");
    assert_eq!(kinds.get(TestKind::Ecomp).command, "etest");
    assert_eq!(kinds.get(TestKind::Spec).command, "test");
    assert_eq!(kinds.get(TestKind::Comp).suffix, kinds.get(TestKind::Ecomp).suffix);
    assert_eq!(kinds.get(TestKind::Spec).identifiers, vec!["it", "describe"]);
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
[runner]
program = "npm"
poll_interval_ms = 250

[kinds.ecomp]
suffix = "ecomp"
command = "e2e"
identifiers = ["scenario"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.runner.program, "npm");
    assert_eq!(config.runner.poll_interval_ms, 250);
    assert_eq!(config.runner.success_marker, DEFAULT_SUCCESS_MARKER);
    assert_eq!(config.kinds.get(TestKind::Ecomp).suffix, "ecomp");
    assert_eq!(config.kinds.get(TestKind::Comp).command, "ctest");
}

#[test]
fn test_from_file_validates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("specwalk.toml");
    std::fs::write(&path, "[kinds.spec]\nsuffix = \"spec\"\ncommand = \"test\"\nidentifiers = []\n").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_from_file_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("specwalk.toml");
    std::fs::write(&path, "[runner\nprogram = ").unwrap();

    assert!(matches!(Config::from_file(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_default_config_string_round_trips() {
    let config: Config = toml::from_str(&Config::default_config_string()).unwrap();
    assert!(config.validate().is_ok());
}

fn lookup<'a>(vars: &'a HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> + 'a {
    move |name| vars.get(name).map(|v| v.to_string())
}

#[test]
fn test_overrides_apply() {
    let vars = HashMap::from([
        ("SPECWALK_RUNNER_PROGRAM", "pnpm"),
        ("SPECWALK_POLL_INTERVAL_MS", "50"),
        ("SPECWALK_DEBOUNCE_MS", "not a number"),
    ]);
    let config = Config::default().with_overrides(lookup(&vars)).unwrap();
    assert_eq!(config.runner.program, "pnpm");
    assert_eq!(config.runner.poll_interval_ms, 50);
    assert_eq!(config.discovery.debounce_ms, DEFAULT_DEBOUNCE_MS);
}

#[test]
fn test_overrides_are_validated() {
    for (name, value) in [
        ("SPECWALK_POLL_INTERVAL_MS", "0"),
        ("SPECWALK_TEST_DIR", ""),
        ("SPECWALK_TEST_DIR", "a/b"),
        ("SPECWALK_RUNNER_PROGRAM", "  "),
    ] {
        let vars = HashMap::from([(name, value)]);
        let result = Config::default().with_overrides(lookup(&vars));
        assert!(
            matches!(result, Err(ConfigError::Invalid(_))),
            "{}={:?} was accepted",
            name,
            value
        );
    }
}
