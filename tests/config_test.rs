// Bindings files and the command-line surface

use pretty_assertions::assert_eq;
use std::path::PathBuf;
use urimatch::cli::{cli, run};
use urimatch::{BindingsFile, Template, Value};

/// Write `content` under a per-test name in the system temp directory
fn write_temp(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("urimatch-{}-{}", std::process::id(), name));
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_yaml_file_and_expand() {
    let path = write_temp(
        "repo.yml",
        "variables:\n  owner: rust-lang\n  repo: regex\n  labels: [bug, help wanted]\n",
    );

    let file = BindingsFile::load(&path).unwrap();
    let rendered = Template::parse("/repos/{owner}/{repo}/issues{?labels}")
        .unwrap()
        .expand(&file.bindings());

    assert_eq!(rendered, "/repos/rust-lang/regex/issues?labels=bug,help%20wanted");
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_load_json_file_with_hints() {
    let path = write_temp(
        "filter.json",
        r#"{"variables": {"filter": {"lang": "rust"}}, "hints": {"map": ["filter"]}}"#,
    );

    let file = BindingsFile::load(&path).unwrap();
    assert_eq!(file.variables["filter"], Value::map([("lang", "rust")]));
    assert!(file.shape_hints().unwrap().is_map("filter"));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_cli_expand_from_file_with_override() {
    let path = write_temp("override.yaml", "variables:\n  q: rust\n  page: 1\n");
    let path_arg = path.to_string_lossy().to_string();

    let matches = cli()
        .try_get_matches_from(["urimatch", "expand", "/search{?q,page}", "-f", path_arg.as_str(), "-v", "page=2"])
        .unwrap();
    assert_eq!(run(&matches).unwrap(), "/search?q=rust&page=2");
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_cli_match_uses_file_hints() {
    let path = write_temp("hints.yml", "hints:\n  list: [ids]\n");
    let path_arg = path.to_string_lossy().to_string();

    let matches = cli()
        .try_get_matches_from(["urimatch", "match", "/items{?ids}", "/items?ids=7", "-f", path_arg.as_str()])
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&run(&matches).unwrap()).unwrap();

    assert_eq!(
        json,
        serde_json::json!({ "variables": { "ids": ["7"] }, "hints": { "list": ["ids"] } })
    );
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_cli_requires_subcommand() {
    assert!(cli().try_get_matches_from(["urimatch"]).is_err());
}
