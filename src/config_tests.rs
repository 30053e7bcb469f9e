use super::*;
use crate::codec::Newline;
use std::io::Write;

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(text.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_use_builtin_catalog() {
    let config = ToolConfig::default();
    assert!(config.builtin_catalog);
    let catalog = config.catalog().expect("catalog builds");
    let names: Vec<&str> = catalog.sets().iter().map(|set| set.name()).collect();
    assert_eq!(names, vec!["pester-self-hosted"]);
    assert_eq!(config.codec().options(), &CodecOptions::default());
}

#[test]
fn loads_codec_options_and_rule_sets() {
    let file = write_config(
        r#"{
  "codec": {"indent": 4, "newline": "crlf"},
  "rule_sets": [
    {
      "name": "ci-lint",
      "file_names": ["ci.yml"],
      "rules": [
        {"name": "needs-lint", "actions": [
          {"op": "ensure_list_contains", "parent": "jobs.test", "key": "needs", "value": "lint"}
        ]}
      ]
    }
  ]
}"#,
    );
    let config = load_config(file.path()).expect("config loads");
    assert_eq!(config.codec.indent, 4);
    assert_eq!(config.codec.sequence_indent, 2);
    assert_eq!(config.codec.newline, Newline::Crlf);
    let catalog = config.catalog().expect("catalog builds");
    let names: Vec<&str> = catalog.sets().iter().map(|set| set.name()).collect();
    assert_eq!(names, vec!["pester-self-hosted", "ci-lint"]);
}

#[test]
fn builtin_catalog_can_be_disabled() {
    let file = write_config(r#"{"builtin_catalog": false}"#);
    let catalog = load_config(file.path())
        .expect("config loads")
        .catalog()
        .expect("catalog builds");
    assert!(catalog.sets().is_empty());
}

#[test]
fn unknown_fields_are_rejected() {
    let file = write_config(r#"{"codec": {}, "rules": []}"#);
    let err = load_config(file.path()).expect_err("unknown field");
    assert!(format!("{err:#}").contains("parse config JSON"), "{err:#}");
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("absent.json");
    let err = load_config(&path).expect_err("missing config");
    assert!(format!("{err:#}").contains("absent.json"), "{err:#}");
}

#[test]
fn invalid_rule_set_names_itself() {
    let file = write_config(r#"{"rule_sets": [{"name": "broken", "rules": []}]}"#);
    let config = load_config(file.path()).expect("config parses");
    let err = config.catalog().expect_err("no file predicate");
    assert!(format!("{err:#}").contains("rule set \"broken\""), "{err:#}");
}
