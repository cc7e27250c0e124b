//! Suite documents on disk

use anyhow::Context;
use std::path::Path;
use suiterun_common::SuiteDraft;

/// Read a suite document. `.json` files are parsed as JSON, anything else as YAML.
pub fn load(path: &Path) -> anyhow::Result<SuiteDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading suite file {}", path.display()))?;
    let draft = parse(&content, is_json(path))
        .with_context(|| format!("parsing suite file {}", path.display()))?;
    draft.validate()?;
    Ok(draft)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn parse(content: &str, json: bool) -> anyhow::Result<SuiteDraft> {
    if json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: Checkout
environment: staging
testCases:
  - name: login
    steps:
      - navigate:/login
      - type:id=user|alice
  - name: legacy
    active: false
    steps: []
"#;

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout.yaml");
        std::fs::write(&path, YAML).unwrap();

        let draft = load(&path).unwrap();
        assert_eq!(draft.name, "Checkout");
        assert_eq!(draft.environment.as_deref(), Some("staging"));

        let cases = draft.test_cases.unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].steps, vec!["navigate:/login", "type:id=user|alice"]);
        assert!(cases[0].active);
        assert!(!cases[1].active);
    }

    #[test]
    fn test_load_json_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smoke.JSON");
        std::fs::write(&path, r#"{"name":"Smoke"}"#).unwrap();

        let suite = load(&path).unwrap().into_suite(chrono::Utc::now());
        assert_eq!(suite.environment, "dev");
        assert_eq!(suite.created_by, "system");
        assert!(suite.test_cases.is_empty());
    }

    #[test]
    fn test_blank_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "name: '  '\n").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load(Path::new("/nonexistent/suite.yaml")).is_err());
    }
}
