use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::interfaces::RuleSource;
use crate::thresholds::{decode_rules, RuleReject, ThresholdRule};

/// Rules from a YAML or JSON file holding a list of wire rules.
///
/// Rules that name a `test` or `environment` only apply when it matches
/// the run; rules without them apply to every run.
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
}

impl FileRuleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RuleSource for FileRuleSource {
    async fn fetch_rules(
        &self,
        test_name: &str,
        environment: &str,
    ) -> Result<Vec<ThresholdRule>, EngineError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            EngineError::RuleSourceUnavailable {
                reason: format!("{}: {}", self.path.display(), e),
            }
        })?;
        let (rules, _rejects) = parse_rules(&raw)?;
        Ok(rules
            .into_iter()
            .filter(|r| applies(r, test_name, environment))
            .collect())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

fn applies(rule: &ThresholdRule, test_name: &str, environment: &str) -> bool {
    let test_ok = rule.test.as_deref().is_none_or(|t| t == test_name);
    let env_ok = rule.environment.as_deref().is_none_or(|e| e == environment);
    test_ok && env_ok
}

/// Parse a YAML (or JSON) list of wire rules.
///
/// A document that is not a list at all is an error; individual bad
/// entries come back as rejects.
pub fn parse_rules(raw: &str) -> Result<(Vec<ThresholdRule>, Vec<RuleReject>), EngineError> {
    let values: Vec<serde_json::Value> =
        serde_yaml::from_str(raw).map_err(|e| EngineError::RuleSourceUnavailable {
            reason: format!("rules are not a list: {e}"),
        })?;
    Ok(decode_rules(values))
}

pub fn load_rules_file(path: &Path) -> Result<(Vec<ThresholdRule>, Vec<RuleReject>), EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|e| EngineError::RuleSourceUnavailable {
        reason: format!("{}: {}", path.display(), e),
    })?;
    parse_rules(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::Scope;

    const RULES: &str = r#"
- scope: every
  target: total
  aggregation: max
  comparison: lte
  value: 3000
- name: staging only
  environment: staging
  scope: all
  target: speed_index
  aggregation: pct95
  comparison: lte
  metric: 2500
- scope: every
  target: total
  aggregation: median
  comparison: lte
  value: 1
"#;

    #[test]
    fn bad_entries_are_rejected_individually() {
        let (rules, rejects) = parse_rules(RULES).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rejects.len(), 1);
        assert_eq!(rejects[0].index, 2);
        assert_eq!(rules[1].value, 2500.0);
        assert_eq!(rules[1].scope, Scope::All);
    }

    #[test]
    fn not_a_list_is_unavailable() {
        let err = parse_rules("scope: every").unwrap_err();
        assert!(matches!(err, EngineError::RuleSourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn environment_filter_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, RULES).unwrap();
        let source = FileRuleSource::new(&path);

        let default_env = source.fetch_rules("checkout", "Default").await.unwrap();
        assert_eq!(default_env.len(), 1);
        let staging = source.fetch_rules("checkout", "staging").await.unwrap();
        assert_eq!(staging.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let source = FileRuleSource::new("/definitely/not/here.yaml");
        let err = source.fetch_rules("t", "Default").await.unwrap_err();
        assert!(matches!(err, EngineError::RuleSourceUnavailable { .. }));
    }
}
