//! Validation System - Content Checks Before Export
//!
//! Rules produce structured violations. Exports never block on them; the
//! result travels with the export report.

use serde::{Deserialize, Serialize};

use crate::assets::{is_asset_path, ASSET_PREFIX};
use crate::tree::Node;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    #[serde(default)]
    pub path: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn messages(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.rule, v.message))
            .collect()
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, content: &Node) -> Vec<ValidationViolation>;
}

fn is_blank(content: &Node, path: &str) -> bool {
    content
        .lookup(path)
        .and_then(Node::text)
        .map_or(true, |v| v.trim().is_empty())
}

/// A text field that must be filled in.
pub struct RequiredField {
    rule: &'static str,
    path: &'static str,
    label: &'static str,
}

impl RequiredField {
    pub const SITE_TITLE: RequiredField = RequiredField {
        rule: "site_title",
        path: "site.title",
        label: "Site title",
    };

    pub const HERO_HEADLINE: RequiredField = RequiredField {
        rule: "hero_headline",
        path: "hero.headline",
        label: "Hero headline",
    };

    pub const HERO_SUBHEADLINE: RequiredField = RequiredField {
        rule: "hero_subheadline",
        path: "hero.subheadline",
        label: "Hero subheadline",
    };
}

impl ValidationRule for RequiredField {
    fn name(&self) -> &'static str {
        self.rule
    }

    fn validate(&self, content: &Node) -> Vec<ValidationViolation> {
        if !is_blank(content, self.path) {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: format!("{} is required", self.label),
            path: Some(self.path.to_string()),
            remediation: vec![format!("Fill in `{}`", self.path)],
        }]
    }
}

pub struct FeaturesRule;

impl ValidationRule for FeaturesRule {
    fn name(&self) -> &'static str {
        "features"
    }

    fn validate(&self, content: &Node) -> Vec<ValidationViolation> {
        let count = content
            .lookup("features")
            .and_then(Node::as_sequence)
            .map_or(0, |items| items.len());
        if count > 0 {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: "At least one feature is required".to_string(),
            path: Some("features".to_string()),
            remediation: vec!["Add an entry to `features`".to_string()],
        }]
    }
}

/// Asset paths that could never be placed inside a bundle.
pub struct AssetReferenceRule;

impl ValidationRule for AssetReferenceRule {
    fn name(&self) -> &'static str {
        "asset_references"
    }

    fn validate(&self, content: &Node) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        content.visit_text(&mut |leaf| {
            if !is_asset_path(leaf) {
                return;
            }
            let sub = &leaf[ASSET_PREFIX.len()..];
            let malformed = sub.is_empty()
                || sub.split('/').any(|seg| seg.is_empty() || seg == "..");
            if malformed {
                violations.push(ValidationViolation {
                    rule: "asset_references".to_string(),
                    severity: ViolationSeverity::Warning,
                    message: format!("Asset path `{}` cannot be resolved", leaf),
                    path: None,
                    remediation: vec!["Point the field at an uploaded file under /assets/".to_string()],
                });
            }
        });
        violations
    }
}

/// Validator orchestrates rules
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredField::SITE_TITLE),
                Box::new(RequiredField::HERO_HEADLINE),
                Box::new(RequiredField::HERO_SUBHEADLINE),
                Box::new(FeaturesRule),
                Box::new(AssetReferenceRule),
            ],
        }
    }

    pub fn validate(&self, content: &Node) -> ValidationResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(content))
            .collect();
        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        ValidationResult { valid, violations }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::default_content;
    use serde_json::json;

    #[test]
    fn test_default_content_is_valid() {
        let result = Validator::new().validate(&default_content());
        assert!(result.valid, "{:?}", result.messages());
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_missing_fields_reported() {
        let content = Node::from(json!({
            "site": {"title": "  "},
            "hero": {"headline": "Hi"},
            "features": []
        }));
        let result = Validator::new().validate(&content);

        assert!(!result.valid);
        let rules: Vec<_> = result.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["site_title", "hero_subheadline", "features"]);
    }

    #[test]
    fn test_malformed_asset_paths_warn_only() {
        let mut content = default_content();
        if let Node::Mapping(map) = &mut content {
            map.insert("broken".to_string(), Node::from("/assets/../etc/passwd"));
            map.insert("empty".to_string(), Node::from("/assets/"));
        }
        let result = Validator::new().validate(&content);

        assert!(result.valid);
        assert_eq!(result.violations.len(), 2);
        assert!(result
            .violations
            .iter()
            .all(|v| v.severity == ViolationSeverity::Warning));
    }
}
