use log::debug;
use regex::Regex;

use super::PermissionDecision;

#[derive(Debug, Clone)]
pub struct PermissionRule {
    /// `None` when the configured pattern is invalid: the rule never matches.
    pub url_pattern: Option<Regex>,
    /// Upper-cased. Empty means any method.
    pub methods: Vec<String>,
    /// Empty means no permission is required.
    pub permission: String,
}

impl PermissionRule {
    /// Whether the rule applies to the request, regardless of permissions.
    pub fn applies_to(&self, url: &str, method: &str) -> bool {
        let url_matched = match self.url_pattern.as_ref() {
            Some(re) => re.is_match(url),
            None => false,
        };
        if !url_matched {
            return false;
        }
        self.methods.is_empty() || self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}

/// The first rule that applies to the request decides.
pub fn evaluate_rules(
    rules: &[PermissionRule],
    url: &str,
    method: &str,
    permissions: &[String],
) -> PermissionDecision {
    let Some(rule) = rules.iter().find(|rule| rule.applies_to(url, method)) else {
        return PermissionDecision::Indifferent;
    };

    debug!("Extracted permissions {permissions:?} for {method} {url}");
    if rule.permission.is_empty() {
        debug!("Permission is empty, passed");
        return PermissionDecision::Allowed;
    }
    if permissions.iter().any(|p| *p == rule.permission) {
        debug!("Permission accepted: {}", rule.permission);
        return PermissionDecision::Allowed;
    }
    PermissionDecision::Denied
}
