use log::warn;
use regex::Regex;
use serde_json::Value;

use crate::authz::config::PermissionRuleConfig;
use crate::authz::rule::PermissionRule;
use crate::bypass::config::BypassRulesConfig;
use crate::bypass::{BypassFilter, BypassRuleSet, HostnameMatcher};

/// Mount-style path patterns: a pattern matches a path equal to it or any
/// path below it. `*` matches any run of characters, `:name` one segment.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    patterns: Vec<Regex>,
}

impl PathMatcher {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }
}

/// Turns raw configuration into evaluation-ready rules. Malformed entries are
/// logged and compiled into rules that never match.
pub struct RuleCompiler;

impl RuleCompiler {
    const DEFAULT_URL_PATTERN: &'static str = "/(.*)";

    pub fn compile_permission_rules(rules: &[PermissionRuleConfig]) -> Vec<PermissionRule> {
        rules
            .iter()
            .filter(|rule| rule.enabled != Some(false))
            .map(|rule| {
                let url = rule.url.as_deref().unwrap_or(Self::DEFAULT_URL_PATTERN);
                let url_pattern = match Regex::new(url) {
                    Ok(re) => Some(re),
                    Err(err) => {
                        warn!("Invalid url pattern '{url}' in permission rule, it will never match: {err}");
                        None
                    }
                };
                PermissionRule {
                    url_pattern,
                    methods: rule
                        .methods
                        .to_vec()
                        .into_iter()
                        .map(|m| m.to_uppercase())
                        .collect(),
                    permission: rule.permission.clone().unwrap_or_default(),
                }
            })
            .collect()
    }

    pub fn compile_bypass_rules(cfg: &BypassRulesConfig) -> BypassRuleSet {
        BypassRuleSet {
            enabled: cfg.enabled != Some(false),
            inclusion: cfg
                .inclusion
                .as_ref()
                .map(|raw| Self::compile_filter("inclusion", raw)),
            exclusion: cfg
                .exclusion
                .as_ref()
                .map(|raw| Self::compile_filter("exclusion", raw)),
        }
    }

    fn compile_filter(name: &str, raw: &Value) -> BypassFilter {
        let Some(fields) = raw.as_object() else {
            warn!("Bypassing filter '{name}' is not an object, it will never match");
            return BypassFilter::default();
        };

        let hostnames = match fields.get("hostnames") {
            None => None,
            Some(Value::Array(items)) => Some(HostnameMatcher::List(Self::strings(items))),
            Some(Value::String(pattern)) => match Regex::new(pattern) {
                Ok(re) => Some(HostnameMatcher::Pattern(re)),
                Err(err) => {
                    warn!("Invalid hostnames pattern '{pattern}' in '{name}': {err}");
                    None
                }
            },
            Some(other) => {
                warn!("Unsupported hostnames value {other} in '{name}', ignored");
                None
            }
        };

        let ips = match fields.get("ips") {
            None => None,
            Some(Value::Array(items)) => Some(Self::strings(items)),
            Some(other) => {
                warn!("Unsupported ips value {other} in '{name}', ignored");
                None
            }
        };

        BypassFilter { hostnames, ips }
    }

    fn strings(items: &[Value]) -> Vec<String> {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect()
    }

    pub fn compile_path_patterns(paths: &[String]) -> PathMatcher {
        let mut patterns = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::compile_path(path) {
                Ok(re) => patterns.push(re),
                Err(err) => warn!("Invalid path pattern '{path}', it will never match: {err}"),
            }
        }
        PathMatcher { patterns }
    }

    fn compile_path(path: &str) -> Result<Regex, regex::Error> {
        let trimmed = path.trim_end_matches('/');
        let mut expr = String::from("(?i)^");
        let mut chars = trimmed.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => expr.push_str(".*"),
                ':' if chars.peek().map(|c| c.is_alphanumeric()).unwrap_or(false) => {
                    while chars
                        .peek()
                        .map(|c| c.is_alphanumeric() || *c == '_')
                        .unwrap_or(false)
                    {
                        chars.next();
                    }
                    expr.push_str("[^/]+");
                }
                _ => expr.push_str(&regex::escape(&c.to_string())),
            }
        }
        expr.push_str("(?:/.*)?$");
        Regex::new(&expr)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_compile_permission_rules() {
        let rules: Vec<PermissionRuleConfig> = vec![
            PermissionRuleConfig {
                url: Some(String::from("/jwt/authorized(.*)")),
                methods: crate::config::StringList::List(vec![
                    String::from("get"),
                    String::from("POST"),
                ]),
                permission: Some(String::from("VIEW_APPLICATION")),
                ..Default::default()
            },
            PermissionRuleConfig {
                enabled: Some(false),
                ..Default::default()
            },
            PermissionRuleConfig {
                url: Some(String::from("/broken(")),
                ..Default::default()
            },
            PermissionRuleConfig::default(),
        ];

        let compiled = RuleCompiler::compile_permission_rules(&rules);
        assert_eq!(compiled.len(), 3);
        assert_eq!(compiled[0].methods, vec!["GET", "POST"]);
        assert_eq!(compiled[0].permission, "VIEW_APPLICATION");
        assert!(compiled[1].url_pattern.is_none());
        assert_eq!(
            compiled[2].url_pattern.as_ref().map(|re| re.as_str()),
            Some("/(.*)")
        );
        assert!(compiled[2].permission.is_empty());
    }

    #[test]
    fn test_compile_bypass_rules() {
        let cfg = BypassRulesConfig {
            enabled: None,
            inclusion: Some(json!({"hostnames": ".+\\.internal$", "ips": ["10.0.0.1", 5]})),
            exclusion: Some(json!({"hostnames": ["a", 1, "b"], "ips": "127.0.0.1"})),
        };
        let rules = RuleCompiler::compile_bypass_rules(&cfg);
        assert!(rules.enabled);

        let inclusion = rules.inclusion.unwrap();
        assert!(matches!(inclusion.hostnames, Some(HostnameMatcher::Pattern(_))));
        assert_eq!(inclusion.ips, Some(vec![String::from("10.0.0.1")]));

        let exclusion = rules.exclusion.unwrap();
        match exclusion.hostnames {
            Some(HostnameMatcher::List(names)) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("unexpected hostnames {other:?}"),
        }
        assert!(exclusion.ips.is_none());

        let cfg = BypassRulesConfig {
            enabled: Some(false),
            inclusion: Some(json!("localhost")),
            exclusion: Some(json!({"hostnames": "(unclosed", "ips": {"a": 1}})),
        };
        let rules = RuleCompiler::compile_bypass_rules(&cfg);
        assert!(!rules.enabled);
        let inclusion = rules.inclusion.unwrap();
        assert!(inclusion.hostnames.is_none() && inclusion.ips.is_none());
        let exclusion = rules.exclusion.unwrap();
        assert!(exclusion.hostnames.is_none() && exclusion.ips.is_none());

        // Compiling never touches the input.
        assert_eq!(cfg.inclusion, Some(json!("localhost")));
    }

    fn bypassed(rules: &BypassRuleSet, cases: &[(&str, &str)]) -> Vec<bool> {
        cases
            .iter()
            .map(|(hostname, ip)| {
                let origin = crate::bypass::RequestOrigin {
                    hostname: Some(*hostname),
                    ip: Some(*ip),
                };
                crate::bypass::is_bypassed(&origin, rules)
            })
            .collect()
    }

    #[test]
    fn test_bypass_hostname_patterns() {
        let cases = [
            ("example.com", "127.0.0.1"),
            ("www.example.org", "127.0.0.1"),
            ("example.net", "192.168.1.102"),
            ("devebot.com", "192.168.1.102"),
            ("devebot.com", "127.0.0.1"),
        ];
        let filter = json!({
            "hostnames": "example\\.(com|net|org)",
            "ips": ["192.168.1.101", "192.168.1.102"],
        });

        let rules = RuleCompiler::compile_bypass_rules(&BypassRulesConfig {
            enabled: None,
            inclusion: None,
            exclusion: Some(filter.clone()),
        });
        assert_eq!(bypassed(&rules, &cases), [false, false, false, false, true]);

        let rules = RuleCompiler::compile_bypass_rules(&BypassRulesConfig {
            enabled: None,
            inclusion: Some(filter),
            exclusion: None,
        });
        assert_eq!(bypassed(&rules, &cases), [true, true, true, true, false]);

        let rules = RuleCompiler::compile_bypass_rules(&BypassRulesConfig {
            enabled: None,
            inclusion: Some(json!({
                "hostnames": "example\\.(com|net|org)",
                "ips": ["192.168.1.102", "192.168.1.103"],
            })),
            exclusion: Some(json!({
                "hostnames": ["example.com", "testing.com"],
                "ips": ["192.168.1.101", "192.168.1.102"],
            })),
        });
        let cases = [
            ("example.com", "127.0.0.1"),
            ("unknown.com", "192.168.1.102"),
            ("booking.net", "127.0.0.1"),
            ("devebot.com", "192.168.1.101"),
            ("devebot.com", "192.168.1.103"),
        ];
        assert_eq!(bypassed(&rules, &cases), [false, false, false, false, true]);
    }

    #[test]
    fn test_compile_path_patterns() {
        let matcher = RuleCompiler::compile_path_patterns(&[
            String::from("/example/jwt/session-info"),
            String::from("/example/jwt/authorized*"),
            String::from("/users/:id/profile/"),
        ]);
        assert!(!matcher.is_empty());

        assert!(matcher.matches("/example/jwt/session-info"));
        assert!(matcher.matches("/example/jwt/session-info/details"));
        assert!(matcher.matches("/EXAMPLE/jwt/session-info"));
        assert!(!matcher.matches("/example/jwt/session-information"));

        assert!(matcher.matches("/example/jwt/authorized"));
        assert!(matcher.matches("/example/jwt/authorized/1"));
        assert!(matcher.matches("/example/jwt/authorizedXYZ"));

        assert!(matcher.matches("/users/12/profile"));
        assert!(!matcher.matches("/users/12/13/profile"));

        assert!(!matcher.matches("/example"));
        assert!(RuleCompiler::compile_path_patterns(&[]).is_empty());
    }
}
