pub mod config;

use regex::Regex;

#[derive(Debug, Clone)]
pub enum HostnameMatcher {
    Pattern(Regex),
    List(Vec<String>),
}

impl HostnameMatcher {
    fn matches(&self, hostname: &str) -> bool {
        match self {
            HostnameMatcher::Pattern(re) => re.is_match(hostname),
            HostnameMatcher::List(names) => names.iter().any(|name| name == hostname),
        }
    }
}

/// An absent field never matches.
#[derive(Debug, Clone, Default)]
pub struct BypassFilter {
    pub hostnames: Option<HostnameMatcher>,
    pub ips: Option<Vec<String>>,
}

impl BypassFilter {
    pub fn matches(&self, origin: &RequestOrigin) -> bool {
        let by_hostname = match (self.hostnames.as_ref(), origin.hostname) {
            (Some(matcher), Some(hostname)) => matcher.matches(hostname),
            _ => false,
        };
        if by_hostname {
            return true;
        }
        match (self.ips.as_ref(), origin.ip) {
            (Some(ips), Some(ip)) => ips.iter().any(|item| item == ip),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BypassRuleSet {
    pub enabled: bool,
    pub inclusion: Option<BypassFilter>,
    pub exclusion: Option<BypassFilter>,
}

impl Default for BypassRuleSet {
    fn default() -> Self {
        Self {
            enabled: true,
            inclusion: None,
            exclusion: None,
        }
    }
}

/// Where a request comes from.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOrigin<'a> {
    pub hostname: Option<&'a str>,
    pub ip: Option<&'a str>,
}

/// Decides whether a request may skip the access-token verification.
///
/// | inclusion | exclusion | bypassed                |
/// |-----------|-----------|-------------------------|
/// | set       | set       | included and not excluded |
/// | set       | -         | included                |
/// | -         | set       | not excluded            |
/// | -         | -         | never                   |
pub fn is_bypassed(origin: &RequestOrigin, rules: &BypassRuleSet) -> bool {
    if !rules.enabled {
        return false;
    }

    let included = rules.inclusion.as_ref().map(|f| f.matches(origin));
    let excluded = rules.exclusion.as_ref().map(|f| f.matches(origin));
    match (included, excluded) {
        (Some(incl), Some(excl)) => incl && !excl,
        (Some(incl), None) => incl,
        (None, Some(excl)) => !excl,
        (None, None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn origin<'a>(hostname: &'a str, ip: &'a str) -> RequestOrigin<'a> {
        RequestOrigin {
            hostname: Some(hostname),
            ip: Some(ip),
        }
    }

    #[test]
    fn test_filter_matches() {
        let filter = BypassFilter {
            hostnames: Some(HostnameMatcher::Pattern(Regex::new(r"\.internal$").unwrap())),
            ips: Some(list(&["10.0.0.1"])),
        };
        assert!(filter.matches(&origin("api.internal", "1.1.1.1")));
        assert!(filter.matches(&origin("example.com", "10.0.0.1")));
        assert!(!filter.matches(&origin("example.com", "1.1.1.1")));
        assert!(!filter.matches(&RequestOrigin::default()));

        // Patterns search anywhere in the hostname.
        let filter = BypassFilter {
            hostnames: Some(HostnameMatcher::Pattern(Regex::new("local").unwrap())),
            ips: None,
        };
        assert!(filter.matches(&origin("my-localhost.dev", "")));

        let filter = BypassFilter {
            hostnames: Some(HostnameMatcher::List(list(&["localhost"]))),
            ips: None,
        };
        assert!(filter.matches(&origin("localhost", "")));
        assert!(!filter.matches(&origin("localhost.dev", "")));
        assert!(!BypassFilter::default().matches(&origin("localhost", "127.0.0.1")));
    }

    #[test]
    fn test_is_bypassed() {
        let inclusion = BypassFilter {
            hostnames: Some(HostnameMatcher::List(list(&["localhost", "trusted.internal"]))),
            ips: None,
        };
        let exclusion = BypassFilter {
            hostnames: None,
            ips: Some(list(&["127.0.0.1"])),
        };

        let both = BypassRuleSet {
            enabled: true,
            inclusion: Some(inclusion.clone()),
            exclusion: Some(exclusion.clone()),
        };
        assert!(is_bypassed(&origin("trusted.internal", "10.0.0.7"), &both));
        assert!(!is_bypassed(&origin("localhost", "127.0.0.1"), &both));
        assert!(!is_bypassed(&origin("example.com", "10.0.0.7"), &both));

        let inclusion_only = BypassRuleSet {
            enabled: true,
            inclusion: Some(inclusion),
            exclusion: None,
        };
        assert!(is_bypassed(&origin("localhost", "127.0.0.1"), &inclusion_only));
        assert!(!is_bypassed(&origin("example.com", "127.0.0.1"), &inclusion_only));

        let exclusion_only = BypassRuleSet {
            enabled: true,
            inclusion: None,
            exclusion: Some(exclusion),
        };
        assert!(!is_bypassed(&origin("localhost", "127.0.0.1"), &exclusion_only));
        assert!(is_bypassed(&origin("example.com", "8.8.8.8"), &exclusion_only));

        assert!(!is_bypassed(&origin("localhost", "127.0.0.1"), &BypassRuleSet::default()));

        let disabled = BypassRuleSet {
            enabled: false,
            ..exclusion_only
        };
        assert!(!is_bypassed(&origin("example.com", "8.8.8.8"), &disabled));
    }
}
