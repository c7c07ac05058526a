use proptest::prelude::*;
use regex::Regex;

use restguard::bypass::{is_bypassed, BypassFilter, BypassRuleSet, HostnameMatcher, RequestOrigin};

const HOSTNAMES: [&str; 4] = ["example.com", "devebot.com", "testing.com", "unknown.com"];
const IPS: [&str; 4] = ["127.0.0.1", "192.168.1.101", "192.168.1.102", "192.168.1.103"];

#[derive(Debug, Clone)]
struct Filter {
    hostnames: Vec<String>,
    ips: Vec<String>,
    as_pattern: bool,
}

impl Filter {
    fn matches(&self, hostname: &str, ip: &str) -> bool {
        self.hostnames.iter().any(|h| h == hostname) || self.ips.iter().any(|i| i == ip)
    }

    fn hostname_matcher(&self) -> HostnameMatcher {
        if !self.as_pattern {
            return HostnameMatcher::List(self.hostnames.clone());
        }
        let names: Vec<String> = self.hostnames.iter().map(|h| regex::escape(h)).collect();
        let re = Regex::new(&format!("^({})$", names.join("|"))).unwrap();
        HostnameMatcher::Pattern(re)
    }

    fn compile(&self) -> BypassFilter {
        BypassFilter {
            hostnames: Some(self.hostname_matcher()),
            ips: Some(self.ips.clone()),
        }
    }
}

fn arb_filter() -> impl Strategy<Value = Filter> {
    (
        proptest::sample::subsequence(HOSTNAMES.to_vec(), 0..=HOSTNAMES.len()),
        proptest::sample::subsequence(IPS.to_vec(), 0..=IPS.len()),
        any::<bool>(),
    )
        .prop_map(|(hostnames, ips, as_pattern)| Filter {
            hostnames: hostnames.into_iter().map(String::from).collect(),
            ips: ips.into_iter().map(String::from).collect(),
            as_pattern,
        })
}

fn expected(
    enabled: bool,
    inclusion: Option<&Filter>,
    exclusion: Option<&Filter>,
    hostname: &str,
    ip: &str,
) -> bool {
    if !enabled {
        return false;
    }
    match (inclusion, exclusion) {
        (Some(incl), Some(excl)) => incl.matches(hostname, ip) && !excl.matches(hostname, ip),
        (Some(incl), None) => incl.matches(hostname, ip),
        (None, Some(excl)) => !excl.matches(hostname, ip),
        (None, None) => false,
    }
}

proptest! {
    #[test]
    fn prop_bypass_follows_truth_table(
        enabled in any::<bool>(),
        inclusion in proptest::option::of(arb_filter()),
        exclusion in proptest::option::of(arb_filter()),
        hostname in proptest::sample::select(HOSTNAMES.to_vec()),
        ip in proptest::sample::select(IPS.to_vec()),
    ) {
        let rules = BypassRuleSet {
            enabled,
            inclusion: inclusion.as_ref().map(Filter::compile),
            exclusion: exclusion.as_ref().map(Filter::compile),
        };
        let origin = RequestOrigin {
            hostname: Some(hostname),
            ip: Some(ip),
        };
        prop_assert_eq!(
            is_bypassed(&origin, &rules),
            expected(enabled, inclusion.as_ref(), exclusion.as_ref(), hostname, ip)
        );
    }

    #[test]
    fn prop_no_rules_never_bypass(
        enabled in any::<bool>(),
        hostname in "[a-z]{1,12}\\.(com|net|org)",
        ip in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
    ) {
        let rules = BypassRuleSet {
            enabled,
            inclusion: None,
            exclusion: None,
        };
        let origin = RequestOrigin {
            hostname: Some(&hostname),
            ip: Some(&ip),
        };
        prop_assert!(!is_bypassed(&origin, &rules));
    }
}
