use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw bypassing rules. The filters are kept untyped: malformed fields are
/// normalized when the rules are compiled.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct BypassRulesConfig {
    /// Only an explicit `false` disables the rules.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Requests matching this filter skip the verification.
    #[serde(default)]
    pub inclusion: Option<Value>,

    /// Requests matching this filter are always verified.
    #[serde(default)]
    pub exclusion: Option<Value>,
}
