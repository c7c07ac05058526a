pub mod config;
pub mod extractor;
pub mod handshake;
pub mod rule;

use std::sync::Arc;

use log::debug;

use crate::compiler::RuleCompiler;
use crate::context::RequestContext;
use crate::request::AccessRequest;

use self::config::AuthzConfig;
use self::extractor::{PermissionExtractor, PermissionSource};
use self::handshake::GroupPermissionLookup;
use self::rule::{evaluate_rules, PermissionRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allowed,
    Denied,
    /// No rule applies to the request, or the authorization is disabled.
    Indifferent,
}

/// Checks the permissions of verified callers against the permission rules.
pub struct PermissionEvaluator {
    enabled: bool,
    rules: Vec<PermissionRule>,
    extractor: PermissionExtractor,
}

impl PermissionEvaluator {
    /// Locations configured in `cfg` win over the custom `source`.
    pub fn new(
        cfg: &AuthzConfig,
        source: Option<Arc<dyn PermissionSource>>,
        lookup: Option<Arc<dyn GroupPermissionLookup>>,
    ) -> Self {
        let paths = cfg
            .permission_location
            .as_ref()
            .map(|l| l.segments())
            .unwrap_or_default();
        let group_paths = cfg
            .permission_group_location
            .as_ref()
            .map(|l| l.segments())
            .unwrap_or_default();

        let extractor = if !paths.is_empty() || !group_paths.is_empty() {
            debug!("Read permissions from {paths:?} and permission groups from {group_paths:?}");
            PermissionExtractor::Location {
                paths,
                group_paths,
                lookup,
            }
        } else if let Some(source) = source {
            debug!("Read permissions with the provided permission source");
            PermissionExtractor::Custom(source)
        } else {
            debug!("No permission source, callers have no permission");
            PermissionExtractor::None
        };

        Self {
            enabled: cfg.enabled,
            rules: RuleCompiler::compile_permission_rules(&cfg.permission_rules),
            extractor,
        }
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }

    pub fn extractor(&self) -> &PermissionExtractor {
        &self.extractor
    }

    pub async fn check_permissions(
        &self,
        req: &AccessRequest,
        ctx: &RequestContext,
    ) -> PermissionDecision {
        if !self.enabled {
            return PermissionDecision::Indifferent;
        }
        let permissions = self.extractor.extract(req, ctx).await;
        let decision = evaluate_rules(&self.rules, &req.url, &req.method, &permissions);
        debug!(
            "Req[{}] - permission decision for {} {}: {decision:?}",
            req.request_id, req.method, req.url
        );
        decision
    }
}
