use std::sync::Arc;

use actix_web::HttpRequest;
use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::authz::extractor::PermissionSource;
use crate::authz::handshake::{GroupPermissionLookup, HandshakeLookup};
use crate::authz::{PermissionDecision, PermissionEvaluator};
use crate::bypass::{is_bypassed, BypassRuleSet, RequestOrigin};
use crate::compiler::{PathMatcher, RuleCompiler};
use crate::config::GuardConfig;
use crate::context::RequestContext;
use crate::errors::{ErrorBuilder, ErrorKind, ErrorManager, GuardError};
use crate::request::{AccessRequest, HeaderRequestIdProvider, RequestIdProvider};
use crate::token::codec::TokenCodec;
use crate::token::verifier::TokenVerifier;
use crate::token::TokenTransform;

/// The compiled guard, shared by all the middlewares of an application.
pub struct RestGuard {
    enabled: bool,
    trust_proxy: bool,
    object_name: String,

    protected_paths: PathMatcher,
    public_paths: PathMatcher,
    detail_path: PathMatcher,

    bypass_rules: BypassRuleSet,
    verifier: TokenVerifier,
    evaluator: PermissionEvaluator,
    errors: ErrorBuilder,
    codec: TokenCodec,

    request_ids: Arc<dyn RequestIdProvider>,
}

pub struct RestGuardBuilder {
    cfg: GuardConfig,
    transform: Option<Arc<dyn TokenTransform>>,
    source: Option<Arc<dyn PermissionSource>>,
    lookup: Option<Arc<dyn GroupPermissionLookup>>,
    request_ids: Option<Arc<dyn RequestIdProvider>>,
}

impl RestGuardBuilder {
    /// Overrides `access_token_transform`.
    pub fn with_transform(mut self, transform: Arc<dyn TokenTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Used when no permission location is configured.
    pub fn with_permission_source(mut self, source: Arc<dyn PermissionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Overrides `authorization.permission_group_lookup`.
    pub fn with_group_lookup(mut self, lookup: Arc<dyn GroupPermissionLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_request_id_provider(mut self, provider: Arc<dyn RequestIdProvider>) -> Self {
        self.request_ids = Some(provider);
        self
    }

    pub fn build(self) -> Result<RestGuard> {
        let cfg = self.cfg;

        let lookup = match self.lookup {
            Some(lookup) => Some(lookup),
            None => match cfg.authorization.permission_group_lookup.as_ref() {
                Some(lookup_cfg) => {
                    let lookup = HandshakeLookup::new(lookup_cfg).context("init handshake lookup")?;
                    info!("Lookup group permissions from '{}'", lookup.endpoint());
                    Some(Arc::new(lookup) as Arc<dyn GroupPermissionLookup>)
                }
                None => None,
            },
        };

        let mut verifier = TokenVerifier::new(&cfg.token);
        if let Some(transform) = self.transform {
            verifier = verifier.with_transform(transform);
        }
        if verifier.secret_keys().is_empty() {
            warn!("No secret key configured, every access-token will be rejected");
        }

        let guarded_paths = cfg.guarded_paths();
        if guarded_paths.is_empty() {
            info!("No protected paths configured, every request requires an access-token");
        }
        let detail_path = match cfg.access_token_detail_path.as_ref() {
            Some(path) => RuleCompiler::compile_path_patterns(std::slice::from_ref(path)),
            None => PathMatcher::default(),
        };

        let bypass_rules = RuleCompiler::compile_bypass_rules(&cfg.bypassing_rules);
        debug!("Bypassing rules: {bypass_rules:?}");

        let guard = RestGuard {
            enabled: cfg.enabled,
            trust_proxy: cfg.trust_proxy,
            object_name: cfg.token.access_token_object_name.clone(),
            protected_paths: RuleCompiler::compile_path_patterns(&guarded_paths),
            public_paths: RuleCompiler::compile_path_patterns(&cfg.public_paths),
            detail_path,
            bypass_rules,
            verifier,
            evaluator: PermissionEvaluator::new(&cfg.authorization, self.source, lookup),
            errors: ErrorManager::new().register(RestGuard::NAMESPACE, &cfg.error_codes),
            codec: TokenCodec::new(cfg.codec.clone()),
            request_ids: self
                .request_ids
                .unwrap_or_else(|| Arc::new(HeaderRequestIdProvider)),
        };
        if !guard.enabled {
            warn!("Access guard is disabled, every request passes through");
        }
        Ok(guard)
    }
}

impl RestGuard {
    pub const NAMESPACE: &'static str = "restguard";

    pub fn builder(cfg: GuardConfig) -> RestGuardBuilder {
        RestGuardBuilder {
            cfg,
            transform: None,
            source: None,
            lookup: None,
            request_ids: None,
        }
    }

    pub fn new(cfg: GuardConfig) -> Result<Self> {
        Self::builder(cfg).build()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.matches(path)
    }

    /// Without protected paths, every path is protected.
    pub fn is_protected_path(&self, path: &str) -> bool {
        self.protected_paths.is_empty() || self.protected_paths.matches(path)
    }

    pub fn is_detail_path(&self, path: &str) -> bool {
        self.detail_path.matches(path)
    }

    pub fn access_request(&self, req: &HttpRequest) -> AccessRequest {
        AccessRequest::from_http(req, self.trust_proxy, self.request_ids.as_ref())
    }

    pub fn is_bypassed(&self, req: &AccessRequest) -> bool {
        let origin = RequestOrigin {
            hostname: req.hostname.as_deref(),
            ip: req.ip.as_deref(),
        };
        is_bypassed(&origin, &self.bypass_rules)
    }

    pub fn new_error(&self, kind: ErrorKind, req: &AccessRequest) -> GuardError {
        self.errors.new_error(kind, req.language.as_deref())
    }

    /// Verifies the access-token of the request unless the guard is disabled,
    /// the resource is public or the caller is bypassed.
    pub fn check_access_token(
        &self,
        req: &AccessRequest,
        ctx: &mut RequestContext,
    ) -> Result<(), GuardError> {
        if !self.enabled || ctx.public_resource {
            return Ok(());
        }
        if self.is_bypassed(req) {
            debug!("Req[{}] - bypassed {:?}/{:?}", req.request_id, req.hostname, req.ip);
            return Ok(());
        }

        match self.verifier.verify_and_attach(req, ctx) {
            Ok(_) => {
                debug!("Req[{}] - {} attached", req.request_id, self.object_name);
                Ok(())
            }
            Err(err) => Err(self.new_error(err.kind(), req)),
        }
    }

    pub async fn check_permissions(
        &self,
        req: &AccessRequest,
        ctx: &RequestContext,
    ) -> Result<PermissionDecision, GuardError> {
        if !self.enabled || ctx.public_resource {
            return Ok(PermissionDecision::Indifferent);
        }
        match self.evaluator.check_permissions(req, ctx).await {
            PermissionDecision::Denied => {
                Err(self.new_error(ErrorKind::InsufficientPermission, req))
            }
            decision => Ok(decision),
        }
    }
}
