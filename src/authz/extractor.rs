use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use crate::context::RequestContext;
use crate::request::AccessRequest;
use crate::utils::json_get_strings;

use super::handshake::GroupPermissionLookup;

/// A user supplied way to find the permissions of the caller.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn extract(&self, req: &AccessRequest, ctx: &RequestContext) -> Vec<String>;
}

/// Adapts a synchronous closure into a [`PermissionSource`].
pub struct FnPermissionSource<F>(pub F);

#[async_trait]
impl<F> PermissionSource for FnPermissionSource<F>
where
    F: Fn(&AccessRequest, &RequestContext) -> Vec<String> + Send + Sync,
{
    async fn extract(&self, req: &AccessRequest, ctx: &RequestContext) -> Vec<String> {
        (self.0)(req, ctx)
    }
}

pub enum PermissionExtractor {
    /// Reads the permissions from the decoded token, plus the ones granted
    /// to its groups when a lookup is available.
    Location {
        paths: Vec<String>,
        group_paths: Vec<String>,
        lookup: Option<Arc<dyn GroupPermissionLookup>>,
    },
    Custom(Arc<dyn PermissionSource>),
    None,
}

impl PermissionExtractor {
    pub async fn extract(&self, req: &AccessRequest, ctx: &RequestContext) -> Vec<String> {
        match self {
            PermissionExtractor::Location {
                paths,
                group_paths,
                lookup,
            } => {
                let identity = ctx.identity.as_ref();
                let mut permissions = json_get_strings(identity, paths);

                let Some(lookup) = lookup.as_ref() else {
                    return permissions;
                };
                if group_paths.is_empty() {
                    return permissions;
                }

                let groups = json_get_strings(identity, group_paths);
                match lookup.get_permission_by_groups(&groups).await {
                    Ok(granted) => {
                        debug!(
                            "Req[{}] - groups {groups:?} grant permissions {granted:?}",
                            req.request_id
                        );
                        permissions.extend(granted);
                    }
                    Err(err) => {
                        warn!(
                            "Req[{}] - lookup permissions of groups {groups:?} failed: {err:#}",
                            req.request_id
                        );
                    }
                }
                permissions
            }
            PermissionExtractor::Custom(source) => source.extract(req, ctx).await,
            PermissionExtractor::None => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use serde_json::json;

    use super::*;

    struct StaticLookup(Option<Vec<String>>);

    #[async_trait]
    impl GroupPermissionLookup for StaticLookup {
        async fn get_permission_by_groups(&self, groups: &[String]) -> Result<Vec<String>> {
            assert_eq!(groups, ["editors"]);
            match self.0.as_ref() {
                Some(permissions) => Ok(permissions.clone()),
                None => bail!("handshake unavailable"),
            }
        }
    }

    fn context() -> RequestContext {
        RequestContext {
            identity: Some(json!({
                "permissions": ["VIEW_APPLICATION"],
                "groups": ["editors"],
            })),
            public_resource: false,
        }
    }

    fn location(lookup: Option<Arc<dyn GroupPermissionLookup>>) -> PermissionExtractor {
        PermissionExtractor::Location {
            paths: vec![String::from("permissions")],
            group_paths: vec![String::from("groups")],
            lookup,
        }
    }

    #[tokio::test]
    async fn test_location() {
        let req = AccessRequest::new("GET", "/jwt/authorized");

        let extractor = location(None);
        assert_eq!(extractor.extract(&req, &context()).await, vec!["VIEW_APPLICATION"]);

        let lookup: Arc<dyn GroupPermissionLookup> =
            Arc::new(StaticLookup(Some(vec![String::from("EDIT_APPLICATION")])));
        let extractor = location(Some(lookup));
        assert_eq!(
            extractor.extract(&req, &context()).await,
            vec!["VIEW_APPLICATION", "EDIT_APPLICATION"]
        );

        let failing: Arc<dyn GroupPermissionLookup> = Arc::new(StaticLookup(None));
        let extractor = location(Some(failing));
        assert_eq!(extractor.extract(&req, &context()).await, vec!["VIEW_APPLICATION"]);

        assert!(location(None)
            .extract(&req, &RequestContext::default())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_custom_and_none() {
        let req = AccessRequest::new("GET", "/jwt/authorized");
        let source = FnPermissionSource(|_: &AccessRequest, ctx: &RequestContext| {
            json_get_strings(ctx.identity.as_ref(), &["permissions"])
        });
        let extractor = PermissionExtractor::Custom(Arc::new(source));
        assert_eq!(extractor.extract(&req, &context()).await, vec!["VIEW_APPLICATION"]);

        assert!(PermissionExtractor::None
            .extract(&req, &context())
            .await
            .is_empty());
    }
}
