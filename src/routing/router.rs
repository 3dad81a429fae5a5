//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store registered resource templates
//! - Resolve (verb, path, privileges) to a resource and its parameters
//! - Distinguish not found, method not allowed and forbidden
//!
//! # Design Decisions
//! - Immutable after startup (shared behind `Arc` without locks)
//! - Templates bucketed by arity; O(n) scan within a bucket
//! - Among matches the greatest specificity wins, so the outcome never
//!   depends on registration order
//! - Templates with identical shapes are rejected at registration

use axum::http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::routing::privilege::Authorization;
use crate::routing::template::split_path;
use crate::routing::{EntityPrivileges, PathParams, PrivilegeSet, Resource, RouteError, Template};

struct Route {
    template: Template,
    specificity: Vec<u8>,
    privileges: EntityPrivileges,
    resource: Arc<dyn Resource>,
}

/// Outcome of [`Router::resolve`].
pub enum Resolution {
    Resolved {
        resource: Arc<dyn Resource>,
        params: PathParams,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
    Forbidden,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Resolved { resource, params } => f
                .debug_struct("Resolved")
                .field("template", &resource.template())
                .field("params", params)
                .finish(),
            Resolution::NotFound => f.write_str("NotFound"),
            Resolution::MethodNotAllowed { allowed } => f
                .debug_struct("MethodNotAllowed")
                .field("allowed", allowed)
                .finish(),
            Resolution::Forbidden => f.write_str("Forbidden"),
        }
    }
}

/// Resource table.
#[derive(Default)]
pub struct Router {
    by_arity: HashMap<usize, Vec<Route>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("templates", &self.templates())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under its template.
    pub fn register(&mut self, resource: Arc<dyn Resource>) -> Result<(), RouteError> {
        let template = Template::parse(resource.template())?;
        let bucket = self.by_arity.entry(template.arity()).or_default();
        if let Some(existing) = bucket.iter().find(|r| r.template.same_shape(&template)) {
            return Err(RouteError::Ambiguous {
                template: template.to_string(),
                existing: existing.template.to_string(),
            });
        }

        tracing::debug!(template = %template, "Registered resource");
        bucket.push(Route {
            specificity: template.specificity(),
            privileges: resource.privileges(),
            template,
            resource,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_arity.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn templates(&self) -> Vec<&str> {
        let mut templates: Vec<&str> = self
            .by_arity
            .values()
            .flatten()
            .map(|r| r.template.as_str())
            .collect();
        templates.sort_unstable();
        templates
    }

    pub fn resolve(&self, method: &Method, path: &str, held: &PrivilegeSet) -> Resolution {
        let segments = split_path(path);
        let Some(bucket) = self.by_arity.get(&segments.len()) else {
            return Resolution::NotFound;
        };

        let best = bucket
            .iter()
            .filter_map(|route| route.template.matches(&segments).map(|params| (route, params)))
            .max_by(|(a, _), (b, _)| a.specificity.cmp(&b.specificity));
        let Some((route, params)) = best else {
            return Resolution::NotFound;
        };

        match route.privileges.authorize(method, held) {
            Authorization::Granted => Resolution::Resolved {
                resource: Arc::clone(&route.resource),
                params,
            },
            Authorization::Denied => {
                tracing::debug!(template = %route.template, method = %method, "Insufficient privileges");
                Resolution::Forbidden
            }
            Authorization::VerbNotAllowed => Resolution::MethodNotAllowed {
                allowed: route.privileges.methods().cloned().collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::privilege::{CONFIGURE_COMPONENTS, LOGIN};

    struct Stub(&'static str, EntityPrivileges);

    impl Resource for Stub {
        fn template(&self) -> &'static str {
            self.0
        }

        fn privileges(&self) -> EntityPrivileges {
            self.1.clone()
        }
    }

    fn stub(template: &'static str) -> Arc<dyn Resource> {
        Arc::new(Stub(template, EntityPrivileges::standard()))
    }

    fn login() -> PrivilegeSet {
        [LOGIN].into_iter().collect()
    }

    fn resolved_template(resolution: Resolution) -> &'static str {
        match resolution {
            Resolution::Resolved { resource, .. } => resource.template(),
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_longest_literal_prefix_independent_of_order() {
        let templates = ["/r/v1/Systems/{id}", "/r/v1/Systems/system", "/r/v1/{col}/{id}"];
        let orders = [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]];
        for order in orders {
            let mut router = Router::new();
            for i in order {
                router.register(stub(templates[i])).unwrap();
            }
            assert_eq!(
                resolved_template(router.resolve(&Method::GET, "/r/v1/Systems/system", &login())),
                "/r/v1/Systems/system"
            );
            assert_eq!(
                resolved_template(router.resolve(&Method::GET, "/r/v1/Systems/other", &login())),
                "/r/v1/Systems/{id}"
            );
            assert_eq!(
                resolved_template(router.resolve(&Method::GET, "/r/v1/Chassis/x", &login())),
                "/r/v1/{col}/{id}"
            );
        }
    }

    #[test]
    fn test_int_placeholder_beats_string() {
        let mut router = Router::new();
        router.register(stub("/slots/{name}")).unwrap();
        router.register(stub("/slots/{n:int}")).unwrap();
        assert_eq!(resolved_template(router.resolve(&Method::GET, "/slots/3", &login())), "/slots/{n:int}");
        assert_eq!(resolved_template(router.resolve(&Method::GET, "/slots/x3", &login())), "/slots/{name}");
    }

    #[test]
    fn test_duplicate_shape_rejected() {
        let mut router = Router::new();
        router.register(stub("/a/{x}")).unwrap();
        let err = router.register(stub("/a/{y}")).unwrap_err();
        assert!(matches!(err, RouteError::Ambiguous { .. }));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_not_found_method_not_allowed_forbidden() {
        let mut router = Router::new();
        router
            .register(Arc::new(Stub(
                "/a",
                EntityPrivileges::standard().only(&[Method::GET, Method::HEAD]),
            )))
            .unwrap();

        assert!(matches!(router.resolve(&Method::GET, "/b", &login()), Resolution::NotFound));
        assert!(matches!(router.resolve(&Method::GET, "/a/b", &login()), Resolution::NotFound));
        match router.resolve(&Method::PATCH, "/a", &login()) {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::HEAD]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            router.resolve(&Method::GET, "/a", &PrivilegeSet::new()),
            Resolution::Forbidden
        ));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut router = Router::new();
        router.register(stub("/a/{id}")).unwrap();
        let held: PrivilegeSet = [CONFIGURE_COMPONENTS].into_iter().collect();
        for _ in 0..3 {
            assert!(matches!(router.resolve(&Method::PATCH, "/a/1", &held), Resolution::Resolved { .. }));
            assert!(matches!(router.resolve(&Method::GET, "/a/1", &held), Resolution::Forbidden));
        }
    }
}
