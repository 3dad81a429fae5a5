//! Privilege sets and per-verb requirements.
//!
//! # Design Decisions
//! - A verb carries a list of alternative sets: the caller needs every
//!   privilege of at least one alternative
//! - An empty alternative admits anyone, including anonymous callers
//! - A verb with no entry is not allowed at all (405, not 403)

use axum::http::Method;
use std::collections::BTreeSet;

pub const LOGIN: &str = "Login";
pub const CONFIGURE_MANAGER: &str = "ConfigureManager";
pub const CONFIGURE_USERS: &str = "ConfigureUsers";
pub const CONFIGURE_SELF: &str = "ConfigureSelf";
pub const CONFIGURE_COMPONENTS: &str = "ConfigureComponents";

/// Unordered set of privilege names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PrivilegeSet(BTreeSet<String>);

impl PrivilegeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, privilege: &str) -> bool {
        self.0.contains(privilege)
    }

    pub fn is_superset(&self, other: &PrivilegeSet) -> bool {
        self.0.is_superset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for PrivilegeSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl FromIterator<String> for PrivilegeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of checking one verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Denied,
    VerbNotAllowed,
}

/// Verb → acceptable alternative privilege sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityPrivileges {
    entries: Vec<(Method, Vec<PrivilegeSet>)>,
}

impl EntityPrivileges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `method` for callers holding all of any one alternative.
    pub fn allow(mut self, method: Method, alternatives: &[&[&str]]) -> Self {
        let sets = alternatives
            .iter()
            .map(|alternative| alternative.iter().copied().collect())
            .collect();
        self.entries.retain(|(m, _)| *m != method);
        self.entries.push((method, sets));
        self
    }

    /// Drop every verb not in `methods`.
    pub fn only(mut self, methods: &[Method]) -> Self {
        self.entries.retain(|(m, _)| methods.contains(m));
        self
    }

    /// Reads need `Login`, writes need `ConfigureComponents`.
    pub fn standard() -> Self {
        Self::with_writes(CONFIGURE_COMPONENTS)
    }

    /// Reads are open to anyone; nothing is writable.
    pub fn anonymous_read() -> Self {
        Self::new()
            .allow(Method::GET, &[&[]])
            .allow(Method::HEAD, &[&[]])
    }

    /// Reads need `Login`, writes need `ConfigureManager`.
    pub fn manager() -> Self {
        Self::with_writes(CONFIGURE_MANAGER)
    }

    fn with_writes(privilege: &str) -> Self {
        Self::new()
            .allow(Method::GET, &[&[LOGIN]])
            .allow(Method::HEAD, &[&[LOGIN]])
            .allow(Method::PATCH, &[&[privilege]])
            .allow(Method::PUT, &[&[privilege]])
            .allow(Method::DELETE, &[&[privilege]])
            .allow(Method::POST, &[&[privilege]])
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.entries.iter().map(|(m, _)| m)
    }

    pub fn authorize(&self, method: &Method, held: &PrivilegeSet) -> Authorization {
        match self.entries.iter().find(|(m, _)| m == method) {
            None => Authorization::VerbNotAllowed,
            Some((_, alternatives)) => {
                if alternatives.iter().any(|required| held.is_superset(required)) {
                    Authorization::Granted
                } else {
                    Authorization::Denied
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(privileges: &[&str]) -> PrivilegeSet {
        privileges.iter().copied().collect()
    }

    #[test]
    fn test_or_across_and_within() {
        let privileges = EntityPrivileges::new().allow(
            Method::PATCH,
            &[&[CONFIGURE_MANAGER], &[CONFIGURE_COMPONENTS, CONFIGURE_SELF]],
        );
        assert_eq!(
            privileges.authorize(&Method::PATCH, &held(&[CONFIGURE_MANAGER])),
            Authorization::Granted
        );
        assert_eq!(
            privileges.authorize(&Method::PATCH, &held(&[CONFIGURE_COMPONENTS])),
            Authorization::Denied
        );
        assert_eq!(
            privileges.authorize(&Method::PATCH, &held(&[CONFIGURE_SELF, CONFIGURE_COMPONENTS])),
            Authorization::Granted
        );
        assert_eq!(
            privileges.authorize(&Method::GET, &held(&[CONFIGURE_MANAGER])),
            Authorization::VerbNotAllowed
        );
    }

    #[test]
    fn test_anonymous_read_admits_empty_set() {
        let privileges = EntityPrivileges::anonymous_read();
        assert_eq!(
            privileges.authorize(&Method::GET, &PrivilegeSet::new()),
            Authorization::Granted
        );
        assert_eq!(
            privileges.authorize(&Method::PATCH, &held(&[CONFIGURE_MANAGER])),
            Authorization::VerbNotAllowed
        );
    }

    #[test]
    fn test_only_restricts_verbs() {
        let privileges = EntityPrivileges::standard().only(&[Method::GET, Method::HEAD]);
        assert_eq!(privileges.methods().count(), 2);
        assert_eq!(
            privileges.authorize(&Method::DELETE, &held(&[CONFIGURE_COMPONENTS])),
            Authorization::VerbNotAllowed
        );
    }
}
