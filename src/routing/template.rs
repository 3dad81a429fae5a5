//! URL templates with typed placeholders.
//!
//! # Responsibilities
//! - Parse `/redfish/v1/Systems/{id}`-style templates
//! - Match split request paths and extract typed parameters
//! - Rank templates by specificity for overlap resolution
//!
//! # Design Decisions
//! - Empty segments are ignored, so trailing slashes never matter
//! - A placeholder whose coercion fails is a non-match, not an error
//! - `{name:int}` accepts ASCII digits only (no sign, no whitespace)

use std::collections::BTreeMap;
use std::fmt;

use crate::error::GatewayError;
use crate::routing::RouteError;

/// One template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Str(String),
    Int(String),
}

impl Segment {
    /// Rank used for tie-breaking: literal > int > string.
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 2,
            Segment::Int(_) => 1,
            Segment::Str(_) => 0,
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Str(name) | Segment::Int(name) => Some(name),
        }
    }
}

/// Extracted path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(u64),
}

/// Parameters extracted by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: BTreeMap<String, ParamValue>,
}

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(ParamValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// String parameter the matched template is known to declare.
    pub fn require_str(&self, name: &str) -> Result<&str, GatewayError> {
        self.str(name)
            .ok_or_else(|| GatewayError::InternalError(format!("missing path parameter {}", name)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Split a request path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_non_negative_int(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// A parsed URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("template must start with '/'"));
        }

        let mut segments = Vec::new();
        for part in split_path(raw) {
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(inner) => {
                    let (name, kind) = inner.split_once(':').unwrap_or((inner, "str"));
                    if name.is_empty()
                        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        return Err(invalid("placeholder names must be alphanumeric"));
                    }
                    match kind {
                        "str" => Segment::Str(name.to_string()),
                        "int" => Segment::Int(name.to_string()),
                        _ => return Err(invalid("placeholder type must be 'str' or 'int'")),
                    }
                }
                None if part.contains(['{', '}']) => {
                    return Err(invalid("unbalanced braces in segment"));
                }
                None => Segment::Literal(part.to_string()),
            };
            if let Some(name) = segment.name() {
                if segments.iter().any(|s: &Segment| s.name() == Some(name)) {
                    return Err(invalid("duplicate placeholder name"));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn arity(&self) -> usize {
        self.segments.len()
    }

    /// Per-position rank; compared lexicographically between overlapping
    /// templates, so the longest literal prefix wins.
    pub fn specificity(&self) -> Vec<u8> {
        self.segments.iter().map(Segment::rank).collect()
    }

    /// True when both templates accept exactly the same paths.
    pub fn same_shape(&self, other: &Template) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Str(_), Segment::Str(_)) | (Segment::Int(_), Segment::Int(_)) => true,
                    _ => false,
                })
    }

    /// Match already-split path segments.
    pub fn matches(&self, path: &[&str]) -> Option<PathParams> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = PathParams::default();
        for (segment, part) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Str(name) => {
                    params
                        .values
                        .insert(name.clone(), ParamValue::Str(part.to_string()));
                }
                Segment::Int(name) => {
                    let value = is_non_negative_int(part)?;
                    params.values.insert(name.clone(), ParamValue::Int(value));
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_match() {
        let template = Template::parse("/redfish/v1/Managers/{manager}/EthernetInterfaces/{id}").unwrap();
        assert_eq!(template.arity(), 6);
        let params = template
            .matches(&split_path("/redfish/v1/Managers/bmc/EthernetInterfaces/eth0/"))
            .unwrap();
        assert_eq!(params.str("manager"), Some("bmc"));
        assert_eq!(params.str("id"), Some("eth0"));
        assert!(template
            .matches(&split_path("/redfish/v1/Managers/bmc/EthernetInterfaces"))
            .is_none());
    }

    #[test]
    fn test_int_coercion_failure_is_non_match() {
        let template = Template::parse("/slots/{n:int}").unwrap();
        assert_eq!(template.matches(&["slots", "12"]).unwrap().int("n"), Some(12));
        assert!(template.matches(&["slots", "-1"]).is_none());
        assert!(template.matches(&["slots", "+1"]).is_none());
        assert!(template.matches(&["slots", "abc"]).is_none());
        assert!(template.matches(&["slots", "99999999999999999999999"]).is_none());
    }

    #[test]
    fn test_invalid_templates() {
        assert!(Template::parse("redfish").is_err());
        assert!(Template::parse("/a/{}").is_err());
        assert!(Template::parse("/a/{x:float}").is_err());
        assert!(Template::parse("/a/{x}/{x}").is_err());
        assert!(Template::parse("/a/b{x}").is_err());
    }

    #[test]
    fn test_specificity_orders_literal_int_str() {
        let literal = Template::parse("/a/b").unwrap();
        let int = Template::parse("/a/{n:int}").unwrap();
        let string = Template::parse("/a/{s}").unwrap();
        assert!(literal.specificity() > int.specificity());
        assert!(int.specificity() > string.specificity());
        assert!(string.same_shape(&Template::parse("/a/{other}").unwrap()));
        assert!(!string.same_shape(&int));
    }
}
