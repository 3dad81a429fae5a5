//! IPv4 static address entries.

use serde_json::Value;

use crate::body::{first, ObjectReader};
use crate::error::GatewayError;
use crate::reconcile::EntrySchema;

/// Validated client item for `IPv4StaticAddresses`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv4Patch {
    pub address: Option<String>,
    pub subnet_mask: Option<String>,
    /// Prefix length derived from `subnet_mask`.
    pub prefix_length: Option<u8>,
    pub gateway: Option<String>,
}

/// Schema of `IPv4StaticAddresses`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ipv4Static;

impl EntrySchema for Ipv4Static {
    type Patch = Ipv4Patch;

    fn property(&self) -> &'static str {
        "IPv4StaticAddresses"
    }

    fn parse(&self, item: &Value, path: &str) -> Result<Ipv4Patch, GatewayError> {
        let mut reader = ObjectReader::nested(item, path)?;
        let address = reader.string("Address");
        let subnet_mask = reader.string("SubnetMask");
        let gateway = reader.string("Gateway");
        if let Err(errors) = reader.finish() {
            return Err(first(errors));
        }

        let format_error = |value: &str, field: &str| GatewayError::PropertyValueFormatError {
            value: value.to_string(),
            path: format!("{}/{}", path, field),
        };

        if let Some(address) = &address {
            if parse_dotted_quad(address).is_none() {
                return Err(format_error(address, "Address"));
            }
        }
        let prefix_length = match &subnet_mask {
            Some(mask) => Some(mask_prefix_length(mask).ok_or_else(|| format_error(mask, "SubnetMask"))?),
            None => None,
        };
        if let Some(gateway) = &gateway {
            if parse_dotted_quad(gateway).is_none() {
                return Err(format_error(gateway, "Gateway"));
            }
        }

        Ok(Ipv4Patch {
            address,
            subnet_mask,
            prefix_length,
            gateway,
        })
    }

    fn complete(&self, patch: &Ipv4Patch, path: &str) -> Result<(), GatewayError> {
        let missing = |field: &str| GatewayError::PropertyMissing(format!("{}/{}", path, field));
        if patch.address.is_none() {
            return Err(missing("Address"));
        }
        if patch.subnet_mask.is_none() {
            return Err(missing("SubnetMask"));
        }
        if patch.gateway.is_none() {
            return Err(missing("Gateway"));
        }
        Ok(())
    }
}

/// Strict dotted-quad: four decimal octets, no signs, no blanks.
pub fn parse_dotted_quad(text: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = text.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

/// Prefix length of a contiguous netmask, `None` for anything else.
pub fn mask_prefix_length(mask: &str) -> Option<u8> {
    let bits = u32::from_be_bytes(parse_dotted_quad(mask)?);
    let ones = bits.leading_ones();
    if ones + bits.trailing_zeros() == 32 {
        u8::try_from(ones).ok()
    } else {
        None
    }
}

/// Dotted netmask for a prefix length, clamped to 32.
pub fn prefix_to_mask(prefix: u8) -> String {
    let prefix = u32::from(prefix.min(32));
    let bits = match prefix {
        0 => 0,
        n => u32::MAX << (32 - n),
    };
    let [a, b, c, d] = bits.to_be_bytes();
    format!("{}.{}.{}.{}", a, b, c, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{reconcile, Action};
    use serde_json::json;

    fn backend(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn full(address: &str) -> Ipv4Patch {
        Ipv4Patch {
            address: Some(address.into()),
            subnet_mask: Some("255.255.255.0".into()),
            prefix_length: Some(24),
            gateway: Some("10.0.0.1".into()),
        }
    }

    #[test]
    fn test_create_into_empty_backend() {
        let client = json!([{"Address": "10.0.0.5", "Gateway": "10.0.0.1", "SubnetMask": "255.255.255.0"}]);
        let plan = reconcile(&Ipv4Static, &client, &backend(&[]));
        assert_eq!(plan.actions, vec![Action::Create { index: 0, patch: full("10.0.0.5") }]);
        assert!(plan.error.is_none());
    }

    #[test]
    fn test_null_deletes_existing_entry() {
        let plan = reconcile(&Ipv4Static, &json!([null]), &backend(&["E0"]));
        assert_eq!(plan.actions, vec![Action::Delete { index: 0, id: "E0".into() }]);
        assert!(plan.error.is_none());
    }

    #[test]
    fn test_empty_object_keeps_entry() {
        let plan = reconcile(&Ipv4Static, &json!([{}]), &backend(&["E0"]));
        assert!(plan.actions.is_empty());
        assert!(plan.error.is_none());
    }

    #[test]
    fn test_partial_patch_updates_entry() {
        let plan = reconcile(&Ipv4Static, &json!([{"Address": "10.0.0.9"}]), &backend(&["E0"]));
        assert_eq!(
            plan.actions,
            vec![Action::Update {
                index: 0,
                id: "E0".into(),
                patch: Ipv4Patch {
                    address: Some("10.0.0.9".into()),
                    ..Default::default()
                },
            }]
        );
    }

    #[test]
    fn test_delete_then_create_past_backend_end() {
        let client = json!([null, {"Address": "10.0.0.2", "Gateway": "10.0.0.1", "SubnetMask": "255.255.255.0"}]);
        let plan = reconcile(&Ipv4Static, &client, &backend(&["E0"]));
        assert_eq!(
            plan.actions,
            vec![
                Action::Delete { index: 0, id: "E0".into() },
                Action::Create { index: 1, patch: full("10.0.0.2") },
            ]
        );
    }

    #[test]
    fn test_non_contiguous_mask_rejected() {
        let client = json!([{"Address": "10.0.0.5", "Gateway": "10.0.0.1", "SubnetMask": "255.255.0.255"}]);
        let plan = reconcile(&Ipv4Static, &client, &backend(&["E0"]));
        assert!(plan.actions.is_empty());
        assert_eq!(
            plan.error,
            Some(GatewayError::PropertyValueFormatError {
                value: "255.255.0.255".into(),
                path: "IPv4StaticAddresses/0/SubnetMask".into()
            })
        );
    }

    #[test]
    fn test_unknown_field_and_bad_address() {
        let plan = reconcile(&Ipv4Static, &json!([{"Adress": "10.0.0.5"}]), &backend(&["E0"]));
        assert_eq!(
            plan.error,
            Some(GatewayError::PropertyUnknown("IPv4StaticAddresses/0/Adress".into()))
        );

        let plan = reconcile(&Ipv4Static, &json!([{"Address": "10.0.0.256"}]), &backend(&["E0"]));
        assert_eq!(
            plan.error,
            Some(GatewayError::PropertyValueFormatError {
                value: "10.0.0.256".into(),
                path: "IPv4StaticAddresses/0/Address".into()
            })
        );
    }

    #[test]
    fn test_create_requires_every_field() {
        let plan = reconcile(&Ipv4Static, &json!([{"Address": "10.0.0.5", "SubnetMask": "255.0.0.0"}]), &backend(&[]));
        assert!(plan.actions.is_empty());
        assert_eq!(
            plan.error,
            Some(GatewayError::PropertyMissing("IPv4StaticAddresses/0/Gateway".into()))
        );
    }

    #[test]
    fn test_dotted_quad_parsing() {
        assert_eq!(parse_dotted_quad("192.168.1.10"), Some([192, 168, 1, 10]));
        assert_eq!(parse_dotted_quad("1.2.3"), None);
        assert_eq!(parse_dotted_quad("1.2.3.4.5"), None);
        assert_eq!(parse_dotted_quad("1..3.4"), None);
        assert_eq!(parse_dotted_quad("+1.2.3.4"), None);
        assert_eq!(parse_dotted_quad("1.2.3.0400"), None);
    }

    #[test]
    fn test_mask_conversions() {
        assert_eq!(mask_prefix_length("255.255.255.0"), Some(24));
        assert_eq!(mask_prefix_length("255.255.255.255"), Some(32));
        assert_eq!(mask_prefix_length("0.0.0.0"), Some(0));
        assert_eq!(mask_prefix_length("255.0.255.0"), None);
        assert_eq!(prefix_to_mask(24), "255.255.255.0");
        assert_eq!(prefix_to_mask(0), "0.0.0.0");
        assert_eq!(prefix_to_mask(32), "255.255.255.255");
        assert_eq!(prefix_to_mask(20), "255.255.240.0");
    }
}
