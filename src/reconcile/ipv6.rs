//! IPv6 static address entries.

use serde_json::Value;
use std::net::Ipv6Addr;

use crate::body::{first, ObjectReader};
use crate::error::GatewayError;
use crate::reconcile::EntrySchema;

pub const MAX_PREFIX_LENGTH: u8 = 128;

/// Validated client item for `IPv6StaticAddresses`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipv6Patch {
    pub address: Option<String>,
    pub prefix_length: Option<u8>,
}

/// Schema of `IPv6StaticAddresses`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ipv6Static;

impl EntrySchema for Ipv6Static {
    type Patch = Ipv6Patch;

    fn property(&self) -> &'static str {
        "IPv6StaticAddresses"
    }

    fn parse(&self, item: &Value, path: &str) -> Result<Ipv6Patch, GatewayError> {
        let mut reader = ObjectReader::nested(item, path)?;
        let address = reader.string("Address");
        let prefix_length = reader.u64("PrefixLength");
        if let Err(errors) = reader.finish() {
            return Err(first(errors));
        }

        if let Some(address) = &address {
            if address.parse::<Ipv6Addr>().is_err() {
                return Err(GatewayError::PropertyValueFormatError {
                    value: address.clone(),
                    path: format!("{}/Address", path),
                });
            }
        }
        let prefix_length = match prefix_length {
            Some(prefix) => match u8::try_from(prefix) {
                Ok(prefix) if prefix <= MAX_PREFIX_LENGTH => Some(prefix),
                _ => {
                    return Err(GatewayError::PropertyValueFormatError {
                        value: prefix.to_string(),
                        path: format!("{}/PrefixLength", path),
                    })
                }
            },
            None => None,
        };

        Ok(Ipv6Patch {
            address,
            prefix_length,
        })
    }

    fn complete(&self, patch: &Ipv6Patch, path: &str) -> Result<(), GatewayError> {
        if patch.address.is_none() {
            return Err(GatewayError::PropertyMissing(format!("{}/Address", path)));
        }
        if patch.prefix_length.is_none() {
            return Err(GatewayError::PropertyMissing(format!("{}/PrefixLength", path)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{reconcile, Action};
    use serde_json::json;

    #[test]
    fn test_create_update_and_keep() {
        let client = json!([{}, {"PrefixLength": 48}, {"Address": "2001:db8::10", "PrefixLength": 64}]);
        let backend = vec!["a1".to_string(), "a2".to_string()];
        let plan = reconcile(&Ipv6Static, &client, &backend);
        assert!(plan.error.is_none());
        assert_eq!(
            plan.actions,
            vec![
                Action::Update {
                    index: 1,
                    id: "a2".into(),
                    patch: Ipv6Patch {
                        address: None,
                        prefix_length: Some(48)
                    },
                },
                Action::Create {
                    index: 2,
                    patch: Ipv6Patch {
                        address: Some("2001:db8::10".into()),
                        prefix_length: Some(64)
                    },
                },
            ]
        );
    }

    #[test]
    fn test_invalid_address_and_prefix() {
        let plan = reconcile(&Ipv6Static, &json!([{"Address": "2001:db8::zz"}]), &["a1"]);
        assert_eq!(
            plan.error,
            Some(GatewayError::PropertyValueFormatError {
                value: "2001:db8::zz".into(),
                path: "IPv6StaticAddresses/0/Address".into()
            })
        );

        let plan = reconcile(&Ipv6Static, &json!([{"PrefixLength": 129}]), &["a1"]);
        assert_eq!(
            plan.error,
            Some(GatewayError::PropertyValueFormatError {
                value: "129".into(),
                path: "IPv6StaticAddresses/0/PrefixLength".into()
            })
        );

        let plan = reconcile(&Ipv6Static, &json!([{"PrefixLength": "64"}]), &["a1"]);
        assert!(matches!(plan.error, Some(GatewayError::PropertyValueTypeError { .. })));
    }

    #[test]
    fn test_every_out_of_range_prefix_is_format_error() {
        for prefix in [129u64, 200, 255, 256, 300, u64::from(u32::MAX) + 1] {
            let plan = reconcile(&Ipv6Static, &json!([{"PrefixLength": prefix}]), &["a1"]);
            assert_eq!(
                plan.error,
                Some(GatewayError::PropertyValueFormatError {
                    value: prefix.to_string(),
                    path: "IPv6StaticAddresses/0/PrefixLength".into()
                }),
                "prefix {}",
                prefix
            );
        }
    }

    #[test]
    fn test_create_needs_prefix_length() {
        let empty: [&str; 0] = [];
        let plan = reconcile(&Ipv6Static, &json!([{"Address": "fd00::1"}]), &empty);
        assert!(plan.actions.is_empty());
        assert_eq!(
            plan.error,
            Some(GatewayError::PropertyMissing("IPv6StaticAddresses/0/PrefixLength".into()))
        );
    }
}
