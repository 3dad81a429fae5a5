//! HTTP Basic authentication against the account table.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::GatewayError;
use crate::security::{AccountStore, Caller};

/// Username and password from an `Authorization: Basic` header.
///
/// `Ok(None)` when no header was sent; any other scheme or a malformed
/// value is `Unauthorized`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, GatewayError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| GatewayError::Unauthorized)?;
    let (scheme, encoded) = value.split_once(' ').ok_or(GatewayError::Unauthorized)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(GatewayError::Unauthorized);
    }
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| GatewayError::Unauthorized)?;
    let decoded = String::from_utf8(decoded).map_err(|_| GatewayError::Unauthorized)?;
    let (username, password) = decoded.split_once(':').ok_or(GatewayError::Unauthorized)?;
    Ok(Some((username.to_string(), password.to_string())))
}

/// Resolve the caller. No credentials is an anonymous caller.
pub fn authenticate(store: &AccountStore, headers: &HeaderMap) -> Result<Option<Caller>, GatewayError> {
    let Some((username, password)) = basic_credentials(headers)? else {
        return Ok(None);
    };
    match store.authenticate(&username, &password) {
        Some(caller) => Ok(Some(caller)),
        None => {
            tracing::warn!(user = %username, "Authentication failed");
            Err(GatewayError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountConfig;
    use crate::security::Role;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn basic(user: &str, password: &str) -> HeaderMap {
        headers(&format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password))))
    }

    fn store() -> AccountStore {
        AccountStore::from_config(&[AccountConfig {
            username: "root".into(),
            password: "pa:ss".into(),
            role: Role::Operator,
        }])
    }

    #[test]
    fn test_password_may_contain_colon() {
        assert_eq!(
            basic_credentials(&basic("root", "pa:ss")),
            Ok(Some(("root".to_string(), "pa:ss".to_string())))
        );
    }

    #[test]
    fn test_no_header_is_anonymous() {
        assert_eq!(authenticate(&store(), &HeaderMap::new()), Ok(None));
    }

    #[test]
    fn test_rejections() {
        let store = store();
        assert_eq!(authenticate(&store, &basic("root", "nope")), Err(GatewayError::Unauthorized));
        assert_eq!(authenticate(&store, &headers("Bearer token")), Err(GatewayError::Unauthorized));
        assert_eq!(authenticate(&store, &headers("Basic !!!")), Err(GatewayError::Unauthorized));
        let caller = authenticate(&store, &basic("root", "pa:ss")).unwrap().unwrap();
        assert_eq!(caller.role, Role::Operator);
    }
}
