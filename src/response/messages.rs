//! Message registry entries written into response documents.
//!
//! # Responsibilities
//! - Record errors as `error.@Message.ExtendedInfo` entries
//! - Keep the HTTP status consistent with the first error class
//! - Success helpers (200, 201 with Location, 204)

use axum::http::{header, HeaderValue, StatusCode};
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::response::Response;

pub const REGISTRY_PREFIX: &str = "Base.1.4.0";

const GENERAL_ERROR_MESSAGE: &str =
    "A general error has occurred. See ExtendedInfo for more information.";

fn message_id(id: &str) -> String {
    format!("{}.{}", REGISTRY_PREFIX, id)
}

fn entry(err: &GatewayError) -> Value {
    let related: Vec<String> = err.related_property().into_iter().collect();
    json!({
        "@odata.type": "#Message.v1_0_0.Message",
        "MessageId": message_id(err.message_id()),
        "Message": err.to_string(),
        "RelatedProperties": related,
        "Severity": err.severity(),
        "Resolution": err.resolution(),
    })
}

/// Record `err` into the document.
///
/// The first error sets `error.code` and `error.message`; any later one
/// switches the summary to `GeneralError`. The status only changes while
/// the document still carries a success status.
pub fn record(res: &mut Response, err: &GatewayError) {
    if res.status.is_success() {
        res.status = err.status();
    }

    let error = &mut res.json["error"];
    if error.is_object() {
        error["code"] = Value::String(message_id("GeneralError"));
        error["message"] = Value::String(GENERAL_ERROR_MESSAGE.to_string());
    } else {
        *error = json!({
            "code": message_id(err.message_id()),
            "message": err.to_string(),
            "@Message.ExtendedInfo": [],
        });
    }
    if let Value::Array(infos) = &mut error["@Message.ExtendedInfo"] {
        infos.push(entry(err));
    }
}

/// 200 with a `Success` message.
pub fn success(res: &mut Response) {
    set_success_status(res, StatusCode::OK);
    res.push(
        "@Message.ExtendedInfo",
        json!({
            "@odata.type": "#Message.v1_0_0.Message",
            "MessageId": message_id("Success"),
            "Message": "Successfully Completed Request",
            "RelatedProperties": [],
            "Severity": "OK",
            "Resolution": "None",
        }),
    );
}

/// 201 pointing at the new resource.
pub fn created(res: &mut Response, location: &str) {
    set_success_status(res, StatusCode::CREATED);
    match HeaderValue::from_str(location) {
        Ok(value) => {
            res.headers.insert(header::LOCATION, value);
        }
        Err(e) => tracing::warn!(location = %location, error = %e, "Invalid Location header"),
    }
    res.push(
        "@Message.ExtendedInfo",
        json!({
            "@odata.type": "#Message.v1_0_0.Message",
            "MessageId": message_id("Created"),
            "Message": "The resource has been created successfully",
            "RelatedProperties": [],
            "Severity": "OK",
            "Resolution": "None",
        }),
    );
}

pub fn no_content(res: &mut Response) {
    set_success_status(res, StatusCode::NO_CONTENT);
}

/// An error status, once recorded, is never downgraded to a success.
fn set_success_status(res: &mut Response, status: StatusCode) {
    if res.status.is_success() {
        res.status = status;
    }
}
