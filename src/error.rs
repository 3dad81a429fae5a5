//! Error taxonomy shared by the router, the handlers and the transport.

use axum::http::StatusCode;
use thiserror::Error;

use crate::bus::BusError;

/// Every failure a client can observe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The resource at {0} was not found")]
    PathNotFound(String),

    #[error("The HTTP method is not allowed for this resource")]
    VerbNotAllowed,

    #[error("There are insufficient privileges for the account or credentials associated with the current session to perform the requested operation")]
    PrivilegeDenied,

    #[error("While attempting to establish a connection to the resource, the authentication method was rejected")]
    Unauthorized,

    #[error("The request body submitted was malformed JSON and could not be parsed: {0}")]
    MalformedBody(String),

    #[error("The value {value} for the property {path} is of a different format than the property can accept")]
    PropertyValueFormatError { value: String, path: String },

    #[error("The value {value} for the property {path} is of a different type than the property can accept")]
    PropertyValueTypeError { value: String, path: String },

    #[error("The value {value} for the property {path} is not in the list of acceptable values")]
    PropertyValueNotInList { value: String, path: String },

    #[error("The property {0} is a required property and must be included in the request")]
    PropertyMissing(String),

    #[error("The property {0} is a read only property and cannot be assigned a value")]
    PropertyNotWritable(String),

    #[error("The property {0} is not in the list of valid properties for the resource")]
    PropertyUnknown(String),

    #[error("The action {action} was submitted with the invalid parameter {parameter}")]
    ActionParameterUnknown { action: String, parameter: String },

    #[error("The parameter {parameter} for the action {action} is not supported on the target resource")]
    ActionParameterNotSupported { action: String, parameter: String },

    #[error("The requested resource of type {kind} named {id} was not found")]
    ResourceNotFound { kind: String, id: String },

    #[error("A backend call failed: {0}")]
    BackendCallFailed(#[from] BusError),

    #[error("The request failed due to an internal service error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::PathNotFound(_) | GatewayError::ResourceNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::VerbNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::PrivilegeDenied => StatusCode::FORBIDDEN,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::MalformedBody(_)
            | GatewayError::PropertyValueFormatError { .. }
            | GatewayError::PropertyValueTypeError { .. }
            | GatewayError::PropertyValueNotInList { .. }
            | GatewayError::PropertyMissing(_)
            | GatewayError::PropertyNotWritable(_)
            | GatewayError::PropertyUnknown(_)
            | GatewayError::ActionParameterUnknown { .. }
            | GatewayError::ActionParameterNotSupported { .. } => StatusCode::BAD_REQUEST,
            GatewayError::BackendCallFailed(_) | GatewayError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Registry message id, without the registry prefix.
    pub fn message_id(&self) -> &'static str {
        match self {
            GatewayError::PathNotFound(_) => "ResourceMissingAtURI",
            GatewayError::VerbNotAllowed => "OperationNotAllowed",
            GatewayError::PrivilegeDenied => "InsufficientPrivilege",
            GatewayError::Unauthorized => "ResourceAtUriUnauthorized",
            GatewayError::MalformedBody(_) => "MalformedJSON",
            GatewayError::PropertyValueFormatError { .. } => "PropertyValueFormatError",
            GatewayError::PropertyValueTypeError { .. } => "PropertyValueTypeError",
            GatewayError::PropertyValueNotInList { .. } => "PropertyValueNotInList",
            GatewayError::PropertyMissing(_) => "PropertyMissing",
            GatewayError::PropertyNotWritable(_) => "PropertyNotWritable",
            GatewayError::PropertyUnknown(_) => "PropertyUnknown",
            GatewayError::ActionParameterUnknown { .. } => "ActionParameterUnknown",
            GatewayError::ActionParameterNotSupported { .. } => "ActionParameterNotSupported",
            GatewayError::ResourceNotFound { .. } => "ResourceNotFound",
            GatewayError::BackendCallFailed(_) | GatewayError::InternalError(_) => "InternalError",
        }
    }

    /// JSON pointer of the offending property, when there is one.
    pub fn related_property(&self) -> Option<String> {
        match self {
            GatewayError::PropertyValueFormatError { path, .. }
            | GatewayError::PropertyValueTypeError { path, .. }
            | GatewayError::PropertyValueNotInList { path, .. } => Some(format!("#/{}", path)),
            GatewayError::PropertyMissing(path)
            | GatewayError::PropertyNotWritable(path)
            | GatewayError::PropertyUnknown(path) => Some(format!("#/{}", path)),
            GatewayError::ActionParameterUnknown { parameter, .. }
            | GatewayError::ActionParameterNotSupported { parameter, .. } => {
                Some(format!("#/{}", parameter))
            }
            _ => None,
        }
    }

    pub fn resolution(&self) -> &'static str {
        match self {
            GatewayError::PathNotFound(_) => "Place a valid resource at the URI or correct the URI and resubmit the request.",
            GatewayError::VerbNotAllowed => "None.",
            GatewayError::PrivilegeDenied => "Either abandon the operation or change the associated access rights and resubmit the request if the operation failed.",
            GatewayError::Unauthorized => "Ensure that the appropriate access is provided for the service in order for it to access the URI.",
            GatewayError::MalformedBody(_) => "Ensure that the request body is valid JSON and resubmit the request.",
            GatewayError::PropertyValueFormatError { .. }
            | GatewayError::PropertyValueTypeError { .. }
            | GatewayError::PropertyValueNotInList { .. } => "Correct the value for the property in the request body and resubmit the request if the operation failed.",
            GatewayError::PropertyMissing(_) => "Ensure that the property is in the request body and has a valid value and resubmit the request if the operation failed.",
            GatewayError::PropertyNotWritable(_) | GatewayError::PropertyUnknown(_) => "Remove the property from the request body and resubmit the request if the operation failed.",
            GatewayError::ActionParameterUnknown { .. }
            | GatewayError::ActionParameterNotSupported { .. } => "Correct the invalid parameter and resubmit the request if the operation failed.",
            GatewayError::ResourceNotFound { .. } => "Provide a valid resource identifier and resubmit the request.",
            GatewayError::BackendCallFailed(_) | GatewayError::InternalError(_) => "Resubmit the request.  If the problem persists, consider resetting the service.",
        }
    }

    pub fn severity(&self) -> &'static str {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                "Critical"
            }
            _ => "Warning",
        }
    }
}
