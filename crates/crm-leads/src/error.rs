//! Access and validation errors raised by the service layer.

use crm_core::error::CrmError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("principal does not match a known user")]
    UnknownPrincipal,

    #[error("user has neither an organisor profile nor an agent record")]
    NoRole,

    #[error("user is flagged as both organisor and agent")]
    AmbiguousRole,

    #[error("only organisors may {0}")]
    OrganisorRequired(&'static str),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
}

impl From<AccessError> for CrmError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::UnknownPrincipal
            | AccessError::NoRole
            | AccessError::AmbiguousRole
            | AccessError::OrganisorRequired(_) => CrmError::AuthorizationDenied {
                reason: err.to_string(),
            },
            AccessError::MissingField(_)
            | AccessError::PasswordTooShort(_) => CrmError::Validation {
                message: err.to_string(),
            },
        }
    }
}
