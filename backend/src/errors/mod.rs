//! Global application error types and handlers.
//!
//! This module defines the error type returned by services and resolvers and
//! maps every kind onto a GraphQL error carrying a `code` extension, so clients
//! can tell input problems, authentication failures and server faults apart.

use async_graphql::{ErrorExtensions, Error as GraphQLError};
use thiserror::Error;

use adapters::MailError;

use crate::auth::AuthError;
use crate::database::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("{0}")]
    UserInput(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{message}")]
    Authorization { message: String, code: u16 },

    #[error("mail delivery failed: {0}")]
    MailDelivery(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> String {
        match self {
            AppError::UserInput(_) => "BAD_USER_INPUT".to_string(),
            AppError::Authentication(_) => "UNAUTHENTICATED".to_string(),
            AppError::Authorization { code, .. } => code.to_string(),
            AppError::MailDelivery(_) => "500".to_string(),
            AppError::NotFound(_) => "NOT_FOUND".to_string(),
            AppError::Store(_) | AppError::Internal(_) => "INTERNAL_SERVER_ERROR".to_string(),
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, AppError::Authentication(_))
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> GraphQLError {
        let code = self.code();
        GraphQLError::new_with_source(self.clone()).extend_with(|_, extensions| {
            extensions.set("code", code);
        })
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(err) => err.into(),
            AuthError::Hash(_) | AuthError::Blocking(_) => AppError::Internal(err.to_string()),
            AuthError::InvalidResetToken => AppError::UserInput(err.to_string()),
            other => AppError::Authentication(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Duplicate(what) => AppError::UserInput(format!("{what} already exists")),
            other => AppError::Store(other.to_string()),
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Delivery(message) => AppError::MailDelivery(message),
            MailError::Address(message) => AppError::UserInput(message),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_code_follows_the_error_kind() {
        let err = AppError::Authorization {
            message: "currentUser Required".to_string(),
            code: 499,
        }
        .extend();

        assert_eq!(err.message, "currentUser Required");
        let extensions = err.extensions.expect("code extension");
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("499"))
        );
    }

    #[test]
    fn mail_failures_keep_the_transport_message() {
        let err: AppError = MailError::Delivery("535 bad credentials".to_string()).into();

        assert_eq!(err, AppError::MailDelivery("535 bad credentials".to_string()));
        assert_eq!(err.to_string(), "mail delivery failed: 535 bad credentials");
    }

    #[test]
    fn only_recipient_addresses_are_user_input() {
        let err: AppError = MailError::Address("not an address".to_string()).into();
        assert_eq!(err, AppError::UserInput("not an address".to_string()));

        let err: AppError = MailError::Sender("missing domain".to_string()).into();
        assert_eq!(
            err,
            AppError::Internal("invalid sender address: missing domain".to_string())
        );
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn auth_failures_become_authentication_errors() {
        let err: AppError = AuthError::InvalidCredentials.into();
        assert!(err.is_authentication());
    }
}
