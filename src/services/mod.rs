//! Business logic shared by the HTTP routes and the schedule dispatcher.
//!
//! Every service checks the caller's permission before touching the
//! repository and scopes all reads and writes by the caller's company.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::domain::types::TypeConstraintError;
use crate::forms::FormError;
use crate::repository::errors::RepositoryError;

pub mod api_marketplace;
pub mod documentation;
pub mod form_manager;
pub mod manufacturing;
pub mod procurement;
pub mod quality_management;
pub mod reporting;
pub mod security_features;
pub mod testing;
pub mod user_experience;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Form(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid value: {0}")]
    TypeConstraint(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound,
            RepositoryError::ConstraintViolation(message) | RepositoryError::Conflict(message) => {
                ServiceError::Conflict(message)
            }
            RepositoryError::ValidationError(message) => ServiceError::TypeConstraint(message),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<TypeConstraintError> for ServiceError {
    fn from(err: TypeConstraintError) -> Self {
        ServiceError::TypeConstraint(err.to_string())
    }
}

impl From<FormError> for ServiceError {
    fn from(err: FormError) -> Self {
        ServiceError::Form(err.to_string())
    }
}

impl From<CryptoError> for ServiceError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Decryption | CryptoError::Encoding => ServiceError::Form(err.to_string()),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<csv::Error> for ServiceError {
    fn from(err: csv::Error) -> Self {
        ServiceError::Internal(format!("csv export failed: {err}"))
    }
}

/// Renders a header row and records as a UTF-8 CSV document.
pub fn write_csv<I, R>(header: &[String], records: I) -> ServiceResult<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for record in records {
        writer.write_record(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ServiceError::Internal(format!("csv export failed: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|err| ServiceError::Internal(format!("csv export failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quotes_embedded_separators() {
        let header = vec!["name".to_string(), "note".to_string()];
        let csv = write_csv(&header, vec![vec!["Ada", "a, b"]]).unwrap();
        assert_eq!(csv, "name,note\nAda,\"a, b\"\n");
    }

    #[test]
    fn repository_errors_map_to_service_errors() {
        assert!(matches!(
            ServiceError::from(RepositoryError::NotFound),
            ServiceError::NotFound
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::ConstraintViolation("dup".into())),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::Conflict("stale".into())),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::DatabaseError("io".into())),
            ServiceError::Internal(_)
        ));
    }

    #[test]
    fn decryption_failure_is_a_form_error() {
        assert!(matches!(
            ServiceError::from(CryptoError::Decryption),
            ServiceError::Form(_)
        ));
    }
}
