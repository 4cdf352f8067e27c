use error_stack::Report;
use kernel::KernelError;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    SqlX(sqlx::Error),
    #[error(transparent)]
    Env(dotenvy::Error),
    #[error(transparent)]
    Serde(serde_json::Error),
    #[error(transparent)]
    Conversion(anyhow::Error),
}

impl From<sqlx::Error> for DriverError {
    fn from(value: sqlx::Error) -> Self {
        Self::SqlX(value)
    }
}

impl From<dotenvy::Error> for DriverError {
    fn from(value: dotenvy::Error) -> Self {
        Self::Env(value)
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Lift a backend error into a kernel report, keeping transient
/// unavailability distinct from everything else.
pub trait ConvertError {
    type Ok;
    fn convert_error(self) -> error_stack::Result<Self::Ok, KernelError>;
}

impl<T> ConvertError for Result<T, DriverError> {
    type Ok = T;
    fn convert_error(self) -> error_stack::Result<T, KernelError> {
        self.map_err(|error| match error {
            DriverError::SqlX(sqlx::Error::PoolTimedOut) => {
                Report::from(error).change_context(KernelError::Timeout)
            }
            DriverError::SqlX(sqlx::Error::Io(_)) => {
                Report::from(error).change_context(KernelError::Timeout)
            }
            _ => Report::from(error).change_context(KernelError::Internal),
        })
    }
}
