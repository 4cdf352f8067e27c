use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use error_stack::Report;
use kernel::{KernelError, RejectReason};
use serde::Serialize;
use std::process::{ExitCode, Termination};

#[derive(Debug)]
pub struct StackTrace(Report<KernelError>);

impl From<Report<KernelError>> for StackTrace {
    fn from(e: Report<KernelError>) -> Self {
        StackTrace(e)
    }
}

impl Termination for StackTrace {
    fn report(self) -> ExitCode {
        self.0.report()
    }
}

#[derive(Debug)]
pub struct ErrorStatus(Report<KernelError>);

impl From<Report<KernelError>> for ErrorStatus {
    fn from(e: Report<KernelError>) -> Self {
        ErrorStatus(e)
    }
}

/// Precondition failures carry their reason to the client; the UI decides
/// how to word them.
#[derive(Debug, Serialize)]
struct Rejection {
    reason: RejectReason,
}

impl IntoResponse for ErrorStatus {
    fn into_response(self) -> axum::response::Response {
        match self.0.current_context() {
            KernelError::Validation => StatusCode::BAD_REQUEST.into_response(),
            KernelError::NotFound => StatusCode::NOT_FOUND.into_response(),
            KernelError::Rejected(reason) => {
                let status = match reason {
                    RejectReason::NotAuthorized => StatusCode::FORBIDDEN,
                    _ => StatusCode::CONFLICT,
                };
                (status, Json(Rejection { reason: *reason })).into_response()
            }
            KernelError::Concurrency => StatusCode::CONFLICT.into_response(),
            KernelError::Timeout => StatusCode::REQUEST_TIMEOUT.into_response(),
            KernelError::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
