use http::StatusCode;
use oidc_login::CoordinationError;

/// Helper trait for converting errors to a standard response error format
pub(super) trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

/// The browser only ever sees the generic message; the full error has
/// already been logged when it was converted into a `CoordinationError`.
impl<T> IntoResponseError<T> for Result<T, CoordinationError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| (e.status_code(), e.client_message().to_string()))
    }
}
