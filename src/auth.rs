use axum::http::{HeaderMap, header};

/// Shared-secret bearer check for the staff surface. The public availability
/// and booking endpoints never go through this.
pub fn staff_authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == token)
}
