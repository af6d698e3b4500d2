use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth;
use crate::domain::Principal;

/// Resolve the caller into a `Principal` and inject it into the request.
///
/// Never rejects: a missing or invalid token yields `Principal::Anonymous`,
/// and the guard pipeline decides what an anonymous caller may reach. The
/// login ceremony itself lives in the identity collaborator.
pub async fn principal_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let principal = match extract_bearer(&headers) {
        Some(token) => match auth::validate_jwt(&token) {
            Ok(claims) => claims.into_principal(),
            Err(e) => {
                tracing::debug!("rejecting bearer token: {}", e);
                Principal::Anonymous
            }
        },
        None => Principal::Anonymous,
    };

    request.extensions_mut().insert(principal);
    next.run(request).await
}

/// Extract a bearer token from the Authorization header, if any.
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert!(extract_bearer(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(extract_bearer(&headers).is_none());
    }
}
