use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError};
use futures::future::{Ready, ready};
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, thiserror::Error)]
#[error("Invalid X-User-Id header: {0}")]
pub struct InvalidUserId(String);

impl ResponseError for InvalidUserId {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::BadRequest().json(serde_json::json!({"error": self.to_string()}))
    }
}

/// Caller identity from the optional `X-User-Id` header. Anonymous callers
/// get predictions but nothing is recorded for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext(pub Option<Uuid>);

impl FromRequest for UserContext {
    type Error = InvalidUserId;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let Some(value) = req.headers().get(USER_ID_HEADER) else {
            return ready(Ok(UserContext(None)));
        };
        let result = value
            .to_str()
            .map_err(|_| InvalidUserId("not valid UTF-8".to_string()))
            .and_then(|s| Uuid::parse_str(s.trim()).map_err(|e| InvalidUserId(e.to_string())))
            .map(|id| UserContext(Some(id)));
        if let Err(e) = &result {
            log::warn!("{} for path {}", e, req.path());
        }
        ready(result)
    }
}
