//! Request identification.
//!
//! # Responsibilities
//! - Generate a UUID v4 request ID as early as possible
//! - Propagate the ID onto the response for correlation
//!
//! # Design Decisions
//! - IDs ride the x-request-id header; a client-supplied ID is kept
//! - Trace spans see the ID because the set layer runs outermost

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a fresh UUID v4 per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Layer that sets `x-request-id` when the client did not send one.
pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::x_request_id(UuidRequestId)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct_uuids() {
        let mut make = UuidRequestId;
        let request = Request::new(());
        let first = make.make_request_id(&request).unwrap();
        let second = make.make_request_id(&request).unwrap();

        let first = first.header_value().to_str().unwrap().to_string();
        let second = second.header_value().to_str().unwrap().to_string();
        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
        assert!(Uuid::parse_str(&second).is_ok());
    }
}
