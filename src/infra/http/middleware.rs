use std::time::Instant;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::api::Principal;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Failed response summary emitted by [`log_responses`].
struct FailedResponse {
    status: StatusCode,
    method: Method,
    path: String,
    elapsed_ms: u128,
    request_id: String,
    user_id: Option<Uuid>,
    report: Option<ErrorReport>,
}

impl FailedResponse {
    fn emit(&self) {
        let (source, chain) = match &self.report {
            Some(report) => (report.source, report.messages.as_slice()),
            None => ("unknown", &[][..]),
        };
        let detail = chain
            .first()
            .map(String::as_str)
            .unwrap_or("no diagnostic available");
        let user_id = self.user_id.map(|id| id.to_string()).unwrap_or_default();

        if self.status.is_server_error() {
            error!(
                target = "inkwire::http::response",
                status = self.status.as_u16(),
                method = %self.method,
                path = %self.path,
                elapsed_ms = self.elapsed_ms,
                source,
                detail,
                chain = ?chain,
                request_id = %self.request_id,
                user_id = %user_id,
                "request failed",
            );
        } else {
            warn!(
                target = "inkwire::http::response",
                status = self.status.as_u16(),
                method = %self.method,
                path = %self.path,
                elapsed_ms = self.elapsed_ms,
                source,
                detail,
                request_id = %self.request_id,
                user_id = %user_id,
                "request rejected",
            );
        }
    }
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    // Auth runs inside this layer, so the caller is only known on the way out.
    let user_id = response
        .extensions()
        .get::<Principal>()
        .map(|principal| principal.user_id);
    FailedResponse {
        status,
        method,
        path,
        elapsed_ms: started.elapsed().as_millis(),
        request_id,
        user_id,
        report: response.extensions_mut().remove::<ErrorReport>(),
    }
    .emit();

    response
}
