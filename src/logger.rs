use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Response header echoing the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Id of the request being served on the current task, if any
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// Request logging middleware.
///
/// Every request runs inside a `request` span carrying a fresh request id.
/// The same id is readable through [`current_request_id`] while the request
/// is served, and is returned to the client in `x-request-id`.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
        );
        let header_value = HeaderValue::from_str(&request_id).ok();

        let service = self.service.clone();

        // Inner services, including error rendering, run inside the scope
        Box::pin(REQUEST_ID.scope(
            request_id,
            async move {
                tracing::info!("Request started");

                let mut result = service.call(req).await;
                let elapsed_ms = start_time.elapsed().as_millis() as u64;

                if let (Ok(res), Some(value)) = (&mut result, header_value) {
                    res.headers_mut()
                        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                }

                match &result {
                    Ok(res) => tracing::info!(
                        status = res.status().as_u16(),
                        elapsed_ms,
                        "Request completed"
                    ),
                    Err(e) => tracing::warn!(error = %e, elapsed_ms, "Request failed"),
                }

                result
            }
            .instrument(span),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AuthError};
    use actix_web::{body::to_bytes, ResponseError};

    #[tokio::test]
    async fn test_request_id_is_scoped() {
        assert!(current_request_id().is_none());

        let inside = REQUEST_ID
            .scope("req-1".to_string(), async { current_request_id() })
            .await;

        assert_eq!(inside.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn test_error_body_reuses_request_id() {
        let response = REQUEST_ID
            .scope("req-2".to_string(), async {
                ResponseError::error_response(&AppError::Auth(AuthError::NoToken))
            })
            .await;

        let body = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(body["error_id"], "req-2");
        assert_eq!(body["code"], "NO_TOKEN");
    }
}
