/// Bearer-token authentication middleware
///
/// Validates the access token in the `Authorization` header and injects the
/// caller's `Identity` into request extensions for the handlers behind it.
/// Rejections are rendered here, so their error body carries the request id.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::validate_access_token;
use crate::error::{AppError, AuthError, TokenError};

pub struct JwtMiddleware {
    secret: Arc<Vec<u8>>,
}

impl JwtMiddleware {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    secret: Arc<Vec<u8>>,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn reject<B>(req: ServiceRequest, error: AuthError) -> ServiceResponse<EitherBody<B>> {
    let response = ResponseError::error_response(&AppError::Auth(error));
    req.into_response(response).map_into_right_body()
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(token) = bearer_token(&req) else {
            tracing::warn!("Missing or invalid Authorization header");
            return Box::pin(async move { Ok(reject(req, AuthError::MissingToken)) });
        };

        match validate_access_token(&token, &self.secret) {
            Ok(identity) => {
                tracing::debug!(user_id = identity.user_id, "Access token validated");
                req.extensions_mut().insert(identity);

                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Access token rejected");
                let auth_error = match e {
                    TokenError::Expired => AuthError::Expired,
                    _ => AuthError::TokenInvalid,
                };
                Box::pin(async move { Ok(reject(req, auth_error)) })
            }
        }
    }
}
