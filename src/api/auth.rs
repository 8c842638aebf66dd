// Admin session authentication.
//
// Sessions are opaque bearer tokens held in process memory; a token is
// issued at login and expires after the configured idle TTL. Every
// /admin route except /admin/login requires a live token.

use std::collections::HashMap;
use std::future::{ready, Ready};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;

use crate::util::env::env_req;

const LOGIN_PATH: &str = "/admin/login";

#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password: String,
}

impl AdminCredentials {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            username: env_req("ADMIN_USERNAME")?,
            password: env_req("ADMIN_PASSWORD")?,
        })
    }

    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Instant>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a fresh token for a successful login.
    pub fn issue(&self) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().unwrap();
        sessions.retain(|_, expires| *expires > Instant::now());
        sessions.insert(token.clone(), Instant::now() + self.ttl);
        token
    }

    /// Check a token and slide its expiry forward on success.
    pub fn validate(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(token) {
            Some(expires) if *expires > Instant::now() => {
                *expires = Instant::now() + self.ttl;
                true
            }
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.write().unwrap().remove(token);
    }
}

pub fn bearer_token(req: &ServiceRequest) -> Option<String> {
    token_from_header(req.headers().get("Authorization")?.to_str().ok()?)
}

pub fn token_from_header(header: &str) -> Option<String> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Session middleware for the /admin scope.
pub struct SessionAuth {
    store: Arc<SessionStore>,
}

impl SessionAuth {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthMiddleware {
            service,
            store: self.store.clone(),
        }))
    }
}

pub struct SessionAuthMiddleware<S> {
    service: S,
    store: Arc<SessionStore>,
}

impl<S, B> Service<ServiceRequest> for SessionAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.path() == LOGIN_PATH {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) });
        }

        let authorized = bearer_token(&req)
            .map(|token| self.store.validate(&token))
            .unwrap_or(false);

        if !authorized {
            tracing::warn!(path = %req.path(), "rejected admin request without a valid session");
            let (request, _) = req.into_parts();
            let response = HttpResponse::Unauthorized()
                .json(serde_json::json!({
                    "success": false,
                    "error": "authentication required",
                }))
                .map_into_right_body();
            return Box::pin(async move { Ok(ServiceResponse::new(request, response)) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_until_revoked() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.issue();
        assert!(store.validate(&token));
        store.revoke(&token);
        assert!(!store.validate(&token));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let store = SessionStore::new(Duration::from_secs(0));
        let token = store.issue();
        assert!(!store.validate(&token));
    }

    #[test]
    fn header_parsing_requires_bearer_scheme() {
        assert_eq!(token_from_header("Bearer abc"), Some("abc".to_string()));
        assert_eq!(token_from_header("Basic abc"), None);
        assert_eq!(token_from_header("Bearer "), None);
    }
}
