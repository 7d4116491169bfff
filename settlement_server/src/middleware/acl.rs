//! Access control list middleware for the settlement server.
//! This middleware can be placed on any route or service.
//!
//! It resolves the principal from the request headers and checks its roles against the roles the route requires. If
//! the principal is missing, a 401 Unauthorized response is returned. If it lacks any of the required roles, a 403
//! Forbidden response is returned. Otherwise the principal is stored in the request extensions and the request
//! continues.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;
use settlement_engine::db_types::Role;

use crate::{
    auth::principal_from_headers,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let principal = principal_from_headers(req.headers()).map_err(|e| {
                debug!("💻️ Rejecting request to {}. {e}", req.path());
                ServerError::from(e)
            })?;
            if required_roles.iter().all(|role| principal.has_role(*role)) {
                req.extensions_mut().insert(principal);
                service.call(req).await
            } else {
                let required = required_roles.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ");
                info!("💻️ {} tried to access {} without the required roles ({required})", principal.id, req.path());
                Err(ServerError::from(AuthError::InsufficientPermissions(format!("Requires {required}"))).into())
            }
        })
    }
}
