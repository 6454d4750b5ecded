//! External collaborators consulted when a peer connects
//!
//! The server calls an [`Authorizer`] to decide whether a connect request is
//! accepted and an [`IdentityResolver`] to name the new session. Both are
//! remote services in a real deployment; the stubs here accept everyone and
//! derive a guest name from the peer address.

use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;

/// Failure reported by an external service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service} unavailable: {reason}")]
pub struct ServiceError {
    pub service: &'static str,
    pub reason: String,
}

impl ServiceError {
    /// Creates an error for the named service
    pub fn new(service: &'static str, reason: impl Into<String>) -> Self {
        Self {
            service,
            reason: reason.into(),
        }
    }
}

/// Decides whether a connecting peer may join
pub trait Authorizer {
    fn authorize(&self, addr: SocketAddr) -> impl Future<Output = Result<bool, ServiceError>> + Send;
}

/// Provides the display name for a newly authorized peer
pub trait IdentityResolver {
    fn resolve_name(
        &self,
        addr: SocketAddr,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

/// Accepts every connect request
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    async fn authorize(&self, _addr: SocketAddr) -> Result<bool, ServiceError> {
        Ok(true)
    }
}

/// Names every session `guest@<address>`
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestNames;

impl IdentityResolver for GuestNames {
    async fn resolve_name(&self, addr: SocketAddr) -> Result<String, ServiceError> {
        Ok(format!("guest@{}", addr))
    }
}
