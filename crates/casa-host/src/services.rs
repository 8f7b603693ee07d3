//! Service registry with async handlers

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use casa_core::{Context, ServiceCall};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{HostError, HostResult};

/// Future type for async service handlers
pub type ServiceFuture = Pin<Box<dyn Future<Output = HostResult<()>> + Send>>;

/// Boxed service handler
pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> ServiceFuture + Send + Sync>;

/// Maps `domain.service` names to their handlers
pub struct ServiceRegistry {
    services: DashMap<String, ServiceHandler>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a handler under `domain.service`
    pub fn register<F, Fut>(&self, domain: impl Into<String>, service: impl Into<String>, handler: F)
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HostResult<()>> + Send + 'static,
    {
        let domain = domain.into();
        let service = service.into();
        let key = format!("{}.{}", domain, service);

        debug!(domain = %domain, service = %service, "registering service");

        let handler: ServiceHandler = Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture);
        self.services.insert(key, handler);
    }

    /// Invoke a registered service
    pub async fn call(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
    ) -> HostResult<()> {
        let key = format!("{}.{}", domain, service);

        let handler = match self.services.get(&key) {
            Some(entry) => entry.value().clone(),
            None => {
                warn!(domain = %domain, service = %service, "service not found");
                return Err(HostError::ServiceNotFound {
                    domain: domain.to_string(),
                    service: service.to_string(),
                });
            }
        };

        debug!(domain = %domain, service = %service, "calling service");

        let call = ServiceCall::new(domain, service, service_data, context);
        handler(call).await
    }

    /// Whether a handler is registered under `domain.service`
    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&format!("{}.{}", domain, service))
    }

    /// Number of registered services
    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
