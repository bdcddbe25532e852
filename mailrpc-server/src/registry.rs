//! Service registry
//!
//! Holds the named services and resolves dotted `"Service.Method"` names to
//! method handles. Registration normally happens once at startup, but the
//! table sits behind a mutex so registering while serving is also safe.
//!
//! # Registration rules
//!
//! - An empty name means "use the receiver's type name", which must then be
//!   an exported identifier (`MailService`, not `mailService`).
//! - An explicit name must be non-empty and must not contain `.`.
//! - Descriptors with non-exported or duplicate names are skipped.
//! - A service left with no methods is rejected.
//! - A name can be registered only once; the first registration wins.
//!
//! # Examples
//!
//! ```rust
//! use mailrpc_core::{Field, FieldKind, Result, RpcParams};
//! use mailrpc_server::{RequestContext, RpcService, ServiceMethod, ServiceRegistry};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Empty {}
//!
//! impl RpcParams for Empty {
//!     const FIELDS: &'static [Field] = &[];
//! }
//!
//! struct Clock;
//!
//! impl RpcService for Clock {
//!     fn methods(self: Arc<Self>) -> Vec<ServiceMethod> {
//!         vec![ServiceMethod::from_fn("Now", |_ctx: RequestContext, _: Empty| async {
//!             Ok(0u64)
//!         })]
//!     }
//! }
//!
//! let registry = ServiceRegistry::new();
//! assert_eq!(registry.register(Arc::new(Clock), "").unwrap(), "Clock");
//! assert!(registry.get("Clock.Now").is_ok());
//! assert!(registry.get("Clock").is_err());
//! ```

use crate::service::{is_exported, short_type_name, RpcService, Service, ServiceMethod};
use mailrpc_core::RpcError;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Why a receiver could not be registered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("rpc: type {0:?} is not exported")]
    NotExported(String),

    #[error("rpc: no service name for type {0:?}")]
    MissingName(String),

    #[error("rpc: invalid service name {0:?}")]
    InvalidName(String),

    #[error("rpc: {0:?} has no exported methods of suitable type")]
    NoEligibleMethods(String),

    #[error("rpc: service already defined: {0:?}")]
    AlreadyDefined(String),
}

/// Why a dotted method name could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("service/method request ill-formed")]
    IllFormed,

    #[error("can't find service")]
    ServiceNotFound,

    #[error("rpc: can't find method")]
    MethodNotFound,
}

impl LookupError {
    /// Wire error for this failure
    ///
    /// An ill-formed name is an invalid request; an unknown service or method
    /// is method-not-found.
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            LookupError::IllFormed => RpcError::invalid_request(self.to_string()),
            LookupError::ServiceNotFound | LookupError::MethodNotFound => {
                RpcError::method_not_found(self.to_string())
            }
        }
    }
}

/// Thread-safe table of registered services
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Mutex<HashMap<String, Arc<Service>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `receiver` under `name`, or under its type name if `name` is empty
    ///
    /// Returns the name the service was registered under.
    ///
    /// # Errors
    ///
    /// See the module docs for the rules. On error the table is unchanged.
    pub fn register<S: RpcService>(
        &self,
        receiver: Arc<S>,
        name: &str,
    ) -> Result<String, RegistryError> {
        let type_name = std::any::type_name::<S>();
        let service_name = if name.is_empty() {
            let derived = short_type_name::<S>();
            if !is_exported(derived) {
                return Err(RegistryError::NotExported(derived.to_string()));
            }
            derived.to_string()
        } else {
            name.to_string()
        };

        if service_name.is_empty() {
            return Err(RegistryError::MissingName(type_name.to_string()));
        }
        if service_name.contains('.') {
            return Err(RegistryError::InvalidName(service_name));
        }

        let methods = eligible_methods(&service_name, receiver.methods());
        if methods.is_empty() {
            return Err(RegistryError::NoEligibleMethods(service_name));
        }

        let service = Arc::new(Service::new(service_name.clone(), type_name, methods));
        let mut services = self.lock();
        match services.entry(service_name.clone()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyDefined(service_name)),
            Entry::Vacant(slot) => {
                tracing::info!(
                    service = %service_name,
                    methods = ?service.method_names(),
                    "service registered"
                );
                slot.insert(service);
                Ok(service_name)
            }
        }
    }

    /// Resolve `"Service.Method"` to its service and method
    ///
    /// # Errors
    ///
    /// [`LookupError::IllFormed`] unless the name has exactly one `.`, then
    /// [`LookupError::ServiceNotFound`] or [`LookupError::MethodNotFound`].
    pub fn get(&self, method: &str) -> Result<(Arc<Service>, Arc<ServiceMethod>), LookupError> {
        let mut parts = method.split('.');
        let (service_name, method_name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(service), Some(method), None) => (service, method),
            _ => return Err(LookupError::IllFormed),
        };

        let service = self
            .lock()
            .get(service_name)
            .cloned()
            .ok_or(LookupError::ServiceNotFound)?;

        let method = service
            .method(method_name)
            .ok_or(LookupError::MethodNotFound)?;

        Ok((service, method))
    }

    /// Registered service names, sorted
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Service>>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn eligible_methods(
    service: &str,
    descriptors: Vec<ServiceMethod>,
) -> HashMap<String, Arc<ServiceMethod>> {
    let mut methods = HashMap::with_capacity(descriptors.len());

    for descriptor in descriptors {
        if !is_exported(descriptor.name()) {
            tracing::debug!(service, method = descriptor.name(), "skipping unexported method");
            continue;
        }
        match methods.entry(descriptor.name().to_string()) {
            Entry::Occupied(_) => {
                tracing::warn!(service, method = descriptor.name(), "skipping duplicate method");
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(descriptor));
            }
        }
    }

    methods
}
