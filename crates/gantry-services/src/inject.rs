//! Dependency value injection

use crate::service::ServiceValue;
use parking_lot::Mutex;
use std::any::type_name;
use std::sync::Arc;
use thiserror::Error;

/// Injection errors
#[derive(Debug, Clone, Error)]
pub enum InjectError {
    #[error("injected value is not a {expected}")]
    TypeMismatch { expected: &'static str },
}

/// Receives a dependency's value when the dependent is about to start, and
/// gives it back up when the dependent stops.
pub trait Injector: Send + Sync {
    fn inject(&self, value: ServiceValue) -> Result<(), InjectError>;
    fn uninject(&self);
}

/// A typed cell filled by the container with a dependency's value.
///
/// Clones share one cell: hand one clone to
/// [`ServiceBuilder::requires_value`](crate::container::ServiceBuilder::requires_value)
/// and keep the other inside the service to read from during `start`.
pub struct InjectedValue<T: ?Sized> {
    cell: Arc<Mutex<Option<Arc<T>>>>,
}

impl<T> InjectedValue<T> {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
        }
    }

    /// The injected value, while the dependency is satisfied.
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.lock().clone()
    }
}

impl<T> Default for InjectedValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for InjectedValue<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Injector for InjectedValue<T> {
    fn inject(&self, value: ServiceValue) -> Result<(), InjectError> {
        let typed = value.downcast::<T>().map_err(|_| InjectError::TypeMismatch {
            expected: type_name::<T>(),
        })?;
        *self.cell.lock() = Some(typed);
        Ok(())
    }

    fn uninject(&self) {
        *self.cell.lock() = None;
    }
}

/// An untyped cell that keeps the dependency value as-is.
///
/// Used where the expected type is only known further downstream, such as
/// attachable deployment dependencies whose type check happens against an
/// attachment key at replay time.
#[derive(Clone, Default)]
pub struct ErasedInjectedValue {
    cell: Arc<Mutex<Option<ServiceValue>>>,
}

impl ErasedInjectedValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ServiceValue> {
        self.cell.lock().clone()
    }
}

impl Injector for ErasedInjectedValue {
    fn inject(&self, value: ServiceValue) -> Result<(), InjectError> {
        *self.cell.lock() = Some(value);
        Ok(())
    }

    fn uninject(&self) {
        *self.cell.lock() = None;
    }
}
