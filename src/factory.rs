//! Backend factory and scheme registration.

use crate::url::BackendUrl;
use crate::{Backend, MegapoolError, Result};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Factory function type for creating backends from a parsed URL.
pub type BackendFactory = fn(&BackendUrl) -> Result<Box<dyn Backend>>;

static BACKEND_REGISTRY: OnceLock<RwLock<HashMap<String, BackendFactory>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, BackendFactory>> {
    BACKEND_REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a backend factory for a URL scheme.
///
/// Registering a scheme twice replaces the earlier factory.
///
/// # Example
///
/// ```no_run
/// use megapool::factory::register_backend;
/// use megapool::url::BackendUrl;
/// use megapool::{Backend, Result};
///
/// fn my_backend_factory(url: &BackendUrl) -> Result<Box<dyn Backend>> {
///     // Create and return backend instance
///     # unimplemented!()
/// }
///
/// pub fn register() {
///     register_backend("mybackend", my_backend_factory);
/// }
/// ```
pub fn register_backend(scheme: &str, factory: BackendFactory) {
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    reg.insert(scheme.to_ascii_lowercase(), factory);
}

/// Registered schemes, sorted.
pub fn schemes() -> Vec<String> {
    let reg = registry().read().unwrap_or_else(|e| e.into_inner());
    let mut schemes: Vec<String> = reg.keys().cloned().collect();
    schemes.sort();
    schemes
}

/// Creates a backend from a URL.
///
/// Call [`crate::init`] first so the built-in schemes are registered.
///
/// # Errors
///
/// Returns an error if:
/// - the URL cannot be parsed
/// - no backend is registered for its scheme
/// - the backend factory fails (e.g. unreadable accounts file)
pub fn new_backend(url: &str) -> Result<Box<dyn Backend>> {
    let url = BackendUrl::parse(url)?;

    let factory = {
        let reg = registry().read().unwrap_or_else(|e| e.into_inner());
        *reg.get(&url.scheme).ok_or_else(|| {
            MegapoolError::UnknownScheme(format!(
                "{} (registered: {})",
                url.scheme,
                reg.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?
    };

    factory(&url)
}
