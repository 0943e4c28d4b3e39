//! Backend implementations.

pub mod mega;

/// Registers all compiled backends with the factory.
///
/// Called by [`crate::init`]; registration order is the order below.
pub fn register_all() {
    mega::register();
}
