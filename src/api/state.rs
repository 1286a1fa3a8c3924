use std::sync::Arc;

use crate::services::{ResolveOptions, Resolver};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    /// Applied to every request before its query-string overrides
    pub default_options: ResolveOptions,
}

impl AppState {
    pub fn new(resolver: Arc<Resolver>, default_options: ResolveOptions) -> Self {
        Self {
            resolver,
            default_options,
        }
    }
}
