//! Application state and shared resources.
//!
//! The server context is constructed explicitly and owns everything a
//! request can touch: configuration, the injected collaborators and the
//! render lock. There are no ambient globals.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::layers::LayerStore;
use crate::renderer::MapRenderer;

/// Read-only startup configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// External base URL advertised in capabilities documents
    pub base_url: String,
    pub service_title: String,
    pub service_abstract: String,
    /// Upper bound on one synchronous render call
    pub render_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8089".to_string(),
            service_title: "MapView WMS".to_string(),
            service_abstract: "Dynamic OGC services exposing the current map view".to_string(),
            render_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub config: ServerConfig,

    /// The rendering backend. Assumed single-threaded and non-reentrant;
    /// callers go through [`crate::rendering::render_serialized`], never
    /// directly.
    pub renderer: Arc<dyn MapRenderer>,

    pub layers: Arc<dyn LayerStore>,

    /// Serializes every render call process-wide.
    pub render_lock: Mutex<()>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        renderer: Arc<dyn MapRenderer>,
        layers: Arc<dyn LayerStore>,
    ) -> Self {
        Self {
            config,
            renderer,
            layers,
            render_lock: Mutex::new(()),
        }
    }
}
