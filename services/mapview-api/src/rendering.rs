//! The single render funnel.
//!
//! The rendering backend is non-reentrant, so every call is serialized
//! behind the process-wide render lock. A worker first waits for the lock,
//! then for the (potentially multi-second) synchronous render, bounded by
//! the configured timeout. Client disconnects do not interrupt an in-flight
//! render.

use std::time::Instant;
use tracing::{debug, warn};

use mapview_common::{MapsError, MapsResult};

use crate::renderer::RenderTask;
use crate::state::AppState;

/// Render through the process-wide lock.
pub async fn render_serialized(state: &AppState, task: RenderTask) -> MapsResult<Vec<u8>> {
    let _guard = state.render_lock.lock().await;

    let started = Instant::now();
    let outcome = tokio::time::timeout(state.config.render_timeout, state.renderer.render(&task))
        .await
        .map_err(|_| MapsError::RenderTimeout)
        .and_then(|r| r);

    let elapsed = started.elapsed();
    match &outcome {
        Ok(bytes) => {
            debug!(
                width = task.width,
                height = task.height,
                crs = %task.crs,
                rotation = task.rotation,
                bytes = bytes.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "render completed"
            );
            crate::metrics::record_render(elapsed, true);
        }
        Err(e) => {
            warn!(
                width = task.width,
                height = task.height,
                crs = %task.crs,
                error = %e,
                elapsed_ms = elapsed.as_millis() as u64,
                "render failed"
            );
            crate::metrics::record_render(elapsed, false);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::InMemoryLayerStore;
    use crate::renderer::{MapRenderer, PlaceholderRenderer};
    use crate::state::{AppState, ServerConfig};
    use async_trait::async_trait;
    use mapview_common::{BoundingBox, CrsCode};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn task() -> RenderTask {
        RenderTask {
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            crs: CrsCode::Epsg3857,
            width: 64,
            height: 64,
            rotation: 0.0,
            layers: None,
            transparent: false,
        }
    }

    /// Renderer that fails if it observes itself running concurrently.
    struct ReentrancyProbe {
        active: AtomicU32,
    }

    #[async_trait]
    impl MapRenderer for ReentrancyProbe {
        async fn render(&self, _task: &RenderTask) -> mapview_common::MapsResult<Vec<u8>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst);
            assert_eq!(now, 0, "renderer entered concurrently");
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        }
    }

    #[tokio::test]
    async fn test_renders_are_serialized() {
        let state = Arc::new(AppState::new(
            ServerConfig::default(),
            Arc::new(ReentrancyProbe {
                active: AtomicU32::new(0),
            }),
            Arc::new(InMemoryLayerStore::with_sample_data()),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                render_serialized(&state, task()).await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), vec![1, 2, 3]);
        }
    }

    struct StuckRenderer;

    #[async_trait]
    impl MapRenderer for StuckRenderer {
        async fn render(&self, _task: &RenderTask) -> mapview_common::MapsResult<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_timeout_does_not_leak_the_lock() {
        let config = ServerConfig {
            render_timeout: Duration::from_millis(30),
            ..Default::default()
        };
        let state = AppState::new(
            config,
            Arc::new(StuckRenderer),
            Arc::new(InMemoryLayerStore::with_sample_data()),
        );

        let err = render_serialized(&state, task()).await.unwrap_err();
        assert!(matches!(err, MapsError::RenderTimeout));

        // The lock must be free again for the next request
        assert!(state.render_lock.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_placeholder_funnel() {
        let state = AppState::new(
            ServerConfig::default(),
            Arc::new(PlaceholderRenderer),
            Arc::new(InMemoryLayerStore::with_sample_data()),
        );
        let png = render_serialized(&state, task()).await.unwrap();
        assert_eq!(&png[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }
}
