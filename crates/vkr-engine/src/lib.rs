//! Top-level wiring for the engine's CPU-side resource and memory substrate.
//!
//! There is no process-wide singleton: an [`Engine`] is an explicit value
//! constructed from a backend and a config, owning one arena-backed
//! allocator plus the event manager, geometry system and pipeline registry
//! built on top of it, and torn down in the reverse of construction order.

use std::rc::Rc;

use vkr_alloc::{Allocator, Arena, ArenaFlags};
use vkr_backend::Backend;
use vkr_config::EngineConfig;
use vkr_events::EventManager;
use vkr_geometry::{GeometrySystem, VertexLayoutKind};
use vkr_pipeline::PipelineRegistry;

/// Owns, in construction order: the root arena and its allocator, the event
/// manager, the geometry system, and the pipeline registry. Each subsystem
/// besides the root allocator manages its own arena
/// internally: every field here is a value type with an owning arena, not a
/// handle into shared state.
pub struct Engine {
    allocator: Allocator,
    event_manager: EventManager,
    geometry: GeometrySystem,
    pipeline: PipelineRegistry,
}

impl Engine {
    pub fn new(config: EngineConfig, backend: Rc<dyn Backend>, primary_layout: VertexLayoutKind) -> Engine {
        let root_arena = Rc::new(Arena::create(
            config.arena.reserve_size,
            config.arena.commit_size,
            if config.arena.large_pages { ArenaFlags::LARGE_PAGES } else { ArenaFlags::NONE },
        ));
        let allocator = Allocator::from_arena(root_arena);

        let event_manager = EventManager::new(config.event_manager);
        let geometry = GeometrySystem::new(config.geometry, config.hash_table, backend.clone(), primary_layout);
        let pipeline = PipelineRegistry::new(config.pipeline, config.hash_table, backend);

        Engine { allocator, event_manager, geometry, pipeline }
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.event_manager
    }

    pub fn geometry(&self) -> &GeometrySystem {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GeometrySystem {
        &mut self.geometry
    }

    pub fn pipeline(&self) -> &PipelineRegistry {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut PipelineRegistry {
        &mut self.pipeline
    }

    /// Tears down in reverse construction order: pipeline registry first
    /// (destroys every backend pipeline), then the event manager's worker
    /// thread. The geometry system and the root allocator have no explicit
    /// teardown beyond drop — their GPU-visible buffers are reclaimed by the
    /// backend's own lifetime.
    pub fn shutdown(&mut self) {
        self.pipeline.shutdown();
        self.event_manager.shutdown();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkr_backend::MockBackend;

    #[test]
    fn engine_wires_every_subsystem_and_tears_down_without_panicking() {
        let backend: Rc<dyn Backend> = Rc::new(MockBackend::new());
        let mut engine = Engine::new(EngineConfig::default(), backend, VertexLayoutKind::PositionNormalUvTangent);
        assert_eq!(engine.geometry().stats().live_geometries, 0);
        assert_eq!(engine.pipeline().stats().total_pipelines_created, 0);
        engine.shutdown();
    }
}
