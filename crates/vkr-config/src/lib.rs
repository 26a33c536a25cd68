//! Startup configuration for the CPU-side resource substrate.
//!
//! Every size that the rest of the workspace would otherwise hardcode as a
//! call-site literal (arena reserve/commit, event queue depth, geometry
//! limits, ...) is read once from here. Values can be overridden from a
//! `vkr.toml` file or `VKR_*` environment variables; everything else falls
//! back to the defaults below.

use std::error;
use std::fmt;

#[derive(Clone, Debug)]
pub enum Error {
    Load(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Load(msg) => write!(f, "failed to load configuration: {}", msg),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    pub reserve_size: usize,
    pub commit_size: usize,
    pub large_pages: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            reserve_size: 64 * 1024 * 1024,
            commit_size: 1024 * 1024,
            large_pages: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventManagerConfig {
    pub queue_capacity: usize,
    pub data_buffer_capacity: usize,
    pub event_type_max: usize,
}

impl Default for EventManagerConfig {
    fn default() -> Self {
        EventManagerConfig {
            queue_capacity: 256,
            data_buffer_capacity: 1024 * 1024,
            event_type_max: 64,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeometryConfig {
    pub max_geometries: usize,
    pub default_max_vertices: usize,
    pub default_max_indices: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        GeometryConfig {
            max_geometries: 4096,
            default_max_vertices: 1 << 20,
            default_max_indices: 1 << 22,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HashTableConfig {
    pub initial_capacity: usize,
}

impl Default for HashTableConfig {
    fn default() -> Self {
        HashTableConfig {
            initial_capacity: 16,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_pipelines: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig { max_pipelines: 256 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub arena: ArenaConfig,
    pub event_manager: EventManagerConfig,
    pub geometry: GeometryConfig,
    pub hash_table: HashTableConfig,
    pub pipeline: PipelineConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            arena: ArenaConfig::default(),
            event_manager: EventManagerConfig::default(),
            geometry: GeometryConfig::default(),
            hash_table: HashTableConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration defaults, then layers `vkr.toml` (if present) and
    /// `VKR_*` environment variables on top.
    pub fn load() -> Result<EngineConfig> {
        let builder = config::Config::builder()
            .set_default("arena.reserve_size", ArenaConfig::default().reserve_size as i64)
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default("arena.commit_size", ArenaConfig::default().commit_size as i64)
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default("arena.large_pages", false)
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default(
                "event_manager.queue_capacity",
                EventManagerConfig::default().queue_capacity as i64,
            )
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default(
                "event_manager.data_buffer_capacity",
                EventManagerConfig::default().data_buffer_capacity as i64,
            )
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default(
                "event_manager.event_type_max",
                EventManagerConfig::default().event_type_max as i64,
            )
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default(
                "geometry.max_geometries",
                GeometryConfig::default().max_geometries as i64,
            )
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default(
                "geometry.default_max_vertices",
                GeometryConfig::default().default_max_vertices as i64,
            )
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default(
                "geometry.default_max_indices",
                GeometryConfig::default().default_max_indices as i64,
            )
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default(
                "hash_table.initial_capacity",
                HashTableConfig::default().initial_capacity as i64,
            )
            .map_err(|e| Error::Load(e.to_string()))?
            .set_default(
                "pipeline.max_pipelines",
                PipelineConfig::default().max_pipelines as i64,
            )
            .map_err(|e| Error::Load(e.to_string()))?
            .add_source(config::File::with_name("vkr").required(false))
            .add_source(config::Environment::with_prefix("VKR").separator("_"));

        let cfg = builder.build().map_err(|e| Error::Load(e.to_string()))?;

        Ok(EngineConfig {
            arena: ArenaConfig {
                reserve_size: cfg
                    .get_int("arena.reserve_size")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
                commit_size: cfg
                    .get_int("arena.commit_size")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
                large_pages: cfg
                    .get_bool("arena.large_pages")
                    .map_err(|e| Error::Load(e.to_string()))?,
            },
            event_manager: EventManagerConfig {
                queue_capacity: cfg
                    .get_int("event_manager.queue_capacity")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
                data_buffer_capacity: cfg
                    .get_int("event_manager.data_buffer_capacity")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
                event_type_max: cfg
                    .get_int("event_manager.event_type_max")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
            },
            geometry: GeometryConfig {
                max_geometries: cfg
                    .get_int("geometry.max_geometries")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
                default_max_vertices: cfg
                    .get_int("geometry.default_max_vertices")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
                default_max_indices: cfg
                    .get_int("geometry.default_max_indices")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
            },
            hash_table: HashTableConfig {
                initial_capacity: cfg
                    .get_int("hash_table.initial_capacity")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
            },
            pipeline: PipelineConfig {
                max_pipelines: cfg
                    .get_int("pipeline.max_pipelines")
                    .map_err(|e| Error::Load(e.to_string()))? as usize,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.arena.reserve_size, 64 * 1024 * 1024);
        assert_eq!(cfg.event_manager.queue_capacity, 256);
    }

    #[test]
    fn load_falls_back_to_defaults_without_a_config_file() {
        let cfg = EngineConfig::load().expect("config should load from defaults alone");
        assert_eq!(cfg, EngineConfig::default());
    }
}
