//! The pipeline registry: owns graphics pipeline slots, binds logical state
//! with redundant-bind elision, and tracks frame/lifetime telemetry.

use std::rc::Rc;

use log::warn;

use vkr_alloc::Arena;
use vkr_backend::{
    Backend, Domain, GraphicsPipelineDescription, PipelineHandle as BackendPipelineHandle,
    ShaderModuleConfig, ShaderRuntimeLayout, ShaderStageConfig, DOMAIN_COUNT,
};
use vkr_config::{HashTableConfig, PipelineConfig};

use crate::error::Error;
use crate::handle::PipelineHandle;
use crate::name_map::NameMap;

struct PipelineEntry {
    slot_id: u32,
    generation: u32,
    backend_handle: BackendPipelineHandle,
    description: GraphicsPipelineDescription,
    layout: ShaderRuntimeLayout,
    domain: Domain,
    live: bool,
}

impl PipelineEntry {
    fn empty(slot_id: u32, generation: u32) -> PipelineEntry {
        PipelineEntry {
            slot_id,
            generation,
            backend_handle: BackendPipelineHandle::NULL,
            description: GraphicsPipelineDescription {
                stages: ShaderStageConfig {
                    vertex: None,
                    fragment: None,
                    geometry: None,
                    tess_control: None,
                    tess_eval: None,
                },
                renderpass: String::new(),
                domain: Domain::World,
            },
            layout: ShaderRuntimeLayout::default(),
            domain: Domain::World,
            live: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct PipelineRegistryStats {
    pub total_pipelines_created: u64,
    pub total_pipeline_binds: u64,
    pub redundant_binds_avoided: u64,
    pub total_global_applies: u64,
    pub total_instance_acquires: u64,
    pub total_instance_releases: u64,
    pub total_instance_updates: u64,
    pub total_descriptor_writes_avoided: u64,
    /// Per-frame count of actual pipeline changes, cleared by
    /// [`PipelineRegistry::reset_frame_stats`].
    pub frame_pipeline_changes: u64,
}

pub struct PipelineRegistry {
    config: PipelineConfig,
    backend: Rc<dyn Backend>,
    entries: Vec<PipelineEntry>,
    free_stack: Vec<u32>,
    next_generation: u32,
    name_map: NameMap,
    domain_index: [Vec<u32>; DOMAIN_COUNT],
    current_pipeline: Option<PipelineHandle>,
    current_domain: Option<Domain>,
    pipeline_bound: bool,
    global_state_dirty: bool,
    stats: PipelineRegistryStats,
}

impl PipelineRegistry {
    pub fn new(config: PipelineConfig, hash_table_config: HashTableConfig, backend: Rc<dyn Backend>) -> PipelineRegistry {
        let name_arena = Rc::new(Arena::create(
            1024 * 1024,
            64 * 1024,
            vkr_alloc::ArenaFlags::NONE,
        ));
        PipelineRegistry {
            config,
            backend,
            entries: Vec::new(),
            free_stack: Vec::new(),
            next_generation: 0,
            name_map: NameMap::new(name_arena, hash_table_config),
            domain_index: Default::default(),
            current_pipeline: None,
            current_domain: None,
            pipeline_bound: false,
            global_state_dirty: true,
            stats: PipelineRegistryStats::default(),
        }
    }

    fn acquire_slot(&mut self) -> Option<PipelineHandle> {
        if self.entries.len() >= self.config.max_pipelines && self.free_stack.is_empty() {
            return None;
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        let slot_index = if let Some(idx) = self.free_stack.pop() {
            idx as usize
        } else {
            self.entries.push(PipelineEntry::empty(0, 0));
            self.entries.len() - 1
        };
        self.entries[slot_index] = PipelineEntry::empty(slot_index as u32 + 1, generation);
        Some(PipelineHandle { id: slot_index as u32 + 1, generation })
    }

    fn validate(&self, handle: PipelineHandle) -> Result<usize, Error> {
        if handle.is_null() {
            return Err(Error::InvalidHandle);
        }
        let idx = handle.slot_index();
        if idx >= self.entries.len() || self.entries[idx].generation != handle.generation || !self.entries[idx].live
        {
            return Err(Error::InvalidHandle);
        }
        Ok(idx)
    }

    pub fn description(&self, handle: PipelineHandle) -> Result<&GraphicsPipelineDescription, Error> {
        self.validate(handle).map(|idx| &self.entries[idx].description)
    }

    pub fn shader_runtime_layout(&self, handle: PipelineHandle) -> Result<ShaderRuntimeLayout, Error> {
        self.validate(handle).map(|idx| self.entries[idx].layout)
    }

    pub fn is_live(&self, handle: PipelineHandle) -> bool {
        !handle.is_null()
            && handle.slot_index() < self.entries.len()
            && self.entries[handle.slot_index()].live
            && self.entries[handle.slot_index()].generation == handle.generation
    }

    /// Acquires a slot, calls the backend create, reads back the
    /// reflection-derived ABI sizes if the backend exposes them, and
    /// registers `name` plus any `aliases` in the name map.
    pub fn create_graphics_pipeline(
        &mut self,
        description: GraphicsPipelineDescription,
        name: &str,
        aliases: &[&str],
    ) -> Result<PipelineHandle, Error> {
        let handle = self.acquire_slot().ok_or(Error::PoolExhausted)?;
        let idx = handle.slot_index();

        let domain = description.domain;
        let backend_handle = match self.backend.pipeline_create_graphics(&description) {
            Ok(h) => h,
            Err(e) => {
                warn!("pipeline registry: create_graphics_pipeline({}) failed ({:?})", name, e);
                self.entries[idx] = PipelineEntry::empty(handle.id, handle.generation);
                self.free_stack.push(idx as u32);
                return Err(Error::Backend(e));
            }
        };

        let layout = self
            .backend
            .pipeline_get_shader_runtime_layout(backend_handle)
            .unwrap_or_default();

        self.entries[idx] = PipelineEntry {
            slot_id: handle.id,
            generation: handle.generation,
            backend_handle,
            description,
            layout,
            domain,
            live: true,
        };
        self.name_map.insert(name, idx);
        for alias in aliases {
            self.name_map.insert(alias, idx);
        }
        self.domain_index[domain.index()].push(idx as u32);
        self.stats.total_pipelines_created += 1;
        Ok(handle)
    }

    /// Resolves module stages before delegating to
    /// [`Self::create_graphics_pipeline`]: if every stage names the same source file, switches to
    /// single-file multi-entry and synthesizes missing vertex/fragment
    /// entry points (`vertexMain`/`fragmentMain`); requires both a vertex
    /// and a fragment module. Resolves the renderpass by name, falling
    /// back to `domain`'s built-in renderpass when none is given.
    pub fn create_from_shader_config(
        &mut self,
        stages: ShaderStageConfig,
        domain: Domain,
        renderpass: Option<&str>,
        name: &str,
        aliases: &[&str],
    ) -> Result<PipelineHandle, Error> {
        let stages = resolve_single_file_stages(stages);
        if stages.vertex.is_none() || stages.fragment.is_none() {
            return Err(Error::MissingShaderStage);
        }
        let renderpass = renderpass
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| domain.builtin_renderpass_name().to_string());

        let description = GraphicsPipelineDescription { stages, renderpass, domain };
        self.create_graphics_pipeline(description, name, aliases)
    }

    /// If `handle` is already current and bound, counts it as a redundant
    /// bind and returns immediately without touching logical state;
    /// otherwise marks `handle` current, sets `pipeline_bound` and
    /// `global_state_dirty`, and bumps both the per-frame and lifetime bind
    /// counters. The actual GPU bind happens lazily on the next state
    /// update.
    pub fn bind(&mut self, handle: PipelineHandle) -> Result<(), Error> {
        let idx = self.validate(handle)?;
        if self.pipeline_bound && self.current_pipeline == Some(handle) {
            self.stats.redundant_binds_avoided += 1;
            return Ok(());
        }
        self.current_pipeline = Some(handle);
        self.current_domain = Some(self.entries[idx].domain);
        self.pipeline_bound = true;
        self.global_state_dirty = true;
        self.stats.frame_pipeline_changes += 1;
        self.stats.total_pipeline_binds += 1;
        Ok(())
    }

    pub fn is_pipeline_bound(&self, handle: PipelineHandle) -> bool {
        self.pipeline_bound && self.current_pipeline == Some(handle)
    }

    pub fn global_state_dirty(&self) -> bool {
        self.global_state_dirty
    }

    /// Requires a bound pipeline; delegates to the backend and clears
    /// `global_state_dirty` on success.
    pub fn update_global_state(&mut self, ubo: &[u8]) -> Result<(), Error> {
        let handle = self.current_pipeline.ok_or(Error::InvalidHandle)?;
        if !self.pipeline_bound {
            return Err(Error::InvalidHandle);
        }
        let idx = self.validate(handle)?;
        let err = self.backend.update_global_state(self.entries[idx].backend_handle, ubo);
        if !err.is_success() {
            return Err(Error::Backend(err));
        }
        self.global_state_dirty = false;
        self.stats.total_global_applies += 1;
        Ok(())
    }

    pub fn acquire_instance_state(&mut self, handle: PipelineHandle) -> Result<vkr_backend::InstanceStateHandle, Error> {
        let idx = self.validate(handle)?;
        let instance = self.backend.acquire_instance_state(self.entries[idx].backend_handle);
        self.stats.total_instance_acquires += 1;
        Ok(instance)
    }

    pub fn release_instance_state(&mut self, handle: PipelineHandle, instance: vkr_backend::InstanceStateHandle) -> Result<(), Error> {
        let idx = self.validate(handle)?;
        self.backend.release_instance_state(self.entries[idx].backend_handle, instance);
        self.stats.total_instance_releases += 1;
        Ok(())
    }

    pub fn update_instance_state(
        &mut self,
        handle: PipelineHandle,
        instance: vkr_backend::InstanceStateHandle,
        data: &[u8],
    ) -> Result<(), Error> {
        let idx = self.validate(handle)?;
        let err = self.backend.update_instance_state(self.entries[idx].backend_handle, instance, data);
        if !err.is_success() {
            return Err(Error::Backend(err));
        }
        self.stats.total_instance_updates += 1;
        Ok(())
    }

    /// Maps `pipeline_id` to a domain (default WORLD), tries `shader_name`
    /// first, then the domain's alias `p_<domain>`, and accepts the match
    /// only if its own domain equals the requested one.
    pub fn get_pipeline_for_material(&self, shader_name: &str, pipeline_id: Option<Domain>) -> Option<PipelineHandle> {
        let domain = pipeline_id.unwrap_or(Domain::World);
        let candidate = self
            .name_map
            .get(shader_name)
            .or_else(|| self.name_map.get(&domain.alias_name()))?;
        let entry = &self.entries[candidate];
        if entry.live && entry.domain == domain {
            Some(PipelineHandle { id: entry.slot_id, generation: entry.generation })
        } else {
            None
        }
    }

    pub fn reset_frame_stats(&mut self) {
        self.stats.frame_pipeline_changes = 0;
    }

    /// Drains the backend's "descriptor writes avoided" counter into the
    /// lifetime total.
    pub fn collect_backend_telemetry(&mut self) {
        if let Some(avoided) = self.backend.get_and_reset_descriptor_writes_avoided() {
            self.stats.total_descriptor_writes_avoided += avoided;
        }
    }

    pub fn stats(&self) -> PipelineRegistryStats {
        self.stats
    }

    /// Destroys the backend pipeline for every slot with a non-null backend
    /// handle, including slots that appear released — a pipeline entry is
    /// only ever zeroed back to `BackendPipelineHandle::NULL` by this call,
    /// never by release, so this is the one place a leaked backend handle
    /// could otherwise escape.
    pub fn shutdown(&mut self) {
        for entry in &mut self.entries {
            if !entry.backend_handle.is_null() {
                self.backend.pipeline_destroy(entry.backend_handle);
                entry.backend_handle = BackendPipelineHandle::NULL;
            }
        }
    }
}

/// If every configured stage names the same source file, switches to
/// single-file multi-entry: a vertex entry point defaults to `vertexMain`
/// and a fragment entry point to `fragmentMain` when the caller didn't name
/// one explicitly.
fn resolve_single_file_stages(stages: ShaderStageConfig) -> ShaderStageConfig {
    let paths: Vec<&str> = [&stages.vertex, &stages.fragment, &stages.geometry, &stages.tess_control, &stages.tess_eval]
        .iter()
        .filter_map(|s| s.as_ref().map(|m| m.source_path.as_str()))
        .collect();
    let single_file = match paths.split_first() {
        Some((first, rest)) if rest.iter().all(|p| p == first) => Some((*first).to_string()),
        _ => None,
    };

    let Some(path) = single_file else { return stages };

    let vertex = Some(stages.vertex.unwrap_or_else(|| ShaderModuleConfig {
        source_path: path.clone(),
        entry_point: "vertexMain".to_string(),
    }));
    let fragment = Some(stages.fragment.unwrap_or_else(|| ShaderModuleConfig {
        source_path: path,
        entry_point: "fragmentMain".to_string(),
    }));

    ShaderStageConfig { vertex, fragment, ..stages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkr_backend::MockBackend;

    fn description(name_for_renderpass: &str, domain: Domain) -> GraphicsPipelineDescription {
        GraphicsPipelineDescription {
            stages: ShaderStageConfig {
                vertex: Some(ShaderModuleConfig { source_path: "shader.glsl".into(), entry_point: "vertexMain".into() }),
                fragment: Some(ShaderModuleConfig { source_path: "shader.glsl".into(), entry_point: "fragmentMain".into() }),
                geometry: None,
                tess_control: None,
                tess_eval: None,
            },
            renderpass: name_for_renderpass.to_string(),
            domain,
        }
    }

    fn registry() -> (PipelineRegistry, Rc<MockBackend>) {
        let backend = Rc::new(MockBackend::new());
        let backend_dyn: Rc<dyn Backend> = backend.clone();
        let reg = PipelineRegistry::new(
            PipelineConfig { max_pipelines: 16 },
            HashTableConfig { initial_capacity: 16 },
            backend_dyn,
        );
        (reg, backend)
    }

    #[test]
    fn create_graphics_pipeline_registers_name_and_aliases() {
        let (mut reg, _backend) = registry();
        let handle = reg
            .create_graphics_pipeline(description("renderpass_world", Domain::World), "p1", &["p_world"])
            .unwrap();
        assert!(reg.is_live(handle));
        assert_eq!(reg.get_pipeline_for_material("p1", Some(Domain::World)), Some(handle));
        assert_eq!(reg.get_pipeline_for_material("missing", Some(Domain::World)), Some(handle));
        assert_eq!(reg.stats().total_pipelines_created, 1);
    }

    #[test]
    fn create_from_shader_config_requires_vertex_and_fragment() {
        let (mut reg, _backend) = registry();
        let stages = ShaderStageConfig {
            vertex: None,
            fragment: None,
            geometry: None,
            tess_control: None,
            tess_eval: None,
        };
        assert_eq!(
            reg.create_from_shader_config(stages, Domain::Ui, None, "ui1", &[]).unwrap_err(),
            Error::MissingShaderStage
        );
    }

    #[test]
    fn create_from_shader_config_fails_when_stages_reference_different_files_without_a_vertex_module() {
        let (mut reg, _backend) = registry();
        let stages = ShaderStageConfig {
            vertex: None,
            fragment: Some(ShaderModuleConfig { source_path: "frag.glsl".into(), entry_point: "fragmentMain".into() }),
            geometry: Some(ShaderModuleConfig { source_path: "geom.glsl".into(), entry_point: "geometryMain".into() }),
            tess_control: None,
            tess_eval: None,
        };
        assert_eq!(
            reg.create_from_shader_config(stages, Domain::Ui, None, "ui1", &[]).unwrap_err(),
            Error::MissingShaderStage
        );
    }

    #[test]
    fn create_from_shader_config_synthesizes_entry_points_for_a_single_file() {
        let (mut reg, backend) = registry();
        backend.set_shader_runtime_layout(ShaderRuntimeLayout { global_ubo_size: 64, ..Default::default() });
        let stages = ShaderStageConfig {
            vertex: Some(ShaderModuleConfig { source_path: "combined.glsl".into(), entry_point: String::new() }),
            fragment: None,
            geometry: None,
            tess_control: None,
            tess_eval: None,
        };
        let handle = reg.create_from_shader_config(stages, Domain::World, None, "combined", &[]).unwrap();
        assert!(reg.is_live(handle));
    }

    #[test]
    fn pipeline_rebind_elision() {
        let (mut reg, _backend) = registry();
        let p1 = reg.create_graphics_pipeline(description("renderpass_world", Domain::World), "p1", &[]).unwrap();
        let p2 = reg.create_graphics_pipeline(description("renderpass_world", Domain::World), "p2", &[]).unwrap();

        reg.bind(p1).unwrap();
        assert_eq!(reg.stats().frame_pipeline_changes, 1);
        assert_eq!(reg.stats().redundant_binds_avoided, 0);
        assert!(reg.global_state_dirty());

        reg.bind(p1).unwrap();
        assert_eq!(reg.stats().frame_pipeline_changes, 1);
        assert_eq!(reg.stats().redundant_binds_avoided, 1);

        reg.bind(p2).unwrap();
        assert_eq!(reg.stats().frame_pipeline_changes, 2);
        assert_eq!(reg.stats().redundant_binds_avoided, 1);
        assert!(reg.is_pipeline_bound(p2));
        assert!(!reg.is_pipeline_bound(p1));

        reg.update_global_state(&[0u8; 4]).unwrap();
        assert!(!reg.global_state_dirty());
        assert_eq!(reg.stats().total_global_applies, 1);
    }

    #[test]
    fn shutdown_destroys_every_slot_with_a_non_null_backend_handle() {
        let (mut reg, backend) = registry();
        let h1 = reg.create_graphics_pipeline(description("renderpass_world", Domain::World), "p1", &[]).unwrap();
        reg.create_graphics_pipeline(description("renderpass_world", Domain::World), "p2", &[]).unwrap();
        // Releasing logical state does not null the backend handle; shutdown
        // must still destroy it.
        reg.entries[h1.slot_index()].live = false;
        reg.shutdown();
        assert_eq!(backend.destroy_call_count(), 2);
    }
}
