//! Pipeline-facing backend types: domains, descriptions and the reflection
//! output the registry reads back.
//!
//! Shader compilation and reflection themselves are out of scope here;
//! only the shape of what the registry consumes from them is modeled.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    World,
    WorldTransparent,
    Ui,
    Shadow,
    Post,
    Compute,
    Skybox,
    Picking,
}

pub const DOMAIN_COUNT: usize = 8;

impl Domain {
    /// Dense index for per-domain arrays, in the order the variants are
    /// declared.
    pub fn index(self) -> usize {
        match self {
            Domain::World => 0,
            Domain::WorldTransparent => 1,
            Domain::Ui => 2,
            Domain::Shadow => 3,
            Domain::Post => 4,
            Domain::Compute => 5,
            Domain::Skybox => 6,
            Domain::Picking => 7,
        }
    }

    /// The alias name the registry's resolution path falls back to when a
    /// material names a shader that isn't registered.
    pub fn alias_name(self) -> String {
        format!("p_{}", self.short_name())
    }

    fn short_name(self) -> &'static str {
        match self {
            Domain::World => "world",
            Domain::WorldTransparent => "world_transparent",
            Domain::Ui => "ui",
            Domain::Shadow => "shadow",
            Domain::Post => "post",
            Domain::Compute => "compute",
            Domain::Skybox => "skybox",
            Domain::Picking => "picking",
        }
    }

    /// The built-in renderpass alias used when a shader config does not name
    /// one explicitly.
    pub fn builtin_renderpass_name(self) -> &'static str {
        match self {
            Domain::World | Domain::WorldTransparent => "renderpass_world",
            Domain::Ui => "renderpass_ui",
            Domain::Shadow => "renderpass_shadow",
            Domain::Post => "renderpass_post",
            Domain::Compute => "renderpass_compute",
            Domain::Skybox => "renderpass_world",
            Domain::Picking => "renderpass_picking",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderModuleConfig {
    pub source_path: String,
    pub entry_point: String,
}

/// The subset of a shader config the registry needs to resolve module
/// stages before it can call the backend. `vertex`/`fragment` are
/// required; the rest are optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderStageConfig {
    pub vertex: Option<ShaderModuleConfig>,
    pub fragment: Option<ShaderModuleConfig>,
    pub geometry: Option<ShaderModuleConfig>,
    pub tess_control: Option<ShaderModuleConfig>,
    pub tess_eval: Option<ShaderModuleConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphicsPipelineDescription {
    pub stages: ShaderStageConfig,
    pub renderpass: String,
    pub domain: Domain,
}

/// ABI sizes/strides read back from shader reflection after pipeline
/// creation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderRuntimeLayout {
    pub global_ubo_size: u32,
    pub global_ubo_stride: u32,
    pub instance_ubo_size: u32,
    pub instance_ubo_stride: u32,
    pub push_constant_size: u32,
    pub texture_count: u32,
}
