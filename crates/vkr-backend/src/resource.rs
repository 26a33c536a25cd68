//! Descriptions and requests for the buffer/texture batch façade.

bitflags::bitflags! {
    pub struct BufferUsageFlags: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
        const INDIRECT = 1 << 6;
    }
}

bitflags::bitflags! {
    pub struct TextureUsageFlags: u32 {
        const SAMPLED = 1 << 0;
        const STORAGE = 1 << 1;
        const RENDER_TARGET = 1 << 2;
        const DEPTH_STENCIL = 1 << 3;
        const TRANSFER_DST = 1 << 4;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    R8Unorm,
    Rgba8Unorm,
    Rgba8Srgb,
    R32Float,
    Rgba16Float,
    D32Float,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferDescription {
    pub size: u64,
    pub usage: BufferUsageFlags,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureDescription {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub usage: TextureUsageFlags,
}

#[derive(Clone, Debug)]
pub struct BufferUpload {
    pub data: Vec<u8>,
    pub size: u64,
    pub offset: u64,
}

#[derive(Clone, Debug)]
pub struct BufferCreateRequest {
    pub description: BufferDescription,
    pub upload: Option<BufferUpload>,
}

#[derive(Clone, Debug)]
pub struct TextureCreateRequest {
    pub description: TextureDescription,
    pub payload: Vec<u8>,
}
