//! Resource states and the synchronization data derived from them.
//!
//! A texture's [`ResourceState`] describes how the GPU last used it. A
//! barrier from one state to another needs three things, all derived here:
//!
//! | From | To | Via |
//! |------|----|-----|
//! | [`ResourceState`] | [`AccessFlags`] | [`ResourceState::access_flags`] |
//! | [`ResourceState`] | [`ImageLayout`] | [`ResourceState::image_layout`] |
//! | [`AccessFlags`] + [`QueueType`] | [`PipelineStages`] | [`AccessFlags::pipeline_stages`] |
//!
//! The backend converts these API-neutral values to native enums.

use bitflags::bitflags;

bitflags! {
    /// How a resource is currently used by the GPU.
    ///
    /// The empty set is the undefined state of a freshly created texture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceState: u32 {
        const VERTEX_AND_CONSTANT_BUFFER = 0x1;
        const INDEX_BUFFER = 0x2;
        const RENDER_TARGET = 0x4;
        const UNORDERED_ACCESS = 0x8;
        const DEPTH_WRITE = 0x10;
        const DEPTH_READ = 0x20;
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        const PIXEL_SHADER_RESOURCE = 0x80;
        const SHADER_RESOURCE = 0x40 | 0x80;
        const STREAM_OUT = 0x100;
        const INDIRECT_ARGUMENT = 0x200;
        const COPY_DEST = 0x400;
        const COPY_SOURCE = 0x800;
        const GENERIC_READ = 0x1 | 0x2 | 0x40 | 0x80 | 0x200 | 0x800;
        const PRESENT = 0x1000;
        const COMMON = 0x2000;
        const RAYTRACING_ACCELERATION_STRUCTURE = 0x4000;
        const SHADING_RATE_SOURCE = 0x8000;
    }
}

impl ResourceState {
    pub const UNDEFINED: Self = Self::empty();

    /// Readable name for logs and debug overlays.
    ///
    /// Combined states report the first matching name.
    pub fn name(self) -> &'static str {
        const NAMES: &[(ResourceState, &str)] = &[
            (ResourceState::GENERIC_READ, "Generic Read"),
            (ResourceState::SHADER_RESOURCE, "Shader Resource"),
            (ResourceState::VERTEX_AND_CONSTANT_BUFFER, "Vertex And Constant"),
            (ResourceState::INDEX_BUFFER, "Index Buffer"),
            (ResourceState::RENDER_TARGET, "Render Target"),
            (ResourceState::UNORDERED_ACCESS, "UAV"),
            (ResourceState::DEPTH_WRITE, "Depth Write"),
            (ResourceState::DEPTH_READ, "Depth Read"),
            (ResourceState::NON_PIXEL_SHADER_RESOURCE, "Non Pixel Shader Resource"),
            (ResourceState::PIXEL_SHADER_RESOURCE, "Pixel Shader Resource"),
            (ResourceState::STREAM_OUT, "Stream Out"),
            (ResourceState::INDIRECT_ARGUMENT, "Indirect Argument"),
            (ResourceState::COPY_DEST, "Copy Dest"),
            (ResourceState::COPY_SOURCE, "Copy Source"),
            (ResourceState::PRESENT, "Present"),
            (ResourceState::COMMON, "Common"),
            (ResourceState::RAYTRACING_ACCELERATION_STRUCTURE, "Raytracing"),
            (ResourceState::SHADING_RATE_SOURCE, "Shading Rate"),
        ];
        if self.is_empty() {
            return "Undefined";
        }
        NAMES
            .iter()
            .find(|(state, _)| self.contains(*state))
            .map_or("Unknown", |(_, name)| name)
    }

    /// Memory accesses implied by this state.
    pub fn access_flags(self) -> AccessFlags {
        let mut flags = AccessFlags::empty();
        if self.contains(Self::COPY_SOURCE) {
            flags |= AccessFlags::TRANSFER_READ;
        }
        if self.contains(Self::COPY_DEST) {
            flags |= AccessFlags::TRANSFER_WRITE;
        }
        if self.contains(Self::VERTEX_AND_CONSTANT_BUFFER) {
            flags |= AccessFlags::UNIFORM_READ | AccessFlags::VERTEX_ATTRIBUTE_READ;
        }
        if self.contains(Self::INDEX_BUFFER) {
            flags |= AccessFlags::INDEX_READ;
        }
        if self.contains(Self::UNORDERED_ACCESS) {
            flags |= AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE;
        }
        if self.contains(Self::INDIRECT_ARGUMENT) {
            flags |= AccessFlags::INDIRECT_COMMAND_READ;
        }
        if self.contains(Self::RENDER_TARGET) {
            flags |= AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE;
        }
        if self.contains(Self::DEPTH_WRITE) {
            flags |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        }
        if self.contains(Self::DEPTH_READ) {
            flags |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;
        }
        if self.intersects(Self::SHADER_RESOURCE) {
            flags |= AccessFlags::SHADER_READ;
        }
        if self.contains(Self::RAYTRACING_ACCELERATION_STRUCTURE) {
            flags |= AccessFlags::ACCELERATION_STRUCTURE_READ
                | AccessFlags::ACCELERATION_STRUCTURE_WRITE;
        }
        flags
    }

    /// Image layout a texture must be in to be used in this state.
    pub fn image_layout(self) -> ImageLayout {
        if self.contains(Self::COPY_SOURCE) {
            ImageLayout::TransferSrc
        } else if self.contains(Self::COPY_DEST) {
            ImageLayout::TransferDst
        } else if self.contains(Self::RENDER_TARGET) {
            ImageLayout::ColorAttachment
        } else if self.contains(Self::DEPTH_WRITE) {
            ImageLayout::DepthStencilAttachment
        } else if self.contains(Self::DEPTH_READ) {
            ImageLayout::DepthStencilReadOnly
        } else if self.contains(Self::UNORDERED_ACCESS) {
            ImageLayout::General
        } else if self.intersects(Self::SHADER_RESOURCE) {
            ImageLayout::ShaderReadOnly
        } else if self.contains(Self::PRESENT) {
            ImageLayout::PresentSrc
        } else if self.contains(Self::COMMON) {
            ImageLayout::General
        } else {
            ImageLayout::Undefined
        }
    }
}

bitflags! {
    /// API-neutral memory access mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const INDIRECT_COMMAND_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        const UNIFORM_READ = 1 << 3;
        const INPUT_ATTACHMENT_READ = 1 << 4;
        const SHADER_READ = 1 << 5;
        const SHADER_WRITE = 1 << 6;
        const COLOR_ATTACHMENT_READ = 1 << 7;
        const COLOR_ATTACHMENT_WRITE = 1 << 8;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 9;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 10;
        const TRANSFER_READ = 1 << 11;
        const TRANSFER_WRITE = 1 << 12;
        const HOST_READ = 1 << 13;
        const HOST_WRITE = 1 << 14;
        const ACCELERATION_STRUCTURE_READ = 1 << 15;
        const ACCELERATION_STRUCTURE_WRITE = 1 << 16;
    }
}

bitflags! {
    /// API-neutral pipeline stage mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const DRAW_INDIRECT = 1 << 1;
        const VERTEX_INPUT = 1 << 2;
        const VERTEX_SHADER = 1 << 3;
        const FRAGMENT_SHADER = 1 << 4;
        const EARLY_FRAGMENT_TESTS = 1 << 5;
        const LATE_FRAGMENT_TESTS = 1 << 6;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 7;
        const COMPUTE_SHADER = 1 << 8;
        const TRANSFER = 1 << 9;
        const HOST = 1 << 10;
        const ALL_COMMANDS = 1 << 11;
    }
}

/// Queue a command buffer is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueType {
    #[default]
    Graphics,
    Compute,
    Transfer,
}

impl AccessFlags {
    /// Pipeline stages that perform these accesses on the given queue.
    ///
    /// Accesses a queue cannot perform itself (attachment writes on a
    /// compute queue, anything on a transfer queue) synchronize against all
    /// commands. Returns [`PipelineStages::TOP_OF_PIPE`] when nothing else
    /// applies.
    pub fn pipeline_stages(self, queue: QueueType) -> PipelineStages {
        let shader_access = Self::UNIFORM_READ | Self::SHADER_READ | Self::SHADER_WRITE;
        let graphics_only = Self::INDEX_READ
            | Self::VERTEX_ATTRIBUTE_READ
            | Self::INPUT_ATTACHMENT_READ
            | Self::COLOR_ATTACHMENT_READ
            | Self::COLOR_ATTACHMENT_WRITE
            | Self::DEPTH_STENCIL_ATTACHMENT_READ
            | Self::DEPTH_STENCIL_ATTACHMENT_WRITE;

        let mut stages = PipelineStages::empty();
        match queue {
            QueueType::Graphics => {
                if self.intersects(Self::INDEX_READ | Self::VERTEX_ATTRIBUTE_READ) {
                    stages |= PipelineStages::VERTEX_INPUT;
                }
                if self.intersects(shader_access) {
                    stages |= PipelineStages::VERTEX_SHADER
                        | PipelineStages::FRAGMENT_SHADER
                        | PipelineStages::COMPUTE_SHADER;
                }
                if self.contains(Self::INPUT_ATTACHMENT_READ) {
                    stages |= PipelineStages::FRAGMENT_SHADER;
                }
                if self.intersects(Self::COLOR_ATTACHMENT_READ | Self::COLOR_ATTACHMENT_WRITE) {
                    stages |= PipelineStages::COLOR_ATTACHMENT_OUTPUT;
                }
                if self.intersects(
                    Self::DEPTH_STENCIL_ATTACHMENT_READ | Self::DEPTH_STENCIL_ATTACHMENT_WRITE,
                ) {
                    stages |=
                        PipelineStages::EARLY_FRAGMENT_TESTS | PipelineStages::LATE_FRAGMENT_TESTS;
                }
            }
            QueueType::Compute => {
                if self.intersects(graphics_only) {
                    return PipelineStages::ALL_COMMANDS;
                }
                if self.intersects(shader_access) {
                    stages |= PipelineStages::COMPUTE_SHADER;
                }
            }
            QueueType::Transfer => return PipelineStages::ALL_COMMANDS,
        }

        if self.contains(Self::INDIRECT_COMMAND_READ) {
            stages |= PipelineStages::DRAW_INDIRECT;
        }
        if self.intersects(Self::TRANSFER_READ | Self::TRANSFER_WRITE) {
            stages |= PipelineStages::TRANSFER;
        }
        if self.intersects(Self::HOST_READ | Self::HOST_WRITE) {
            stages |= PipelineStages::HOST;
        }
        if stages.is_empty() {
            stages = PipelineStages::TOP_OF_PIPE;
        }
        stages
    }
}

/// Image memory layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    #[default]
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    PresentSrc,
}
