//! GPU buffer record.

use crate::backend::NativeBuffer;
use crate::types::{BufferDescriptor, BufferUsage};

/// A buffer living in the device's buffer pool.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub(crate) descriptor: BufferDescriptor,
    pub(crate) buffer: NativeBuffer,
}

impl Buffer {
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.descriptor.usage
    }

    pub fn native(&self) -> NativeBuffer {
        self.buffer
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}
