use std::sync::Arc;

use crate::backend::metal::MetalApi;
use crate::host::native::NativeError;
use crate::host::NativeHandle;

use super::gpu::{ObjectKind, SoftGpu};

/// Metal over the software GPU. Command buffers execute at commit.
pub struct SoftMetal {
    gpu: Arc<SoftGpu>,
}

impl SoftMetal {
    pub fn new(gpu: Arc<SoftGpu>) -> Self {
        Self { gpu }
    }
}

impl MetalApi for SoftMetal {
    fn new_command_queue(&self, device: NativeHandle) -> Result<NativeHandle, NativeError> {
        self.gpu.check("newCommandQueue")?;
        if device.raw() != SoftGpu::DEVICE {
            return Err(NativeError::other("newCommandQueue", -1));
        }
        Ok(self.gpu.create_object(ObjectKind::Queue, None))
    }

    fn command_buffer(&self, queue: NativeHandle) -> Result<NativeHandle, NativeError> {
        self.gpu.check("commandBuffer")?;
        if self.gpu.kind_of(queue) != Some(ObjectKind::Queue) {
            return Err(NativeError::other("commandBuffer", -1));
        }
        let buffer = self.gpu.create_object(ObjectKind::CommandBuffer, None);
        self.gpu.begin_recording(buffer);
        Ok(buffer)
    }

    fn commit(&self, buffer: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("commit")?;
        self.gpu.end_recording(buffer);
        self.gpu.submit(buffer);
        Ok(())
    }

    fn wait_until_completed(&self, buffer: NativeHandle) -> Result<(), NativeError> {
        self.gpu.note_wait();
        if !self.gpu.is_committed(buffer) {
            self.gpu.report(format!("wait on uncommitted command buffer {}", buffer.raw()));
        }
        Ok(())
    }

    fn release(&self, object: NativeHandle) {
        self.gpu.destroy_object(object);
    }
}
