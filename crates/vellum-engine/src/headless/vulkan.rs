use std::sync::Arc;

use crate::backend::{BackendError, VulkanLoader};
use crate::host::native::{NativeError, VulkanApi, VulkanFeatures};
use crate::host::NativeHandle;

use super::gpu::{ObjectKind, SoftGpu};

/// Vulkan loader over the software GPU. Only resolves the headless host's own
/// instance and device.
pub struct SoftVulkan {
    gpu: Arc<SoftGpu>,
}

impl SoftVulkan {
    pub fn new(gpu: Arc<SoftGpu>) -> Self {
        Self { gpu }
    }
}

impl VulkanLoader for SoftVulkan {
    fn load(
        &self,
        instance: NativeHandle,
        physical_device: NativeHandle,
        device: NativeHandle,
    ) -> Result<Arc<dyn VulkanApi>, BackendError> {
        let expected = (SoftGpu::INSTANCE, SoftGpu::PHYSICAL_DEVICE, SoftGpu::DEVICE);
        if (instance.raw(), physical_device.raw(), device.raw()) != expected {
            return Err(BackendError::LoaderUnavailable("handles do not belong to the software device".into()));
        }
        Ok(Arc::new(SoftVulkanDevice { gpu: self.gpu.clone() }))
    }
}

/// Vulkan device-level calls. Command buffers are children of their pool.
pub struct SoftVulkanDevice {
    gpu: Arc<SoftGpu>,
}

impl VulkanApi for SoftVulkanDevice {
    fn physical_device_features(&self) -> VulkanFeatures {
        VulkanFeatures {
            independent_blend: true,
            fill_mode_non_solid: true,
            fragment_stores_and_atomics: true,
            shader_clip_distance: true,
        }
    }

    fn graphics_queue_family(&self) -> Option<u32> {
        Some(0)
    }

    fn device_queue(&self, family: u32) -> Option<NativeHandle> {
        (family == 0).then(|| SoftGpu::handle(SoftGpu::GRAPHICS_QUEUE))
    }

    fn create_command_pool(&self, _family: u32) -> Result<NativeHandle, NativeError> {
        self.gpu.check("vkCreateCommandPool")?;
        Ok(self.gpu.create_object(ObjectKind::CommandPool, None))
    }

    fn allocate_command_buffers(&self, pool: NativeHandle, count: u32) -> Result<Vec<NativeHandle>, NativeError> {
        self.gpu.check("vkAllocateCommandBuffers")?;
        if self.gpu.kind_of(pool) != Some(ObjectKind::CommandPool) {
            return Err(NativeError::other("vkAllocateCommandBuffers", -2));
        }
        Ok((0..count)
            .map(|_| self.gpu.create_object(ObjectKind::CommandBuffer, Some(pool)))
            .collect())
    }

    fn create_fence(&self) -> Result<NativeHandle, NativeError> {
        self.gpu.check("vkCreateFence")?;
        Ok(self.gpu.create_object(ObjectKind::Fence, None))
    }

    fn wait_for_fence(&self, fence: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("vkWaitForFences")?;
        self.gpu.wait(fence, 1);
        Ok(())
    }

    fn reset_fence(&self, fence: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("vkResetFences")?;
        self.gpu.reset_fence(fence);
        Ok(())
    }

    fn begin_command_buffer(&self, buffer: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("vkBeginCommandBuffer")?;
        self.gpu.begin_recording(buffer);
        Ok(())
    }

    fn end_command_buffer(&self, buffer: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("vkEndCommandBuffer")?;
        self.gpu.end_recording(buffer);
        Ok(())
    }

    fn queue_submit(&self, _queue: NativeHandle, buffer: NativeHandle, fence: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("vkQueueSubmit")?;
        self.gpu.submit(buffer);
        self.gpu.signal(fence, 1);
        Ok(())
    }

    fn queue_wait_idle(&self, _queue: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("vkQueueWaitIdle")
    }

    fn destroy_fence(&self, fence: NativeHandle) {
        self.gpu.destroy_object(fence);
    }

    fn destroy_command_pool(&self, pool: NativeHandle) {
        self.gpu.destroy_object(pool);
    }
}
