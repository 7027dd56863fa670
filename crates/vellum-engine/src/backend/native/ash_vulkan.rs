use std::sync::Arc;

use ash::vk::{self, Handle};

use crate::backend::{BackendError, VulkanLoader};
use crate::host::native::{NativeError, NativeErrorKind, VulkanApi, VulkanFeatures};
use crate::host::NativeHandle;

fn native_error(call: &'static str, result: vk::Result) -> NativeError {
    let kind = match result {
        vk::Result::ERROR_DEVICE_LOST => NativeErrorKind::DeviceLost,
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            NativeErrorKind::OutOfMemory
        }
        other => NativeErrorKind::Other(i64::from(other.as_raw())),
    };
    NativeError::new(call, kind)
}

fn handle<H: Handle>(call: &'static str, h: H) -> Result<NativeHandle, NativeError> {
    NativeHandle::new(h.as_raw()).ok_or(NativeError::other(call, 0))
}

/// Loads the Vulkan loader library and binds instance and device function
/// tables to the host's handles.
pub struct AshVulkanLoader {
    entry: ash::Entry,
}

impl AshVulkanLoader {
    pub fn new() -> Result<Self, BackendError> {
        // SAFETY: the loader library is only used through `entry`, which
        // keeps it loaded.
        let entry = unsafe { ash::Entry::load() }.map_err(|e| BackendError::LoaderUnavailable(e.to_string()))?;
        Ok(Self { entry })
    }
}

impl VulkanLoader for AshVulkanLoader {
    fn load(
        &self,
        instance: NativeHandle,
        physical_device: NativeHandle,
        device: NativeHandle,
    ) -> Result<Arc<dyn VulkanApi>, BackendError> {
        // SAFETY: the host owns these handles and keeps them alive for as
        // long as the backend is initialized.
        let (instance, device) = unsafe {
            let instance = ash::Instance::load(self.entry.static_fn(), vk::Instance::from_raw(instance.raw()));
            let device = ash::Device::load(instance.fp_v1_0(), vk::Device::from_raw(device.raw()));
            (instance, device)
        };
        log::debug!("vulkan: function tables loaded");
        Ok(Arc::new(AshVulkanApi {
            instance,
            physical_device: vk::PhysicalDevice::from_raw(physical_device.raw()),
            device,
        }))
    }
}

struct AshVulkanApi {
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
}

// Every call below operates on handles created through this device, or on
// the host's instance and device, which outlive the backend.
impl VulkanApi for AshVulkanApi {
    fn physical_device_features(&self) -> VulkanFeatures {
        let f = unsafe { self.instance.get_physical_device_features(self.physical_device) };
        VulkanFeatures {
            independent_blend: f.independent_blend == vk::TRUE,
            fill_mode_non_solid: f.fill_mode_non_solid == vk::TRUE,
            fragment_stores_and_atomics: f.fragment_stores_and_atomics == vk::TRUE,
            shader_clip_distance: f.shader_clip_distance == vk::TRUE,
        }
    }

    fn graphics_queue_family(&self) -> Option<u32> {
        let families = unsafe {
            self.instance
                .get_physical_device_queue_family_properties(self.physical_device)
        };
        families
            .iter()
            .position(|p| p.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .and_then(|i| u32::try_from(i).ok())
    }

    fn device_queue(&self, family: u32) -> Option<NativeHandle> {
        let queue = unsafe { self.device.get_device_queue(family, 0) };
        NativeHandle::new(queue.as_raw())
    }

    fn create_command_pool(&self, family: u32) -> Result<NativeHandle, NativeError> {
        let info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { self.device.create_command_pool(&info, None) }
            .map_err(|e| native_error("vkCreateCommandPool", e))?;
        handle("vkCreateCommandPool", pool)
    }

    fn allocate_command_buffers(&self, pool: NativeHandle, count: u32) -> Result<Vec<NativeHandle>, NativeError> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(vk::CommandPool::from_raw(pool.raw()))
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        let buffers = unsafe { self.device.allocate_command_buffers(&info) }
            .map_err(|e| native_error("vkAllocateCommandBuffers", e))?;
        buffers
            .into_iter()
            .map(|b| handle("vkAllocateCommandBuffers", b))
            .collect()
    }

    fn create_fence(&self) -> Result<NativeHandle, NativeError> {
        let fence = unsafe { self.device.create_fence(&vk::FenceCreateInfo::default(), None) }
            .map_err(|e| native_error("vkCreateFence", e))?;
        handle("vkCreateFence", fence)
    }

    fn wait_for_fence(&self, fence: NativeHandle) -> Result<(), NativeError> {
        let fences = [vk::Fence::from_raw(fence.raw())];
        unsafe { self.device.wait_for_fences(&fences, true, u64::MAX) }
            .map_err(|e| native_error("vkWaitForFences", e))
    }

    fn reset_fence(&self, fence: NativeHandle) -> Result<(), NativeError> {
        let fences = [vk::Fence::from_raw(fence.raw())];
        unsafe { self.device.reset_fences(&fences) }.map_err(|e| native_error("vkResetFences", e))
    }

    fn begin_command_buffer(&self, buffer: NativeHandle) -> Result<(), NativeError> {
        let info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device
                .begin_command_buffer(vk::CommandBuffer::from_raw(buffer.raw()), &info)
        }
        .map_err(|e| native_error("vkBeginCommandBuffer", e))
    }

    fn end_command_buffer(&self, buffer: NativeHandle) -> Result<(), NativeError> {
        unsafe { self.device.end_command_buffer(vk::CommandBuffer::from_raw(buffer.raw())) }
            .map_err(|e| native_error("vkEndCommandBuffer", e))
    }

    fn queue_submit(&self, queue: NativeHandle, buffer: NativeHandle, fence: NativeHandle) -> Result<(), NativeError> {
        let buffers = [vk::CommandBuffer::from_raw(buffer.raw())];
        let submit = vk::SubmitInfo::default().command_buffers(&buffers);
        unsafe {
            self.device.queue_submit(
                vk::Queue::from_raw(queue.raw()),
                std::slice::from_ref(&submit),
                vk::Fence::from_raw(fence.raw()),
            )
        }
        .map_err(|e| native_error("vkQueueSubmit", e))
    }

    fn queue_wait_idle(&self, queue: NativeHandle) -> Result<(), NativeError> {
        unsafe { self.device.queue_wait_idle(vk::Queue::from_raw(queue.raw())) }
            .map_err(|e| native_error("vkQueueWaitIdle", e))
    }

    fn destroy_fence(&self, fence: NativeHandle) {
        unsafe { self.device.destroy_fence(vk::Fence::from_raw(fence.raw()), None) };
    }

    fn destroy_command_pool(&self, pool: NativeHandle) {
        unsafe {
            self.device
                .destroy_command_pool(vk::CommandPool::from_raw(pool.raw()), None)
        };
    }
}
