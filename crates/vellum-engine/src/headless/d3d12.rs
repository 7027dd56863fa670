use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::d3d12::{D3D12Api, ResourceDesc, ResourceState};
use crate::host::native::{DxgiFormat, NativeError};
use crate::host::NativeHandle;

use super::gpu::{GpuOp, ObjectKind, SoftGpu};

/// PCI vendor id reported unless a test overrides it.
const DEFAULT_VENDOR_ID: u32 = 0x10DE;

/// D3D12 over the software GPU.
///
/// Every created object holds one reference; `release` destroys it.
pub struct SoftD3D12 {
    gpu: Arc<SoftGpu>,
    vendor_id: Mutex<u32>,
}

impl SoftD3D12 {
    pub fn new(gpu: Arc<SoftGpu>) -> Self {
        Self { gpu, vendor_id: Mutex::new(DEFAULT_VENDOR_ID) }
    }

    pub fn set_vendor_id(&self, vendor_id: u32) {
        *self.vendor_id.lock() = vendor_id;
    }
}

impl D3D12Api for SoftD3D12 {
    fn adapter_vendor_id(&self, device: NativeHandle) -> Option<u32> {
        (device.raw() == SoftGpu::DEVICE).then(|| *self.vendor_id.lock())
    }

    fn create_command_queue(&self, _device: NativeHandle) -> Result<NativeHandle, NativeError> {
        self.gpu.check("CreateCommandQueue")?;
        Ok(self.gpu.create_object(ObjectKind::Queue, None))
    }

    fn create_command_allocator(&self, _device: NativeHandle) -> Result<NativeHandle, NativeError> {
        self.gpu.check("CreateCommandAllocator")?;
        Ok(self.gpu.create_object(ObjectKind::CommandAllocator, None))
    }

    fn create_command_list(&self, _device: NativeHandle, allocator: NativeHandle) -> Result<NativeHandle, NativeError> {
        self.gpu.check("CreateCommandList")?;
        if self.gpu.kind_of(allocator) != Some(ObjectKind::CommandAllocator) {
            return Err(NativeError::other("CreateCommandList", 0x8007_0057));
        }
        let list = self.gpu.create_object(ObjectKind::CommandList, None);
        self.gpu.begin_recording(list);
        Ok(list)
    }

    fn close_command_list(&self, list: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("Close")?;
        self.gpu.end_recording(list);
        Ok(())
    }

    fn reset_command_allocator(&self, _allocator: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("ID3D12CommandAllocator::Reset")
    }

    fn reset_command_list(&self, list: NativeHandle, _allocator: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("ID3D12GraphicsCommandList::Reset")?;
        self.gpu.begin_recording(list);
        Ok(())
    }

    fn execute_command_list(&self, _queue: NativeHandle, list: NativeHandle) {
        self.gpu.submit(list);
    }

    fn create_fence(&self, _device: NativeHandle, initial_value: u64) -> Result<NativeHandle, NativeError> {
        self.gpu.check("CreateFence")?;
        let fence = self.gpu.create_object(ObjectKind::Fence, None);
        if initial_value > 0 {
            self.gpu.signal(fence, initial_value);
        }
        Ok(fence)
    }

    fn signal(&self, _queue: NativeHandle, fence: NativeHandle, value: u64) -> Result<(), NativeError> {
        self.gpu.check("Signal")?;
        self.gpu.signal(fence, value);
        Ok(())
    }

    fn completed_value(&self, fence: NativeHandle) -> u64 {
        self.gpu.completed_value(fence)
    }

    fn wait_for_value(&self, fence: NativeHandle, value: u64) -> Result<(), NativeError> {
        self.gpu.check("SetEventOnCompletion")?;
        self.gpu.wait(fence, value);
        Ok(())
    }

    fn resource_desc(&self, resource: NativeHandle) -> Option<ResourceDesc> {
        let texture = self.gpu.texture(resource)?;
        Some(ResourceDesc {
            width: u64::from(texture.width),
            height: texture.height,
            format: texture.format,
        })
    }

    fn create_committed_texture(
        &self,
        _device: NativeHandle,
        width: u32,
        height: u32,
        format: DxgiFormat,
        initial_state: ResourceState,
    ) -> Result<NativeHandle, NativeError> {
        self.gpu.check("CreateCommittedResource")?;
        Ok(self.gpu.create_texture(width, height, format, initial_state, None))
    }

    fn resource_barrier(&self, list: NativeHandle, resource: NativeHandle, before: ResourceState, after: ResourceState) {
        self.gpu.record(list, GpuOp::Barrier { resource, before, after });
    }

    fn copy_resource(&self, list: NativeHandle, dst: NativeHandle, src: NativeHandle) {
        self.gpu.record(list, GpuOp::Copy { dst, src });
    }

    fn release(&self, object: NativeHandle) {
        self.gpu.destroy_object(object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> NativeHandle {
        SoftGpu::handle(SoftGpu::DEVICE)
    }

    #[test]
    fn lists_are_created_open() {
        let gpu = Arc::new(SoftGpu::new());
        let api = SoftD3D12::new(gpu.clone());
        let allocator = api.create_command_allocator(device()).unwrap();
        let list = api.create_command_list(device(), allocator).unwrap();
        api.close_command_list(list).unwrap();
        api.close_command_list(list).unwrap();
        assert_eq!(gpu.validation_errors().len(), 1);
    }

    #[test]
    fn vendor_id_only_for_known_device() {
        let api = SoftD3D12::new(Arc::new(SoftGpu::new()));
        api.set_vendor_id(0x8086);
        assert_eq!(api.adapter_vendor_id(device()), Some(0x8086));
        assert_eq!(api.adapter_vendor_id(SoftGpu::handle(0x999)), None);
    }

    #[test]
    fn resource_desc_reports_creation_format() {
        let api = SoftD3D12::new(Arc::new(SoftGpu::new()));
        let texture = api
            .create_committed_texture(device(), 8, 4, DxgiFormat::B8G8R8A8_UNORM, ResourceState::Common)
            .unwrap();
        assert_eq!(
            api.resource_desc(texture),
            Some(ResourceDesc { width: 8, height: 4, format: DxgiFormat::B8G8R8A8_UNORM })
        );
    }
}
