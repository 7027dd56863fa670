use std::collections::HashMap;

use parking_lot::Mutex;

use crate::backend::d3d12::ResourceState;
use crate::host::native::{DxgiFormat, NativeError};
use crate::host::NativeHandle;

/// Kinds of objects the software GPU tracks for leak checks.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ObjectKind {
    Queue,
    CommandPool,
    CommandBuffer,
    CommandAllocator,
    CommandList,
    Fence,
    Sync,
    Texture,
    Framebuffer,
}

/// Executed GPU work, in execution order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GpuOpTrace {
    Barrier { resource: NativeHandle, before: ResourceState, after: ResourceState },
    Copy { dst: NativeHandle, src: NativeHandle },
    Raster { target: NativeHandle },
    Marker,
}

/// A recorded command.
#[derive(Debug, Clone)]
pub enum GpuOp {
    Barrier { resource: NativeHandle, before: ResourceState, after: ResourceState },
    Copy { dst: NativeHandle, src: NativeHandle },
    /// Replaces the target's texels with straight RGBA rows, top to bottom in
    /// storage order.
    Raster { target: NativeHandle, width: u32, height: u32, rgba: Vec<u8> },
    Marker,
}

impl GpuOp {
    fn trace(&self) -> GpuOpTrace {
        match *self {
            GpuOp::Barrier { resource, before, after } => GpuOpTrace::Barrier { resource, before, after },
            GpuOp::Copy { dst, src } => GpuOpTrace::Copy { dst, src },
            GpuOp::Raster { target, .. } => GpuOpTrace::Raster { target },
            GpuOp::Marker => GpuOpTrace::Marker,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct GpuStats {
    pub submits: u64,
    pub fence_waits: u64,
    pub executed_ops: u64,
}

/// Texels are straight RGBA in storage row order whatever the format's
/// channel order.
#[derive(Debug, Clone)]
pub struct SoftTexture {
    pub width: u32,
    pub height: u32,
    pub format: DxgiFormat,
    pub state: ResourceState,
    pub rgba: Vec<u8>,
}

impl SoftTexture {
    fn family(&self) -> DxgiFormat {
        self.format.concrete_alias().unwrap_or(self.format)
    }
}

struct Object {
    kind: ObjectKind,
    parent: Option<u64>,
}

#[derive(Default)]
struct Recording {
    open: bool,
    committed: bool,
    ops: Vec<GpuOp>,
}

#[derive(Default)]
struct Fence {
    completed: u64,
    pending: u64,
}

struct GpuState {
    next_handle: u64,
    objects: HashMap<u64, Object>,
    textures: HashMap<u64, SoftTexture>,
    recordings: HashMap<u64, Recording>,
    fences: HashMap<u64, Fence>,
    // call name -> calls that still succeed
    failures: HashMap<&'static str, u32>,
    device_lost: bool,
    deferred_completion: bool,
    stats: GpuStats,
    validation: Vec<String>,
    trace: Vec<GpuOpTrace>,
}

impl GpuState {
    fn destroy(&mut self, raw: u64) -> bool {
        if self.objects.remove(&raw).is_none() {
            return false;
        }
        self.textures.remove(&raw);
        self.recordings.remove(&raw);
        self.fences.remove(&raw);
        let children: Vec<u64> = self
            .objects
            .iter()
            .filter(|(_, o)| o.parent == Some(raw))
            .map(|(h, _)| *h)
            .collect();
        for child in children {
            self.destroy(child);
        }
        true
    }

    fn execute(&mut self, op: GpuOp) {
        self.stats.executed_ops += 1;
        self.trace.push(op.trace());
        match op {
            GpuOp::Barrier { resource, before, after } => {
                let Some(texture) = self.textures.get_mut(&resource.raw()) else {
                    self.validation.push(format!("barrier on unknown resource {}", resource.raw()));
                    return;
                };
                if texture.state != before {
                    self.validation.push(format!(
                        "barrier on {} expects {before:?}, resource is in {:?}",
                        resource.raw(),
                        texture.state
                    ));
                }
                texture.state = after;
            }
            GpuOp::Copy { dst, src } => {
                let (Some(s), Some(d)) = (self.textures.get(&src.raw()), self.textures.get(&dst.raw())) else {
                    self.validation.push("copy between unknown resources".into());
                    return;
                };
                if s.state != ResourceState::CopySource || d.state != ResourceState::CopyDest {
                    self.validation.push(format!("copy in states {:?} -> {:?}", s.state, d.state));
                    return;
                }
                if (s.width, s.height) != (d.width, d.height) || s.family() != d.family() {
                    self.validation.push("copy between incompatible resources".into());
                    return;
                }
                let rgba = s.rgba.clone();
                if let Some(d) = self.textures.get_mut(&dst.raw()) {
                    d.rgba = rgba;
                }
            }
            GpuOp::Raster { target, width, height, rgba } => {
                let Some(texture) = self.textures.get_mut(&target.raw()) else {
                    self.validation.push(format!("raster into unknown texture {}", target.raw()));
                    return;
                };
                if texture.state != ResourceState::Common {
                    self.validation.push(format!("raster into texture in {:?}", texture.state));
                    return;
                }
                if texture.format.is_typeless() {
                    self.validation.push("raster into typeless texture".into());
                    return;
                }
                if (texture.width, texture.height) != (width, height) {
                    self.validation.push(format!(
                        "raster of {width}x{height} into {}x{} texture",
                        texture.width, texture.height
                    ));
                    return;
                }
                texture.rgba = rgba;
            }
            GpuOp::Marker => {}
        }
    }
}

/// Reverses the row order of a tightly packed RGBA image.
pub(crate) fn flip_rows(rgba: &[u8], width: u32) -> Vec<u8> {
    let stride = width as usize * 4;
    if stride == 0 {
        return rgba.to_vec();
    }
    rgba.chunks_exact(stride).rev().flatten().copied().collect()
}

/// Software GPU behind every headless native API.
///
/// Tracks object lifetimes, command recordings, fences and texture contents.
/// Work executes synchronously at submission; with deferred completion,
/// fences only reach signaled values once something waits on them.
pub struct SoftGpu {
    state: Mutex<GpuState>,
}

impl Default for SoftGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftGpu {
    /// First handle value handed out; lower values are fixed device-level handles.
    const FIRST_HANDLE: u64 = 0x100;

    pub const INSTANCE: u64 = 0x11;
    pub const PHYSICAL_DEVICE: u64 = 0x12;
    pub const DEVICE: u64 = 0x13;
    pub const GRAPHICS_QUEUE: u64 = 0x14;

    pub fn new() -> Self {
        Self {
            state: Mutex::new(GpuState {
                next_handle: Self::FIRST_HANDLE,
                objects: HashMap::new(),
                textures: HashMap::new(),
                recordings: HashMap::new(),
                fences: HashMap::new(),
                failures: HashMap::new(),
                device_lost: false,
                deferred_completion: false,
                stats: GpuStats::default(),
                validation: Vec::new(),
                trace: Vec::new(),
            }),
        }
    }

    pub fn handle(raw: u64) -> NativeHandle {
        NativeHandle::new(raw).unwrap_or_else(|| unreachable!("fixed handles are non-zero"))
    }

    // ── failure injection ─────────────────────────────────────────────────

    /// Lets `succeed` more calls named `call` through, then fails the next one.
    pub fn fail_after(&self, call: &'static str, succeed: u32) {
        self.state.lock().failures.insert(call, succeed);
    }

    /// Every fallible call fails with device lost from now on.
    pub fn lose_device(&self) {
        self.state.lock().device_lost = true;
    }

    /// Gate of every fallible native call.
    pub fn check(&self, call: &'static str) -> Result<(), NativeError> {
        let mut s = self.state.lock();
        if s.device_lost {
            return Err(NativeError::device_lost(call));
        }
        match s.failures.get_mut(call) {
            Some(0) => {
                s.failures.remove(call);
                Err(NativeError::other(call, -1))
            }
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    // ── objects ───────────────────────────────────────────────────────────

    pub fn create_object(&self, kind: ObjectKind, parent: Option<NativeHandle>) -> NativeHandle {
        let mut s = self.state.lock();
        let raw = s.next_handle;
        s.next_handle += 1;
        s.objects.insert(raw, Object { kind, parent: parent.map(NativeHandle::raw) });
        match kind {
            ObjectKind::CommandBuffer | ObjectKind::CommandList => {
                s.recordings.insert(raw, Recording::default());
            }
            ObjectKind::Fence | ObjectKind::Sync => {
                s.fences.insert(raw, Fence::default());
            }
            _ => {}
        }
        Self::handle(raw)
    }

    /// Destroys an object and everything created under it.
    pub fn destroy_object(&self, handle: NativeHandle) {
        let mut s = self.state.lock();
        if !s.destroy(handle.raw()) {
            s.validation.push(format!("release of unknown object {}", handle.raw()));
        }
    }

    pub fn is_live(&self, handle: NativeHandle) -> bool {
        self.state.lock().objects.contains_key(&handle.raw())
    }

    pub fn kind_of(&self, handle: NativeHandle) -> Option<ObjectKind> {
        self.state.lock().objects.get(&handle.raw()).map(|o| o.kind)
    }

    pub fn live_objects(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn live_objects_of(&self, kind: ObjectKind) -> usize {
        self.state.lock().objects.values().filter(|o| o.kind == kind).count()
    }

    // ── textures ──────────────────────────────────────────────────────────

    pub fn create_texture(
        &self,
        width: u32,
        height: u32,
        format: DxgiFormat,
        state: ResourceState,
        rgba: Option<Vec<u8>>,
    ) -> NativeHandle {
        let handle = self.create_object(ObjectKind::Texture, None);
        let rgba = rgba.unwrap_or_else(|| vec![0; width as usize * height as usize * 4]);
        self.state
            .lock()
            .textures
            .insert(handle.raw(), SoftTexture { width, height, format, state, rgba });
        handle
    }

    /// Replaces a texture's storage, as `glTexImage2D` does.
    pub fn define_texture(&self, handle: NativeHandle, width: u32, height: u32) {
        let mut s = self.state.lock();
        if !s.objects.contains_key(&handle.raw()) {
            s.validation.push(format!("storage for unknown texture {}", handle.raw()));
            return;
        }
        s.textures.insert(
            handle.raw(),
            SoftTexture {
                width,
                height,
                format: DxgiFormat::R8G8B8A8_UNORM,
                state: ResourceState::Common,
                rgba: vec![0; width as usize * height as usize * 4],
            },
        );
    }

    pub fn texture(&self, handle: NativeHandle) -> Option<SoftTexture> {
        self.state.lock().textures.get(&handle.raw()).cloned()
    }

    /// Copies texels between two textures of the same size, outside any
    /// command stream.
    pub fn blit(&self, dst: NativeHandle, src: NativeHandle) -> bool {
        let mut s = self.state.lock();
        let Some(rgba) = s.textures.get(&src.raw()).map(|t| (t.width, t.height, t.rgba.clone())) else {
            return false;
        };
        match s.textures.get_mut(&dst.raw()) {
            Some(d) if (d.width, d.height) == (rgba.0, rgba.1) => {
                d.rgba = rgba.2;
                true
            }
            _ => false,
        }
    }

    // ── command recording ─────────────────────────────────────────────────

    /// Opens a recording, discarding previous commands.
    pub fn begin_recording(&self, list: NativeHandle) {
        let mut s = self.state.lock();
        match s.recordings.get_mut(&list.raw()) {
            Some(r) if !r.open => *r = Recording { open: true, ..Recording::default() },
            Some(_) => s.validation.push(format!("begin on recording command stream {}", list.raw())),
            None => s.validation.push(format!("begin on unknown command stream {}", list.raw())),
        }
    }

    pub fn end_recording(&self, list: NativeHandle) {
        let mut s = self.state.lock();
        match s.recordings.get_mut(&list.raw()) {
            Some(r) if r.open => r.open = false,
            Some(_) => s.validation.push(format!("close of closed command stream {}", list.raw())),
            None => s.validation.push(format!("close of unknown command stream {}", list.raw())),
        }
    }

    pub fn record(&self, list: NativeHandle, op: GpuOp) {
        let mut s = self.state.lock();
        match s.recordings.get_mut(&list.raw()) {
            Some(r) if r.open => r.ops.push(op),
            Some(_) => s.validation.push(format!("recording into closed command stream {}", list.raw())),
            None => s.validation.push(format!("recording into unknown command stream {}", list.raw())),
        }
    }

    /// Executes a closed recording. Counts as one submission.
    pub fn submit(&self, list: NativeHandle) {
        let mut s = self.state.lock();
        s.stats.submits += 1;
        let ops = match s.recordings.get_mut(&list.raw()) {
            Some(r) if !r.open => {
                r.committed = true;
                std::mem::take(&mut r.ops)
            }
            Some(_) => {
                s.validation.push(format!("submission of open command stream {}", list.raw()));
                return;
            }
            None => {
                s.validation.push(format!("submission of unknown command stream {}", list.raw()));
                return;
            }
        };
        for op in ops {
            s.execute(op);
        }
    }

    pub fn is_committed(&self, list: NativeHandle) -> bool {
        self.state.lock().recordings.get(&list.raw()).is_some_and(|r| r.committed)
    }

    /// Executes one command immediately, as an API without command buffers does.
    pub fn execute_now(&self, op: GpuOp) {
        self.state.lock().execute(op);
    }

    // ── fences ────────────────────────────────────────────────────────────

    pub fn signal(&self, fence: NativeHandle, value: u64) {
        let mut s = self.state.lock();
        let deferred = s.deferred_completion;
        match s.fences.get_mut(&fence.raw()) {
            Some(f) if deferred => f.pending = f.pending.max(value),
            Some(f) => f.completed = f.completed.max(value),
            None => s.validation.push(format!("signal of unknown fence {}", fence.raw())),
        }
    }

    pub fn completed_value(&self, fence: NativeHandle) -> u64 {
        self.state.lock().fences.get(&fence.raw()).map_or(0, |f| f.completed)
    }

    /// Blocks until the fence reaches `value`. Waiting on a value nothing
    /// will signal is reported instead of hanging.
    pub fn wait(&self, fence: NativeHandle, value: u64) {
        let mut s = self.state.lock();
        s.stats.fence_waits += 1;
        let Some(f) = s.fences.get_mut(&fence.raw()) else {
            s.validation.push(format!("wait on unknown fence {}", fence.raw()));
            return;
        };
        if f.completed >= value {
            return;
        }
        if f.pending >= value {
            f.completed = value;
            return;
        }
        s.validation.push(format!("wait on fence {} for {value}, which is never signaled", fence.raw()));
    }

    pub fn reset_fence(&self, fence: NativeHandle) {
        if let Some(f) = self.state.lock().fences.get_mut(&fence.raw()) {
            *f = Fence::default();
        }
    }

    /// Holds signaled values back until a wait.
    pub fn set_deferred_completion(&self, deferred: bool) {
        self.state.lock().deferred_completion = deferred;
    }

    /// Counts a blocking wait that has nothing to wait for.
    pub fn note_wait(&self) {
        self.state.lock().stats.fence_waits += 1;
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn stats(&self) -> GpuStats {
        self.state.lock().stats
    }

    pub fn validation_errors(&self) -> Vec<String> {
        self.state.lock().validation.clone()
    }

    pub fn report(&self, message: String) {
        self.state.lock().validation.push(message);
    }

    pub fn trace(&self) -> Vec<GpuOpTrace> {
        self.state.lock().trace.clone()
    }

    pub fn clear_trace(&self) {
        self.state.lock().trace.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(gpu: &SoftGpu, format: DxgiFormat, state: ResourceState) -> NativeHandle {
        gpu.create_texture(2, 2, format, state, None)
    }

    // ── objects ───────────────────────────────────────────────────────────

    #[test]
    fn destroying_a_parent_destroys_children() {
        let gpu = SoftGpu::new();
        let pool = gpu.create_object(ObjectKind::CommandPool, None);
        gpu.create_object(ObjectKind::CommandBuffer, Some(pool));
        gpu.create_object(ObjectKind::CommandBuffer, Some(pool));
        assert_eq!(gpu.live_objects(), 3);
        gpu.destroy_object(pool);
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn double_release_is_a_validation_error() {
        let gpu = SoftGpu::new();
        let fence = gpu.create_object(ObjectKind::Fence, None);
        gpu.destroy_object(fence);
        gpu.destroy_object(fence);
        assert_eq!(gpu.validation_errors().len(), 1);
    }

    #[test]
    fn injected_failure_fires_once() {
        let gpu = SoftGpu::new();
        gpu.fail_after("vkCreateFence", 1);
        assert!(gpu.check("vkCreateFence").is_ok());
        assert!(gpu.check("vkCreateFence").is_err());
        assert!(gpu.check("vkCreateFence").is_ok());
    }

    // ── fences ────────────────────────────────────────────────────────────

    #[test]
    fn deferred_signal_completes_on_wait() {
        let gpu = SoftGpu::new();
        let fence = gpu.create_object(ObjectKind::Fence, None);
        gpu.set_deferred_completion(true);
        gpu.signal(fence, 3);
        assert_eq!(gpu.completed_value(fence), 0);
        gpu.wait(fence, 3);
        assert_eq!(gpu.completed_value(fence), 3);
        assert!(gpu.validation_errors().is_empty());
    }

    #[test]
    fn waiting_for_an_unsignaled_value_is_reported() {
        let gpu = SoftGpu::new();
        let fence = gpu.create_object(ObjectKind::Fence, None);
        gpu.wait(fence, 1);
        assert_eq!(gpu.validation_errors().len(), 1);
    }

    // ── execution ─────────────────────────────────────────────────────────

    #[test]
    fn raster_requires_common_concrete_target() {
        let gpu = SoftGpu::new();
        let typeless = texture(&gpu, DxgiFormat::R8G8B8A8_TYPELESS, ResourceState::Common);
        let shader_read = texture(&gpu, DxgiFormat::R8G8B8A8_UNORM, ResourceState::PixelShaderResource);
        for target in [typeless, shader_read] {
            gpu.execute_now(GpuOp::Raster { target, width: 2, height: 2, rgba: vec![255; 16] });
        }
        assert_eq!(gpu.validation_errors().len(), 2);
        assert!(gpu.texture(typeless).unwrap().rgba.iter().all(|b| *b == 0));
    }

    #[test]
    fn copy_checks_states_and_family() {
        let gpu = SoftGpu::new();
        let src = gpu.create_texture(2, 2, DxgiFormat::R8G8B8A8_UNORM, ResourceState::CopySource, Some(vec![9; 16]));
        let dst = texture(&gpu, DxgiFormat::R8G8B8A8_TYPELESS, ResourceState::CopyDest);
        gpu.execute_now(GpuOp::Copy { dst, src });
        assert_eq!(gpu.texture(dst).unwrap().rgba, vec![9; 16]);

        let other = texture(&gpu, DxgiFormat::B8G8R8A8_UNORM, ResourceState::CopyDest);
        gpu.execute_now(GpuOp::Copy { dst: other, src });
        assert_eq!(gpu.validation_errors().len(), 1);
    }

    #[test]
    fn closed_streams_reject_commands() {
        let gpu = SoftGpu::new();
        let list = gpu.create_object(ObjectKind::CommandList, None);
        gpu.record(list, GpuOp::Marker);
        gpu.begin_recording(list);
        gpu.record(list, GpuOp::Marker);
        gpu.end_recording(list);
        gpu.submit(list);
        assert_eq!(gpu.validation_errors().len(), 1);
        assert_eq!(gpu.trace(), vec![GpuOpTrace::Marker]);
        assert_eq!(gpu.stats().submits, 1);
    }

    #[test]
    fn reopening_a_recording_stream_is_reported() {
        let gpu = SoftGpu::new();
        let buffer = gpu.create_object(ObjectKind::CommandBuffer, None);
        gpu.begin_recording(buffer);
        gpu.begin_recording(buffer);
        assert_eq!(gpu.validation_errors().len(), 1);
        gpu.end_recording(buffer);
        gpu.begin_recording(buffer);
        assert_eq!(gpu.validation_errors().len(), 1);
    }
}
