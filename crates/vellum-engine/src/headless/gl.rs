use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::d3d12::ResourceState;
use crate::host::native::{DxgiFormat, FramebufferTarget, GlApi, NativeError};
use crate::host::NativeHandle;

use super::gpu::{ObjectKind, SoftGpu};

#[derive(Default)]
struct Bindings {
    texture: u32,
    read: u32,
    draw: u32,
    // framebuffer -> color attachment 0
    attachments: HashMap<u32, u32>,
    incomplete: bool,
}

impl Bindings {
    fn framebuffer(&self, target: FramebufferTarget) -> u32 {
        match target {
            FramebufferTarget::Read => self.read,
            FramebufferTarget::Draw => self.draw,
        }
    }
}

/// OpenGL context over the software GPU.
///
/// Texture names are GPU object handles, so textures created through the
/// host server are visible here under the same name. Sync objects are
/// signaled as soon as they are inserted.
pub struct SoftGl {
    gpu: Arc<SoftGpu>,
    bindings: Mutex<Bindings>,
}

impl SoftGl {
    pub fn new(gpu: Arc<SoftGpu>) -> Self {
        Self { gpu, bindings: Mutex::new(Bindings::default()) }
    }

    /// Makes every framebuffer completeness check fail.
    pub fn set_framebuffers_incomplete(&self, incomplete: bool) {
        self.bindings.lock().incomplete = incomplete;
    }

    fn name_of(handle: NativeHandle) -> Option<u32> {
        u32::try_from(handle.raw()).ok()
    }

    fn attachment(&self, target: FramebufferTarget) -> Option<NativeHandle> {
        let b = self.bindings.lock();
        let texture = *b.attachments.get(&b.framebuffer(target))?;
        NativeHandle::new(u64::from(texture))
    }
}

impl GlApi for SoftGl {
    fn fence_sync(&self) -> Result<NativeHandle, NativeError> {
        self.gpu.check("glFenceSync")?;
        let sync = self.gpu.create_object(ObjectKind::Sync, None);
        self.gpu.signal(sync, 1);
        Ok(sync)
    }

    fn client_wait_sync(&self, sync: NativeHandle) -> Result<(), NativeError> {
        self.gpu.check("glClientWaitSync")?;
        self.gpu.wait(sync, 1);
        Ok(())
    }

    fn delete_sync(&self, sync: NativeHandle) {
        self.gpu.destroy_object(sync);
    }

    fn flush(&self) {}

    fn gen_texture(&self) -> Option<u32> {
        let texture = self
            .gpu
            .create_texture(0, 0, DxgiFormat::R8G8B8A8_UNORM, ResourceState::Common, None);
        Self::name_of(texture)
    }

    fn delete_texture(&self, texture: u32) {
        if let Some(handle) = NativeHandle::new(u64::from(texture)) {
            self.gpu.destroy_object(handle);
        }
    }

    fn texture_binding(&self) -> u32 {
        self.bindings.lock().texture
    }

    fn bind_texture(&self, texture: u32) {
        self.bindings.lock().texture = texture;
    }

    fn tex_image_rgba8(&self, width: u32, height: u32) {
        let bound = self.bindings.lock().texture;
        match NativeHandle::new(u64::from(bound)) {
            Some(handle) => self.gpu.define_texture(handle, width, height),
            None => self.gpu.report("glTexImage2D with no texture bound".into()),
        }
    }

    fn gen_framebuffer(&self) -> Option<u32> {
        Self::name_of(self.gpu.create_object(ObjectKind::Framebuffer, None))
    }

    fn delete_framebuffer(&self, framebuffer: u32) {
        self.bindings.lock().attachments.remove(&framebuffer);
        if let Some(handle) = NativeHandle::new(u64::from(framebuffer)) {
            self.gpu.destroy_object(handle);
        }
    }

    fn framebuffer_binding(&self, target: FramebufferTarget) -> u32 {
        self.bindings.lock().framebuffer(target)
    }

    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: u32) {
        let mut b = self.bindings.lock();
        match target {
            FramebufferTarget::Read => b.read = framebuffer,
            FramebufferTarget::Draw => b.draw = framebuffer,
        }
    }

    fn framebuffer_texture(&self, target: FramebufferTarget, texture: u32) {
        let mut b = self.bindings.lock();
        let framebuffer = b.framebuffer(target);
        if framebuffer == 0 {
            drop(b);
            self.gpu.report("glFramebufferTexture2D on the default framebuffer".into());
            return;
        }
        b.attachments.insert(framebuffer, texture);
    }

    fn framebuffer_complete(&self, target: FramebufferTarget) -> bool {
        if self.bindings.lock().incomplete {
            return false;
        }
        self.attachment(target)
            .and_then(|handle| self.gpu.texture(handle))
            .is_some_and(|t| t.width > 0 && t.height > 0)
    }

    fn blit_framebuffer(&self, width: u32, height: u32) {
        let (Some(src), Some(dst)) = (self.attachment(FramebufferTarget::Read), self.attachment(FramebufferTarget::Draw))
        else {
            self.gpu.report("glBlitFramebuffer without both attachments".into());
            return;
        };
        let fits = self.gpu.texture(src).is_some_and(|t| (t.width, t.height) == (width, height));
        if !fits || !self.gpu.blit(dst, src) {
            self.gpu.report(format!("glBlitFramebuffer of {width}x{height} between mismatched textures"));
        }
    }
}
