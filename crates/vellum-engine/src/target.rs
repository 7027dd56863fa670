//! Host texture the backends render into.

use std::sync::Arc;

use crate::coords::Size;
use crate::host::{
    GraphicsApi, HostImage, HostTextureView, RenderingDevice, RenderingServer, Rid, TextureDescriptor,
};

/// Which host abstraction allocated the current texture. It is freed through
/// the same one.
enum Allocation {
    None,
    Device { device: Arc<dyn RenderingDevice>, rid: Rid },
    Server { rid: Rid },
}

/// A resizable RGBA8 host texture.
///
/// On hosts with a rendering device the texture is a device texture presented
/// through a host view; on the raw OpenGL renderer it is a server texture.
pub struct TextureTarget {
    server: Arc<dyn RenderingServer>,
    allocation: Allocation,
    view: Option<Arc<dyn HostTextureView>>,
    size: Size,
}

impl TextureTarget {
    pub fn new(server: Arc<dyn RenderingServer>) -> Self {
        Self {
            server,
            allocation: Allocation::None,
            view: None,
            size: Size::ZERO,
        }
    }

    /// Reallocates the texture for `size`.
    ///
    /// Returns true when a new texture was created. The same size is a no-op;
    /// a non-positive dimension clears the target.
    pub fn resize(&mut self, size: Size) -> bool {
        let Some((width, height)) = size.to_extent() else {
            self.clear();
            return false;
        };
        if size == self.size && self.is_valid() {
            return false;
        }
        self.clear();

        match self.server.rendering_device() {
            Some(device) => {
                let rid = device.texture_create(&TextureDescriptor::render_target(width, height));
                if !rid.is_valid() {
                    log::warn!("texture target: device refused a {width}x{height} texture");
                    return false;
                }
                let server = &self.server;
                let view = self.view.get_or_insert_with(|| server.texture_view_create());
                view.set_texture_rid(rid);
                self.allocation = Allocation::Device { device, rid };
            }
            None => {
                let driver = self.server.driver_name();
                if GraphicsApi::from_driver_name(&driver).is_none_or(GraphicsApi::has_rendering_device) {
                    return false;
                }
                let rid = self.server.texture_2d_create(&HostImage::blank(width, height));
                if !rid.is_valid() {
                    log::warn!("texture target: server refused a {width}x{height} texture");
                    return false;
                }
                self.allocation = Allocation::Server { rid };
            }
        }

        self.size = size;
        true
    }

    /// Frees the texture. The host view, if any, is unbound first and kept
    /// for the next allocation.
    pub fn clear(&mut self) {
        match std::mem::replace(&mut self.allocation, Allocation::None) {
            Allocation::None => {}
            Allocation::Device { device, rid } => {
                if let Some(view) = &self.view {
                    view.set_texture_rid(Rid::INVALID);
                }
                device.free_rid(rid);
            }
            Allocation::Server { rid } => self.server.free_rid(rid),
        }
        self.size = Size::ZERO;
    }

    pub fn texture_rid(&self) -> Rid {
        match self.allocation {
            Allocation::None => Rid::INVALID,
            Allocation::Device { rid, .. } | Allocation::Server { rid } => rid,
        }
    }

    /// Presentation view, on hosts with a rendering device.
    pub fn host_view(&self) -> Option<&Arc<dyn HostTextureView>> {
        match self.allocation {
            Allocation::Device { .. } => self.view.as_ref(),
            _ => None,
        }
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.texture_rid().is_valid()
    }
}

impl Drop for TextureTarget {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(all(test, feature = "headless"))]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn same_size_is_a_no_op() {
        let host = HeadlessHost::new(GraphicsApi::Vulkan);
        let mut target = TextureTarget::new(host.server_arc());
        assert!(target.resize(Size::new(64, 32)));
        let rid = target.texture_rid();
        assert!(!target.resize(Size::new(64, 32)));
        assert_eq!(target.texture_rid(), rid);
        assert_eq!(host.server_impl().counts().device_allocs, 1);
    }

    #[test]
    fn new_size_replaces_texture() {
        let host = HeadlessHost::new(GraphicsApi::Vulkan);
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(64, 32));
        let first = target.texture_rid();
        assert!(target.resize(Size::new(32, 32)));
        assert_ne!(target.texture_rid(), first);
        let counts = host.server_impl().counts();
        assert_eq!((counts.device_allocs, counts.device_frees), (2, 1));
    }

    #[test]
    fn non_positive_size_clears() {
        let host = HeadlessHost::new(GraphicsApi::Vulkan);
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(8, 8));
        assert!(!target.resize(Size::new(0, 8)));
        assert!(!target.is_valid());
        assert_eq!(target.size(), Size::ZERO);
        assert!(!target.resize(Size::new(-3, 8)));
        assert_eq!(host.server_impl().counts().device_frees, 1);
    }

    #[test]
    fn device_texture_is_bound_to_one_reused_view() {
        let host = HeadlessHost::new(GraphicsApi::D3D12);
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(8, 8));
        let view = target.host_view().unwrap().clone();
        assert_eq!(view.texture_rid(), target.texture_rid());

        target.resize(Size::new(16, 16));
        assert!(Arc::ptr_eq(&view, target.host_view().unwrap()));
        assert_eq!(view.texture_rid(), target.texture_rid());

        target.clear();
        assert_eq!(view.texture_rid(), Rid::INVALID);
    }

    #[test]
    fn opengl_allocates_through_the_server() {
        let host = HeadlessHost::new(GraphicsApi::OpenGl);
        let mut target = TextureTarget::new(host.server_arc());
        assert!(target.resize(Size::new(8, 8)));
        assert!(target.host_view().is_none());
        let counts = host.server_impl().counts();
        assert_eq!((counts.server_allocs, counts.device_allocs), (1, 0));
    }

    #[test]
    fn missing_device_on_device_api_fails() {
        let host = HeadlessHost::new(GraphicsApi::Vulkan);
        host.server_impl().set_rendering_device_available(false);
        let mut target = TextureTarget::new(host.server_arc());
        assert!(!target.resize(Size::new(8, 8)));
        assert!(!target.is_valid());
    }

    // ── teardown symmetry ─────────────────────────────────────────────────

    #[test]
    fn clear_then_resize_yields_fresh_handle_without_double_free() {
        for api in GraphicsApi::ALL {
            let host = HeadlessHost::new(api);
            let mut target = TextureTarget::new(host.server_arc());
            target.resize(Size::new(8, 8));
            let first = target.texture_rid();
            target.clear();
            target.clear();
            assert!(target.resize(Size::new(8, 8)));
            assert_ne!(target.texture_rid(), first);
            drop(target);

            let counts = host.server_impl().counts();
            assert_eq!(counts.device_allocs, counts.device_frees, "{api}");
            assert_eq!(counts.server_allocs, counts.server_frees, "{api}");
            assert!(host.server_impl().violations().is_empty(), "{api}: {:?}", host.server_impl().violations());
        }
    }

    #[test]
    fn drop_frees_through_allocating_abstraction() {
        let host = HeadlessHost::new(GraphicsApi::Metal);
        {
            let mut target = TextureTarget::new(host.server_arc());
            target.resize(Size::new(4, 4));
        }
        let counts = host.server_impl().counts();
        assert_eq!((counts.device_frees, counts.server_frees), (1, 0));
        assert!(host.server_impl().violations().is_empty());
    }
}
