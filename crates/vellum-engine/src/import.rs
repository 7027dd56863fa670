//! Turns host textures into library images.

use std::io::Cursor;
use std::sync::Arc;

use crate::host::native::{FramebufferTarget, GlApi, OwnedGlTexture};
use crate::host::{DriverResource, GraphicsApi, HostTexture, RenderingServer};
use crate::registry::RenderRegistry;
use crate::vector::{Factory, RenderImage};

/// Builds library images from host textures with the active backend's
/// fastest path.
///
/// Metal textures are wrapped without a copy; OpenGL textures are copied on
/// the GPU into a texture the library adopts. Everything else, and any
/// fast-path failure, goes through a PNG readback.
pub struct TextureImportBridge<'a> {
    server: &'a dyn RenderingServer,
    registry: &'a RenderRegistry,
    api: Option<GraphicsApi>,
    gl: Option<Arc<dyn GlApi>>,
}

impl<'a> TextureImportBridge<'a> {
    pub fn new(server: &'a dyn RenderingServer, registry: &'a RenderRegistry) -> Self {
        Self { server, registry, api: None, gl: None }
    }

    /// Enables the fast path of the active backend.
    pub fn with_backend(mut self, api: Option<GraphicsApi>, gl: Option<Arc<dyn GlApi>>) -> Self {
        self.api = api;
        self.gl = gl;
        self
    }

    /// `None` without an active factory or input texture.
    pub fn make_image(&self, texture: Option<&HostTexture>) -> Option<Arc<dyn RenderImage>> {
        let texture = texture?;
        let factory = self.registry.factory()?;

        let fast = match self.api {
            Some(GraphicsApi::Metal) => self.wrap_metal(factory.as_ref(), texture),
            Some(GraphicsApi::OpenGl) => self.copy_gl(factory.as_ref(), texture),
            _ => None,
        };
        fast.or_else(|| self.decode_readback(factory.as_ref(), texture))
    }

    fn wrap_metal(&self, factory: &dyn Factory, texture: &HostTexture) -> Option<Arc<dyn RenderImage>> {
        let device = self.server.rendering_device()?;
        let native = device.driver_resource(DriverResource::Texture, texture.rid, 0)?;
        factory.wrap_metal_texture(native, texture.width, texture.height)
    }

    fn copy_gl(&self, factory: &dyn Factory, texture: &HostTexture) -> Option<Arc<dyn RenderImage>> {
        let gl = self.gl.as_ref()?;
        let source = self.server.texture_native_handle(texture.rid)?;
        let source = u32::try_from(source.raw()).ok()?;
        let copy = blit_copy(gl, source, texture.width, texture.height)?;
        factory.adopt_gl_texture(copy, texture.width, texture.height)
    }

    fn decode_readback(&self, factory: &dyn Factory, texture: &HostTexture) -> Option<Arc<dyn RenderImage>> {
        let readback = self.server.texture_get_image(texture.rid)?;
        let rgba = image::RgbaImage::from_raw(readback.width, readback.height, readback.data)?;
        let mut png = Vec::new();
        if let Err(e) = image::DynamicImage::ImageRgba8(rgba).write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png) {
            log::warn!("texture import: png encode failed: {e}");
            return None;
        }
        factory.decode_image(&png)
    }
}

/// Copies `source` into a new RGBA8 texture through two temporary
/// framebuffers. The caller's texture and framebuffer bindings are restored.
/// `None` if either framebuffer is incomplete; the new texture is then
/// deleted.
fn blit_copy(gl: &Arc<dyn GlApi>, source: u32, width: u32, height: u32) -> Option<OwnedGlTexture> {
    let copy = OwnedGlTexture::generate(gl)?;

    let prev_texture = gl.texture_binding();
    gl.bind_texture(copy.name());
    gl.tex_image_rgba8(width, height);

    let prev_read = gl.framebuffer_binding(FramebufferTarget::Read);
    let prev_draw = gl.framebuffer_binding(FramebufferTarget::Draw);
    let read = gl.gen_framebuffer();
    let draw = gl.gen_framebuffer();

    let mut complete = false;
    if let (Some(read), Some(draw)) = (read, draw) {
        gl.bind_framebuffer(FramebufferTarget::Read, read);
        gl.framebuffer_texture(FramebufferTarget::Read, source);
        gl.bind_framebuffer(FramebufferTarget::Draw, draw);
        gl.framebuffer_texture(FramebufferTarget::Draw, copy.name());

        complete = gl.framebuffer_complete(FramebufferTarget::Read) && gl.framebuffer_complete(FramebufferTarget::Draw);
        if complete {
            gl.blit_framebuffer(width, height);
        }
    }

    for fbo in [read, draw].into_iter().flatten() {
        gl.delete_framebuffer(fbo);
    }
    gl.bind_framebuffer(FramebufferTarget::Read, prev_read);
    gl.bind_framebuffer(FramebufferTarget::Draw, prev_draw);
    gl.bind_texture(prev_texture);

    complete.then_some(copy)
}

#[cfg(all(test, feature = "headless"))]
mod tests {
    use super::*;
    use crate::coords::Size;
    use crate::core::BridgeConfig;
    use crate::headless::{HeadlessHost, ImageSource, ObjectKind, SoftImage};
    use crate::host::HostImage;

    fn host_texture(host: &HeadlessHost, image: &HostImage) -> HostTexture {
        let rid = host.server().texture_2d_create(image);
        HostTexture { rid, width: image.width, height: image.height }
    }

    fn source_of(image: &Arc<dyn RenderImage>) -> ImageSource {
        image.as_any().downcast_ref::<SoftImage>().unwrap().source()
    }

    // ── preconditions ─────────────────────────────────────────────────────

    #[test]
    fn no_factory_means_no_image() {
        let host = HeadlessHost::new(GraphicsApi::Vulkan);
        let registry = RenderRegistry::new();
        let texture = host_texture(&host, &HostImage::filled(2, 2, [1, 2, 3, 255]));
        let bridge = TextureImportBridge::new(host.server(), &registry);
        assert!(bridge.make_image(Some(&texture)).is_none());
    }

    #[test]
    fn no_texture_means_no_image() {
        let host = HeadlessHost::new(GraphicsApi::Vulkan);
        let mut router = host.router();
        let registry = RenderRegistry::new();
        router.initialize(host.server(), &registry, &BridgeConfig::default());
        let bridge = TextureImportBridge::new(host.server(), &registry);
        assert!(bridge.make_image(None).is_none());
    }

    // ── fallback ──────────────────────────────────────────────────────────

    #[test]
    fn readback_round_trips_through_png() {
        let host = HeadlessHost::new(GraphicsApi::Vulkan);
        let mut router = host.router();
        let registry = RenderRegistry::new();
        router.initialize(host.server(), &registry, &BridgeConfig::default());

        let texture = host_texture(&host, &HostImage::filled(3, 2, [10, 20, 30, 255]));
        let bridge = TextureImportBridge::new(host.server(), &registry).with_backend(router.active_api(), router.gl());
        let image = bridge.make_image(Some(&texture)).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(source_of(&image), ImageSource::Decoded);
        let soft = image.as_any().downcast_ref::<SoftImage>().unwrap();
        assert_eq!(soft.pixel(2, 1), Some([10, 20, 30, 255]));
    }

    // ── fast paths ────────────────────────────────────────────────────────

    #[test]
    fn metal_textures_are_wrapped() {
        let host = HeadlessHost::new(GraphicsApi::Metal);
        let mut router = host.router();
        let registry = RenderRegistry::new();
        router.initialize(host.server(), &registry, &BridgeConfig::default());

        let mut target = crate::target::TextureTarget::new(host.server_arc());
        target.resize(Size::new(4, 4));
        let texture = HostTexture { rid: target.texture_rid(), width: 4, height: 4 };
        let bridge = TextureImportBridge::new(host.server(), &registry).with_backend(router.active_api(), router.gl());
        let image = bridge.make_image(Some(&texture)).unwrap();
        assert_eq!(source_of(&image), ImageSource::Metal);
    }

    #[test]
    fn gl_blit_hands_texture_to_library() {
        let host = HeadlessHost::new(GraphicsApi::OpenGl);
        let mut router = host.router();
        let registry = RenderRegistry::new();
        router.initialize(host.server(), &registry, &BridgeConfig::default());

        let texture = host_texture(&host, &HostImage::filled(4, 4, [0, 0, 255, 255]));
        let before = host.gpu().live_objects_of(ObjectKind::Texture);
        let bridge = TextureImportBridge::new(host.server(), &registry).with_backend(router.active_api(), router.gl());
        let image = bridge.make_image(Some(&texture)).unwrap();
        assert_eq!(source_of(&image), ImageSource::GlTexture);
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Texture), before + 1);
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Framebuffer), 0);

        let soft = image.as_any().downcast_ref::<SoftImage>().unwrap();
        assert_eq!(soft.pixel(0, 0), Some([0, 0, 255, 255]));

        // The library owns the copy now; releasing the image deletes it.
        drop(image);
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Texture), before);
    }

    #[test]
    fn gl_bindings_are_restored() {
        let host = HeadlessHost::new(GraphicsApi::OpenGl);
        let mut router = host.router();
        let registry = RenderRegistry::new();
        router.initialize(host.server(), &registry, &BridgeConfig::default());
        let gl = router.gl().unwrap();
        gl.bind_texture(5);
        gl.bind_framebuffer(FramebufferTarget::Read, 6);
        gl.bind_framebuffer(FramebufferTarget::Draw, 7);

        let texture = host_texture(&host, &HostImage::filled(2, 2, [1, 1, 1, 255]));
        let bridge = TextureImportBridge::new(host.server(), &registry).with_backend(router.active_api(), router.gl());
        bridge.make_image(Some(&texture)).unwrap();

        assert_eq!(gl.texture_binding(), 5);
        assert_eq!(gl.framebuffer_binding(FramebufferTarget::Read), 6);
        assert_eq!(gl.framebuffer_binding(FramebufferTarget::Draw), 7);
    }

    #[test]
    fn incomplete_framebuffer_falls_back_without_leaking() {
        let host = HeadlessHost::new(GraphicsApi::OpenGl);
        let mut router = host.router();
        let registry = RenderRegistry::new();
        router.initialize(host.server(), &registry, &BridgeConfig::default());
        host.gl_impl().set_framebuffers_incomplete(true);

        let texture = host_texture(&host, &HostImage::filled(2, 2, [9, 9, 9, 255]));
        let before = host.gpu().live_objects_of(ObjectKind::Texture);
        let bridge = TextureImportBridge::new(host.server(), &registry).with_backend(router.active_api(), router.gl());
        let image = bridge.make_image(Some(&texture)).unwrap();
        assert_eq!(source_of(&image), ImageSource::Decoded);
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Texture), before);
    }

    #[test]
    fn imported_image_draws() {
        use crate::registry::DrawFn;
        use crate::vector::Renderer;

        let host = HeadlessHost::new(GraphicsApi::Vulkan);
        let mut router = host.router();
        let registry = RenderRegistry::new();
        router.initialize(host.server(), &registry, &BridgeConfig::default());
        let texture = host_texture(&host, &HostImage::filled(4, 4, [0, 255, 0, 255]));
        let image = TextureImportBridge::new(host.server(), &registry)
            .make_image(Some(&texture))
            .unwrap();

        let mut target = crate::target::TextureTarget::new(host.server_arc());
        target.resize(Size::new(4, 4));
        let draw = DrawFn(move |r: &mut dyn Renderer| r.draw_image(image.as_ref(), 1.0));
        router.render_frame(host.server(), target.texture_rid(), Some(&draw), 4, 4);

        let out = host.server().texture_get_image(target.texture_rid()).unwrap();
        assert!(out.pixels().iter().all(|p| *p == [0, 255, 0, 255]));
    }
}
