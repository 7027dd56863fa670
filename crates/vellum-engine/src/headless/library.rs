use std::any::Any;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::host::native::{GlApi, NativeError, OwnedGlTexture};
use crate::host::{GraphicsApi, NativeHandle};
use crate::vector::{
    D3DContextOptions, ExternalCommands, Factory, FlushResources, FrameDescriptor, RenderContext,
    RenderContextProvider, RenderImage, RenderSurface, Renderer, VulkanContextHandles,
};

use super::gpu::{flip_rows, GpuOp, SoftGpu};
use super::raster::SoftRenderer;

/// Where a [`SoftImage`]'s texels come from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageSource {
    /// Decoded from encoded bytes.
    Decoded,
    /// Wraps a host Metal texture.
    Metal,
    /// Owns a GL texture.
    GlTexture,
}

#[derive(Debug)]
enum ImageContent {
    Decoded(Vec<u8>),
    Metal(NativeHandle),
    GlTexture(OwnedGlTexture),
}

/// Image produced by the software factory.
pub struct SoftImage {
    width: u32,
    height: u32,
    gpu: Arc<SoftGpu>,
    content: ImageContent,
}

impl SoftImage {
    pub fn source(&self) -> ImageSource {
        match self.content {
            ImageContent::Decoded(_) => ImageSource::Decoded,
            ImageContent::Metal(_) => ImageSource::Metal,
            ImageContent::GlTexture(_) => ImageSource::GlTexture,
        }
    }

    /// Straight RGBA rows, top to bottom. Texture-backed images read the
    /// texture's current content.
    pub fn rgba(&self) -> Option<Vec<u8>> {
        match &self.content {
            ImageContent::Decoded(rgba) => Some(rgba.clone()),
            ImageContent::Metal(texture) => self.gpu.texture(*texture).map(|t| t.rgba),
            ImageContent::GlTexture(texture) => {
                let handle = NativeHandle::new(u64::from(texture.name()))?;
                let t = self.gpu.texture(handle)?;
                Some(flip_rows(&t.rgba, t.width))
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let rgba = self.rgba()?;
        rgba.get(i..i + 4)?.try_into().ok()
    }
}

impl RenderImage for SoftImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory of a [`SoftwareContext`].
pub struct SoftFactory {
    gpu: Arc<SoftGpu>,
}

impl SoftFactory {
    fn image(&self, width: u32, height: u32, content: ImageContent) -> Arc<dyn RenderImage> {
        Arc::new(SoftImage { width, height, gpu: self.gpu.clone(), content })
    }
}

impl Factory for SoftFactory {
    fn decode_image(&self, encoded: &[u8]) -> Option<Arc<dyn RenderImage>> {
        let decoded = match image::load_from_memory_with_format(encoded, image::ImageFormat::Png) {
            Ok(decoded) => decoded.to_rgba8(),
            Err(e) => {
                log::debug!("soft factory: decode failed: {e}");
                return None;
            }
        };
        let (width, height) = decoded.dimensions();
        Some(self.image(width, height, ImageContent::Decoded(decoded.into_raw())))
    }

    fn adopt_gl_texture(&self, texture: OwnedGlTexture, width: u32, height: u32) -> Option<Arc<dyn RenderImage>> {
        Some(self.image(width, height, ImageContent::GlTexture(texture)))
    }

    fn wrap_metal_texture(&self, texture: NativeHandle, width: u32, height: u32) -> Option<Arc<dyn RenderImage>> {
        Some(self.image(width, height, ImageContent::Metal(texture)))
    }
}

#[derive(Default)]
struct GlHookCounts {
    invalidate: AtomicUsize,
    unbind: AtomicUsize,
}

/// Library context rasterizing on the CPU and handing the result to the
/// software GPU at flush.
pub struct SoftwareContext {
    gpu: Arc<SoftGpu>,
    // The only strong reference; the registry holds a weak one.
    factory: Arc<SoftFactory>,
    renderer: SoftRenderer,
    gl_hooks: Option<Arc<GlHookCounts>>,
}

impl SoftwareContext {
    fn new(gpu: &Arc<SoftGpu>, gl_hooks: Option<Arc<GlHookCounts>>) -> Box<dyn RenderContext> {
        Box::new(Self {
            gpu: gpu.clone(),
            factory: Arc::new(SoftFactory { gpu: gpu.clone() }),
            renderer: SoftRenderer::default(),
            gl_hooks,
        })
    }
}

impl RenderContext for SoftwareContext {
    fn factory(&self) -> Arc<dyn Factory> {
        self.factory.clone()
    }

    fn begin_frame(&mut self, frame: &FrameDescriptor) {
        self.renderer.begin(frame.width, frame.height, frame.clear_color.to_rgba8());
    }

    fn renderer(&mut self) -> &mut dyn Renderer {
        &mut self.renderer
    }

    fn flush(&mut self, resources: FlushResources<'_>) -> Result<(), NativeError> {
        self.gpu.check("flush")?;
        let target = match resources.render_target.surface {
            RenderSurface::Vulkan(image) => image.image,
            RenderSurface::D3D12 { resource, .. } => resource,
            RenderSurface::Metal { texture } => texture,
            RenderSurface::Gl { texture } => {
                NativeHandle::new(u64::from(texture)).ok_or(NativeError::other("glFramebufferTexture2D", 0x0501))?
            }
        };
        let (width, height) = self.renderer.size();
        let op = GpuOp::Raster { target, width, height, rgba: self.renderer.to_rgba() };
        match resources.commands {
            ExternalCommands::None => self.gpu.execute_now(op),
            ExternalCommands::Vulkan(buffer) | ExternalCommands::Metal(buffer) => self.gpu.record(buffer, op),
            ExternalCommands::D3D12 { direct, .. } => self.gpu.record(direct, op),
        }
        Ok(())
    }

    fn invalidate_gl_state(&mut self) {
        if let Some(hooks) = &self.gl_hooks {
            hooks.invalidate.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn unbind_gl_internal_resources(&mut self) {
        if let Some(hooks) = &self.gl_hooks {
            hooks.unbind.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Software stand-in for the vector-graphics library's context constructors.
pub struct SoftwareLibrary {
    gpu: Arc<SoftGpu>,
    refused: Mutex<HashSet<GraphicsApi>>,
    last_d3d_options: Mutex<Option<D3DContextOptions>>,
    gl_hooks: Arc<GlHookCounts>,
}

impl SoftwareLibrary {
    pub fn new(gpu: Arc<SoftGpu>) -> Self {
        Self {
            gpu,
            refused: Mutex::new(HashSet::new()),
            last_d3d_options: Mutex::new(None),
            gl_hooks: Arc::default(),
        }
    }

    /// Makes context construction for `api` fail.
    pub fn refuse(&self, api: GraphicsApi) {
        self.refused.lock().insert(api);
    }

    pub fn last_d3d_options(&self) -> Option<D3DContextOptions> {
        *self.last_d3d_options.lock()
    }

    /// How often GL contexts were asked to (invalidate, unbind) their state.
    pub fn gl_hook_counts(&self) -> (usize, usize) {
        (
            self.gl_hooks.invalidate.load(Ordering::Relaxed),
            self.gl_hooks.unbind.load(Ordering::Relaxed),
        )
    }

    fn accepts(&self, api: GraphicsApi) -> bool {
        let accepted = !self.refused.lock().contains(&api);
        if !accepted {
            log::debug!("software library: refusing {api} context");
        }
        accepted
    }
}

impl RenderContextProvider for SoftwareLibrary {
    fn make_vulkan(&self, handles: &VulkanContextHandles) -> Option<Box<dyn RenderContext>> {
        if !self.accepts(GraphicsApi::Vulkan) || handles.device.raw() != SoftGpu::DEVICE {
            return None;
        }
        Some(SoftwareContext::new(&self.gpu, None))
    }

    fn make_d3d12(
        &self,
        _device: NativeHandle,
        startup_list: NativeHandle,
        options: &D3DContextOptions,
    ) -> Option<Box<dyn RenderContext>> {
        *self.last_d3d_options.lock() = Some(*options);
        if !self.accepts(GraphicsApi::D3D12) {
            return None;
        }
        // Stands in for the context's initial resource uploads.
        self.gpu.record(startup_list, GpuOp::Marker);
        Some(SoftwareContext::new(&self.gpu, None))
    }

    fn make_metal(&self, _device: NativeHandle, _queue: NativeHandle) -> Option<Box<dyn RenderContext>> {
        self.accepts(GraphicsApi::Metal)
            .then(|| SoftwareContext::new(&self.gpu, None))
    }

    fn make_gl(&self, _gl: &Arc<dyn GlApi>) -> Option<Box<dyn RenderContext>> {
        self.accepts(GraphicsApi::OpenGl)
            .then(|| SoftwareContext::new(&self.gpu, Some(self.gl_hooks.clone())))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn decodes_png_to_straight_rgba() {
        let factory = SoftFactory { gpu: Arc::new(SoftGpu::new()) };
        let image = factory.decode_image(&png(2, 3, [200, 100, 50, 128])).unwrap();
        assert_eq!((image.width(), image.height()), (2, 3));
        let soft = image.as_any().downcast_ref::<SoftImage>().unwrap();
        assert_eq!(soft.pixel(1, 2), Some([200, 100, 50, 128]));
        assert_eq!(soft.pixel(2, 0), None);
    }

    #[test]
    fn garbage_does_not_decode() {
        let factory = SoftFactory { gpu: Arc::new(SoftGpu::new()) };
        assert!(factory.decode_image(b"not a png").is_none());
    }

    #[test]
    fn refused_api_builds_no_context() {
        let library = SoftwareLibrary::new(Arc::new(SoftGpu::new()));
        library.refuse(GraphicsApi::Metal);
        let device = SoftGpu::handle(SoftGpu::DEVICE);
        assert!(library.make_metal(device, device).is_none());
    }

    #[test]
    fn factory_dies_with_its_context() {
        let library = SoftwareLibrary::new(Arc::new(SoftGpu::new()));
        let device = SoftGpu::handle(SoftGpu::DEVICE);
        let context = library.make_metal(device, device).unwrap();
        let weak = Arc::downgrade(&context.factory());
        assert!(weak.upgrade().is_some());
        drop(context);
        assert!(weak.upgrade().is_none());
    }
}
