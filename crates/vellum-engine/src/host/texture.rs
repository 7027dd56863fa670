use super::Rid;

bitflags::bitflags! {
    /// Usage flags requested when the bridge allocates a device texture.
    pub struct TextureUsage: u32 {
        const SAMPLING = 1 << 0;
        const COLOR_ATTACHMENT = 1 << 1;
        const CAN_UPDATE = 1 << 2;
        const CAN_COPY_FROM = 1 << 3;
        const CAN_COPY_TO = 1 << 4;
    }
}

/// Pixel formats the bridge asks the host for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
}

impl TextureFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8Unorm => 4,
        }
    }
}

/// Device texture creation parameters.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// RGBA8 texture the backends render into and the host samples from.
    pub fn render_target(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::SAMPLING | TextureUsage::COLOR_ATTACHMENT | TextureUsage::CAN_COPY_FROM,
        }
    }
}

/// CPU image in straight-alpha RGBA8, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl HostImage {
    /// Zero-initialized (transparent black) image.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Image filled with one straight RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba.repeat(width as usize * height as usize);
        Self { width, height, data }
    }

    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 4
    }

    /// Pixel view over the byte buffer.
    #[inline]
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::try_cast_slice(&self.data).unwrap_or_default()
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels().get((y * self.width + x) as usize).copied()
    }
}

/// A host-side 2D texture passed to the import bridge.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HostTexture {
    pub rid: Rid,
    pub width: u32,
    pub height: u32,
}
