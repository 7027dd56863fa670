use std::fmt;

/// Graphics API the host renderer is running on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GraphicsApi {
    Vulkan,
    D3D12,
    Metal,
    OpenGl,
}

impl GraphicsApi {
    pub const ALL: [GraphicsApi; 4] = [
        GraphicsApi::Vulkan,
        GraphicsApi::D3D12,
        GraphicsApi::Metal,
        GraphicsApi::OpenGl,
    ];

    /// Maps the host's driver name onto an API. Unknown names yield `None`.
    pub fn from_driver_name(name: &str) -> Option<Self> {
        match name {
            "vulkan" => Some(GraphicsApi::Vulkan),
            "d3d12" => Some(GraphicsApi::D3D12),
            "metal" => Some(GraphicsApi::Metal),
            "opengl3" | "opengl3_es" | "opengl3_angle" => Some(GraphicsApi::OpenGl),
            _ => None,
        }
    }

    /// Canonical driver name.
    pub const fn driver_name(self) -> &'static str {
        match self {
            GraphicsApi::Vulkan => "vulkan",
            GraphicsApi::D3D12 => "d3d12",
            GraphicsApi::Metal => "metal",
            GraphicsApi::OpenGl => "opengl3",
        }
    }

    /// Whether the host exposes a rendering device for this API. The raw OpenGL
    /// renderer has none and allocates through the server instead.
    pub const fn has_rendering_device(self) -> bool {
        !matches!(self, GraphicsApi::OpenGl)
    }
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_names_round_trip() {
        for api in GraphicsApi::ALL {
            assert_eq!(GraphicsApi::from_driver_name(api.driver_name()), Some(api));
        }
    }

    #[test]
    fn gl_variants_share_one_backend() {
        assert_eq!(GraphicsApi::from_driver_name("opengl3_es"), Some(GraphicsApi::OpenGl));
    }

    #[test]
    fn unknown_driver_is_rejected() {
        assert_eq!(GraphicsApi::from_driver_name("dummy"), None);
        assert_eq!(GraphicsApi::from_driver_name(""), None);
    }
}
