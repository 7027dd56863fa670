use std::num::NonZeroU64;

/// Opaque native object handle handed across the host boundary
/// (`VkDevice`, `ID3D12Resource*`, `MTLTexture`, GL names, DXGI format values).
///
/// A null handle is unrepresentable; accessors return `Option<NativeHandle>`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NativeHandle(NonZeroU64);

impl NativeHandle {
    #[inline]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(v) => Some(NativeHandle(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0.get()
    }

    /// Reinterprets the handle as a pointer for FFI calls.
    #[inline]
    pub fn as_ptr<T>(self) -> *mut T {
        self.0.get() as usize as *mut T
    }

    /// Wraps a non-null pointer.
    #[inline]
    pub fn from_ptr<T>(ptr: *mut T) -> Option<Self> {
        Self::new(ptr as usize as u64)
    }
}

/// Host resource id. Zero is the invalid id.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Rid(u64);

impl Rid {
    pub const INVALID: Rid = Rid(0);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Rid(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}
