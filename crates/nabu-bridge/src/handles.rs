//! Handle registry.
//!
//! The registry is the bridge's table of shared GPU objects. The host publishes
//! its device/queue (and optionally instance/adapter) once; the offscreen target
//! manager publishes the current texture/view. Guests never receive typed wgpu
//! objects: they get [`RawHandle`] integers through a [`GuestGpu`] view and
//! resolve them back on use.
//!
//! Ownership:
//! - [`HandleRegistry`] is owned by one layer and is the only writer.
//! - [`GuestGpu`] holds a weak reference. It resolves handles while the
//!   registry is alive and not revoked, and fails with
//!   [`BridgeError::Disposed`] afterwards.
//! - A handle names one publication. Republishing (e.g. a target resize)
//!   issues fresh handles, so stale integers stop resolving.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::BridgeError;
use crate::target::OffscreenTarget;

/// Kind of object a [`RawHandle`] names.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HandleKind {
    Instance,
    Adapter,
    Device,
    Queue,
    Texture,
    TextureView,
}

impl HandleKind {
    const fn tag(self) -> usize {
        match self {
            Self::Instance => 1,
            Self::Adapter => 2,
            Self::Device => 3,
            Self::Queue => 4,
            Self::Texture => 5,
            Self::TextureView => 6,
        }
    }

    const fn from_tag(tag: usize) -> Option<Self> {
        match tag {
            1 => Some(Self::Instance),
            2 => Some(Self::Adapter),
            3 => Some(Self::Device),
            4 => Some(Self::Queue),
            5 => Some(Self::Texture),
            6 => Some(Self::TextureView),
            _ => None,
        }
    }

    /// Human-readable name, used in diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Adapter => "adapter",
            Self::Device => "device",
            Self::Queue => "queue",
            Self::Texture => "texture",
            Self::TextureView => "texture view",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const KIND_BITS: u32 = 3;
const KIND_MASK: usize = (1 << KIND_BITS) - 1;

/// Opaque pointer-width integer naming a shared GPU object.
///
/// Layout: `serial << 3 | kind tag`. Zero is never issued, so guests may use it
/// as "no handle".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RawHandle(usize);

impl RawHandle {
    fn new(kind: HandleKind, serial: usize) -> Self {
        Self((serial << KIND_BITS) | kind.tag())
    }

    /// Reconstructs a handle from the integer a guest passed back.
    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    /// Returns the integer value handed to guests.
    pub const fn to_bits(self) -> usize {
        self.0
    }

    /// Kind encoded in the handle, if the tag is valid.
    pub const fn kind(self) -> Option<HandleKind> {
        HandleKind::from_tag(self.0 & KIND_MASK)
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

struct Slot<T> {
    handle: RawHandle,
    value: T,
}

#[derive(Default)]
struct RegistryInner {
    instance: Option<Slot<wgpu::Instance>>,
    adapter: Option<Slot<wgpu::Adapter>>,
    device: Option<Slot<wgpu::Device>>,
    queue: Option<Slot<wgpu::Queue>>,
    texture: Option<Slot<wgpu::Texture>>,
    view: Option<Slot<wgpu::TextureView>>,
    target_size: Option<(u32, u32)>,
    next_serial: usize,
    revoked: bool,
}

impl RegistryInner {
    fn issue<T>(&mut self, kind: HandleKind, value: T) -> Slot<T> {
        self.next_serial += 1;
        Slot {
            handle: RawHandle::new(kind, self.next_serial),
            value,
        }
    }

    fn check_live(&self) -> Result<(), BridgeError> {
        if self.revoked {
            Err(BridgeError::Disposed)
        } else {
            Ok(())
        }
    }

    fn is_initialized(&self) -> bool {
        self.device.is_some() && self.queue.is_some()
    }

    fn check_initialized(&self) -> Result<(), BridgeError> {
        self.check_live()?;
        if self.is_initialized() {
            Ok(())
        } else {
            Err(BridgeError::NotInitialized {
                what: "shared device handles",
            })
        }
    }

    fn handle(&self, kind: HandleKind) -> Result<RawHandle, BridgeError> {
        self.check_initialized()?;
        let handle = match kind {
            HandleKind::Instance => self.instance.as_ref().map(|s| s.handle),
            HandleKind::Adapter => self.adapter.as_ref().map(|s| s.handle),
            HandleKind::Device => self.device.as_ref().map(|s| s.handle),
            HandleKind::Queue => self.queue.as_ref().map(|s| s.handle),
            HandleKind::Texture => self.texture.as_ref().map(|s| s.handle),
            HandleKind::TextureView => self.view.as_ref().map(|s| s.handle),
        };
        handle.ok_or(BridgeError::NotInitialized {
            what: kind.as_str(),
        })
    }

    fn current<T: Clone>(&self, slot: &Option<Slot<T>>, kind: HandleKind) -> Result<T, BridgeError> {
        self.check_initialized()?;
        slot.as_ref()
            .map(|s| s.value.clone())
            .ok_or(BridgeError::NotInitialized {
                what: kind.as_str(),
            })
    }

    fn optional<T: Clone>(&self, slot: &Option<Slot<T>>) -> Result<Option<T>, BridgeError> {
        self.check_initialized()?;
        Ok(slot.as_ref().map(|s| s.value.clone()))
    }

    fn resolve<T: Clone>(
        &self,
        slot: &Option<Slot<T>>,
        handle: RawHandle,
        expected: HandleKind,
    ) -> Result<T, BridgeError> {
        self.check_live()?;
        match slot {
            Some(s) if s.handle == handle => Ok(s.value.clone()),
            _ => Err(BridgeError::InvalidHandle { handle, expected }),
        }
    }
}

/// Table of shared GPU objects owned by one layer.
///
/// Single-threaded by construction (`Rc`); the host calls into it from its
/// render thread only.
#[derive(Default)]
pub struct HandleRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the host's GPU handles.
    ///
    /// `instance` and `adapter` may be absent. Calling this again replaces every
    /// device-level handle with a freshly issued one.
    pub fn set_handles(
        &self,
        instance: Option<&wgpu::Instance>,
        adapter: Option<&wgpu::Adapter>,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<(), BridgeError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_live()?;

        let instance = instance.map(|i| inner.issue(HandleKind::Instance, i.clone()));
        let adapter = adapter.map(|a| inner.issue(HandleKind::Adapter, a.clone()));
        let device = inner.issue(HandleKind::Device, device.clone());
        let queue = inner.issue(HandleKind::Queue, queue.clone());

        inner.instance = instance;
        inner.adapter = adapter;
        inner.device = Some(device);
        inner.queue = Some(queue);
        Ok(())
    }

    /// Returns `true` once both device and queue are set (and not revoked).
    pub fn is_initialized(&self) -> bool {
        let inner = self.inner.borrow();
        !inner.revoked && inner.is_initialized()
    }

    /// Returns `true` after [`HandleRegistry::revoke_all`].
    pub fn is_revoked(&self) -> bool {
        self.inner.borrow().revoked
    }

    pub fn device(&self) -> Result<wgpu::Device, BridgeError> {
        let inner = self.inner.borrow();
        inner.current(&inner.device, HandleKind::Device)
    }

    pub fn queue(&self) -> Result<wgpu::Queue, BridgeError> {
        let inner = self.inner.borrow();
        inner.current(&inner.queue, HandleKind::Queue)
    }

    /// The instance, if the host provided one.
    pub fn instance(&self) -> Result<Option<wgpu::Instance>, BridgeError> {
        let inner = self.inner.borrow();
        inner.optional(&inner.instance)
    }

    /// The adapter, if the host provided one.
    pub fn adapter(&self) -> Result<Option<wgpu::Adapter>, BridgeError> {
        let inner = self.inner.borrow();
        inner.optional(&inner.adapter)
    }

    /// Integer handle for the current object of `kind`.
    pub fn handle(&self, kind: HandleKind) -> Result<RawHandle, BridgeError> {
        self.inner.borrow().handle(kind)
    }

    /// Publishes the current offscreen texture/view under fresh handles.
    pub fn publish_target(&self, target: &OffscreenTarget) -> Result<(), BridgeError> {
        let mut inner = self.inner.borrow_mut();
        inner.check_live()?;

        let texture = inner.issue(HandleKind::Texture, target.texture().clone());
        let view = inner.issue(HandleKind::TextureView, target.view().clone());

        inner.texture = Some(texture);
        inner.view = Some(view);
        inner.target_size = Some(target.size());
        Ok(())
    }

    /// Drops the published texture/view; their handles stop resolving.
    pub fn withdraw_target(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.texture = None;
        inner.view = None;
        inner.target_size = None;
    }

    /// Releases every borrowed object and makes all further lookups fail with
    /// [`BridgeError::Disposed`]. Irreversible.
    pub fn revoke_all(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.view = None;
        inner.texture = None;
        inner.target_size = None;
        inner.queue = None;
        inner.device = None;
        inner.adapter = None;
        inner.instance = None;
        inner.revoked = true;
    }

    /// Returns a non-owning view for guest-side code.
    pub fn guest_view(&self) -> GuestGpu {
        GuestGpu {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Guest-side, read-only access to the registry.
///
/// Cheap to clone. Holds a weak reference: it never keeps GPU objects alive
/// past the layer that owns them.
#[derive(Clone)]
pub struct GuestGpu {
    inner: Weak<RefCell<RegistryInner>>,
}

impl GuestGpu {
    fn with<R>(&self, f: impl FnOnce(&RegistryInner) -> Result<R, BridgeError>) -> Result<R, BridgeError> {
        let inner = self.inner.upgrade().ok_or(BridgeError::Disposed)?;
        let inner = inner.borrow();
        f(&inner)
    }

    /// Returns `true` while the shared device/queue can be resolved.
    pub fn is_initialized(&self) -> bool {
        self.with(|inner| inner.check_initialized()).is_ok()
    }

    pub fn device_handle(&self) -> Result<RawHandle, BridgeError> {
        self.with(|inner| inner.handle(HandleKind::Device))
    }

    pub fn queue_handle(&self) -> Result<RawHandle, BridgeError> {
        self.with(|inner| inner.handle(HandleKind::Queue))
    }

    /// `Ok(None)` when the host did not share an instance.
    pub fn instance_handle(&self) -> Result<Option<RawHandle>, BridgeError> {
        self.with(|inner| {
            inner.check_initialized()?;
            Ok(inner.instance.as_ref().map(|s| s.handle))
        })
    }

    /// `Ok(None)` when the host did not share an adapter.
    pub fn adapter_handle(&self) -> Result<Option<RawHandle>, BridgeError> {
        self.with(|inner| {
            inner.check_initialized()?;
            Ok(inner.adapter.as_ref().map(|s| s.handle))
        })
    }

    pub fn texture_handle(&self) -> Result<RawHandle, BridgeError> {
        self.with(|inner| inner.handle(HandleKind::Texture))
    }

    pub fn view_handle(&self) -> Result<RawHandle, BridgeError> {
        self.with(|inner| inner.handle(HandleKind::TextureView))
    }

    /// Size of the current offscreen target.
    pub fn target_size(&self) -> Result<(u32, u32), BridgeError> {
        self.with(|inner| {
            inner.check_initialized()?;
            inner.target_size.ok_or(BridgeError::NotInitialized {
                what: "offscreen target",
            })
        })
    }

    pub fn instance(&self, handle: RawHandle) -> Result<wgpu::Instance, BridgeError> {
        self.with(|inner| inner.resolve(&inner.instance, handle, HandleKind::Instance))
    }

    pub fn adapter(&self, handle: RawHandle) -> Result<wgpu::Adapter, BridgeError> {
        self.with(|inner| inner.resolve(&inner.adapter, handle, HandleKind::Adapter))
    }

    pub fn device(&self, handle: RawHandle) -> Result<wgpu::Device, BridgeError> {
        self.with(|inner| inner.resolve(&inner.device, handle, HandleKind::Device))
    }

    pub fn queue(&self, handle: RawHandle) -> Result<wgpu::Queue, BridgeError> {
        self.with(|inner| inner.resolve(&inner.queue, handle, HandleKind::Queue))
    }

    pub fn texture(&self, handle: RawHandle) -> Result<wgpu::Texture, BridgeError> {
        self.with(|inner| inner.resolve(&inner.texture, handle, HandleKind::Texture))
    }

    pub fn view(&self, handle: RawHandle) -> Result<wgpu::TextureView, BridgeError> {
        self.with(|inner| inner.resolve(&inner.view, handle, HandleKind::TextureView))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── raw handles ───────────────────────────────────────────────────────

    #[test]
    fn raw_handle_encodes_kind() {
        let h = RawHandle::new(HandleKind::TextureView, 42);
        assert_eq!(h.kind(), Some(HandleKind::TextureView));
        assert_eq!(RawHandle::from_bits(h.to_bits()), h);
    }

    #[test]
    fn raw_handle_is_never_zero() {
        for kind in [
            HandleKind::Instance,
            HandleKind::Adapter,
            HandleKind::Device,
            HandleKind::Queue,
            HandleKind::Texture,
            HandleKind::TextureView,
        ] {
            assert_ne!(RawHandle::new(kind, 0).to_bits(), 0);
        }
    }

    #[test]
    fn zero_bits_have_no_kind() {
        assert_eq!(RawHandle::from_bits(0).kind(), None);
        assert_eq!(RawHandle::from_bits(7).kind(), None);
    }

    // ── uninitialized registry ────────────────────────────────────────────

    #[test]
    fn getters_before_set_handles_report_not_initialized() {
        let registry = HandleRegistry::new();
        assert!(!registry.is_initialized());

        assert!(matches!(registry.device(), Err(BridgeError::NotInitialized { .. })));
        assert!(matches!(registry.queue(), Err(BridgeError::NotInitialized { .. })));
        assert!(matches!(registry.instance(), Err(BridgeError::NotInitialized { .. })));
        assert!(matches!(registry.adapter(), Err(BridgeError::NotInitialized { .. })));
        assert!(matches!(
            registry.handle(HandleKind::TextureView),
            Err(BridgeError::NotInitialized { .. })
        ));
    }

    #[test]
    fn guest_view_before_set_handles_reports_not_initialized() {
        let registry = HandleRegistry::new();
        let gpu = registry.guest_view();

        assert!(!gpu.is_initialized());
        assert!(matches!(gpu.device_handle(), Err(BridgeError::NotInitialized { .. })));
        assert!(matches!(gpu.queue_handle(), Err(BridgeError::NotInitialized { .. })));
        assert!(matches!(gpu.instance_handle(), Err(BridgeError::NotInitialized { .. })));
        assert!(matches!(gpu.target_size(), Err(BridgeError::NotInitialized { .. })));
    }

    #[test]
    fn resolving_an_unknown_handle_is_rejected() {
        let registry = HandleRegistry::new();
        let gpu = registry.guest_view();
        let bogus = RawHandle::from_bits(0x1b);

        assert_eq!(
            gpu.device(bogus).err(),
            Some(BridgeError::InvalidHandle {
                handle: bogus,
                expected: HandleKind::Device
            })
        );
    }

    // ── revocation ────────────────────────────────────────────────────────

    #[test]
    fn revoked_registry_reports_disposed() {
        let registry = HandleRegistry::new();
        let gpu = registry.guest_view();
        registry.revoke_all();

        assert!(registry.is_revoked());
        assert_eq!(registry.device().err(), Some(BridgeError::Disposed));
        assert_eq!(gpu.view_handle().err(), Some(BridgeError::Disposed));
        assert_eq!(
            gpu.view(RawHandle::from_bits(0x0e)).err(),
            Some(BridgeError::Disposed)
        );
    }

    #[test]
    fn guest_view_outliving_registry_reports_disposed() {
        let gpu = {
            let registry = HandleRegistry::new();
            registry.guest_view()
        };
        assert!(!gpu.is_initialized());
        assert_eq!(gpu.device_handle().err(), Some(BridgeError::Disposed));
    }
}
