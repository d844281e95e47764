use crate::compositor::BlitCompositor;
use crate::error::BridgeError;
use crate::handles::{GuestGpu, HandleRegistry};
use crate::host::HostCtx;
use crate::invoker::{GuestRenderInvoker, GuestRuntime, RenderOutcome};
use crate::target::{OffscreenTarget, OffscreenTargetManager, TargetStatus};

use super::config::LayerConfig;
use super::state::{FrameOutcome, LayerSession, LayerState, SkipReason};
use super::teardown::{TEARDOWN_ORDER, TeardownStep};

/// One guest-rendered layer composited onto the host surface.
///
/// Drive it with [`tick`](Self::tick) once per host frame, after the host has
/// acquired its surface view and before it presents. Setup happens lazily over
/// the first ticks:
///
/// | tick | transition                      | outcome             |
/// |------|---------------------------------|---------------------|
/// | 1    | `Uninitialized -> HandlesBound` | `Skipped(Setup)`    |
/// | 2    | `HandlesBound -> TargetReady`   | `Skipped(Setup)`    |
/// | 3    | `TargetReady -> Live`           | `Composited`        |
///
/// Failed steps keep the current state and are retried on the next tick.
/// Only device loss (see [`mark_device_lost`](Self::mark_device_lost), or a
/// different device passed to [`set_handles`](Self::set_handles)) is terminal.
pub struct GuestLayer {
    config: LayerConfig,
    state: LayerState,
    visible: bool,
    disposed: bool,
    failure: Option<String>,
    frames_composited: u64,

    invoker: GuestRenderInvoker,
    compositor: BlitCompositor,
    targets: OffscreenTargetManager,
    registry: HandleRegistry,
}

impl GuestLayer {
    pub fn new<R>(config: LayerConfig, runtime: R) -> Self
    where
        R: GuestRuntime + 'static,
    {
        Self::with_boxed_runtime(config, Box::new(runtime))
    }

    pub fn with_boxed_runtime(config: LayerConfig, runtime: Box<dyn GuestRuntime>) -> Self {
        let invoker = GuestRenderInvoker::new(runtime, config.entry_point.clone());
        let compositor = BlitCompositor::new(config.clear_color);
        let targets = OffscreenTargetManager::new(config.target_format);

        Self {
            config,
            state: LayerState::Uninitialized,
            visible: true,
            disposed: false,
            failure: None,
            frames_composited: 0,
            invoker,
            compositor,
            targets,
            registry: HandleRegistry::new(),
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    pub fn session(&self) -> LayerSession {
        LayerSession {
            handles_set: self.registry.is_initialized(),
            target_ready: self.targets.current().is_some(),
            guest_ready: self.invoker.is_bound(),
            failed: self.state == LayerState::Failed,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hidden layers skip their frame but keep every resource.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Why the layer entered [`LayerState::Failed`].
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn frames_composited(&self) -> u64 {
        self.frames_composited
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// A fresh non-owning view for guest code.
    pub fn guest_gpu(&self) -> GuestGpu {
        self.registry.guest_view()
    }

    pub fn target(&self) -> Option<&OffscreenTarget> {
        self.targets.current()
    }

    // ── explicit setup ────────────────────────────────────────────────────

    /// Publishes the host's handles and hands the guest its view.
    ///
    /// [`tick`](Self::tick) does this on its own; call it directly when the
    /// guest needs the handles before the first frame.
    ///
    /// Every GPU object the layer built belongs to the first device it was
    /// given. Handing it a different device fails the layer and leaves the
    /// registry untouched.
    pub fn set_handles(&mut self, host: &HostCtx<'_>) -> Result<(), BridgeError> {
        if self.disposed {
            return Err(BridgeError::Disposed);
        }
        if let Ok(current) = self.registry.device() {
            if current != *host.device {
                let err = BridgeError::DeviceLost {
                    reason: "host re-created its device".into(),
                };
                self.fail(err.clone());
                return Err(err);
            }
        }

        self.registry
            .set_handles(host.instance, host.adapter, host.device, host.queue)?;
        self.invoker.attach(self.registry.guest_view());

        if self.state == LayerState::Uninitialized {
            self.state = LayerState::HandlesBound;
        }
        log::info!("layer `{}`: GPU handles set", self.config.label);
        Ok(())
    }

    /// Makes sure the offscreen target has the given size.
    ///
    /// Recreating the target unbinds the guest callable; it is resolved again
    /// on the next tick.
    pub fn ensure_target(&mut self, width: u32, height: u32) -> Result<TargetStatus, BridgeError> {
        if self.disposed {
            return Err(BridgeError::Disposed);
        }

        let status = self.targets.ensure_target(&self.registry, width, height)?;
        if status == TargetStatus::Recreated {
            self.invoker.unbind();
        }
        self.state = match (self.state, status) {
            (LayerState::HandlesBound, _) | (LayerState::Live, TargetStatus::Recreated) => {
                LayerState::TargetReady
            }
            (state, _) => state,
        };
        Ok(status)
    }

    /// Signals that the host lost its device. Terminal.
    pub fn mark_device_lost(&mut self, reason: impl Into<String>) {
        if self.disposed {
            return;
        }
        self.fail(BridgeError::DeviceLost {
            reason: reason.into(),
        });
    }

    // ── per frame ─────────────────────────────────────────────────────────

    /// Advances the state machine and, once live, renders and composites.
    ///
    /// `destination` is the host's current surface view; its format and size
    /// are described by `host`.
    pub fn tick(&mut self, host: &HostCtx<'_>, destination: &wgpu::TextureView) -> FrameOutcome {
        if self.disposed {
            return FrameOutcome::Disposed;
        }
        if self.state == LayerState::Failed {
            return FrameOutcome::Inert;
        }
        if !self.visible {
            return FrameOutcome::Skipped(SkipReason::Hidden);
        }
        // Keep the current target until the surface has an area again.
        let (width, height) = host.surface_size;
        if self.state != LayerState::Uninitialized && (width == 0 || height == 0) {
            log::debug!(
                "layer `{}`: surface is {width}x{height}, frame skipped (state {})",
                self.config.label,
                self.state
            );
            return FrameOutcome::Skipped(SkipReason::Minimized);
        }

        let outcome = match self.state {
            LayerState::Uninitialized => self.bind_handles(host),
            LayerState::HandlesBound => self.create_target(host),
            LayerState::TargetReady => match self.track_resize(host) {
                Some(outcome) => outcome,
                None => self.go_live(host, destination),
            },
            LayerState::Live => match self.track_resize(host) {
                Some(outcome) => outcome,
                None => self.render(host, destination),
            },
            LayerState::Failed => FrameOutcome::Inert,
        };

        if let FrameOutcome::Skipped(reason) = outcome {
            log::debug!(
                "layer `{}`: frame skipped ({reason:?}, state {})",
                self.config.label,
                self.state
            );
        }
        outcome
    }

    fn bind_handles(&mut self, host: &HostCtx<'_>) -> FrameOutcome {
        if self.registry.is_initialized() {
            self.invoker.attach(self.registry.guest_view());
            self.state = LayerState::HandlesBound;
            return FrameOutcome::Skipped(SkipReason::Setup);
        }

        match self.set_handles(host) {
            Ok(()) => FrameOutcome::Skipped(SkipReason::Setup),
            Err(err) => self.skip_or_fail(err, SkipReason::Setup),
        }
    }

    fn create_target(&mut self, host: &HostCtx<'_>) -> FrameOutcome {
        let (width, height) = host.surface_size;
        match self.ensure_target(width, height) {
            Ok(_) => FrameOutcome::Skipped(SkipReason::Setup),
            Err(err) => {
                log::warn!(
                    "layer `{}`: offscreen target unavailable: {err}",
                    self.config.label
                );
                self.skip_or_fail(err, SkipReason::TargetUnavailable)
            }
        }
    }

    fn go_live(&mut self, host: &HostCtx<'_>, destination: &wgpu::TextureView) -> FrameOutcome {
        if !self.invoker.bind() {
            return FrameOutcome::Skipped(SkipReason::GuestNotReady);
        }
        self.state = LayerState::Live;
        self.render(host, destination)
    }

    /// Recreates the target when the surface size moved away from it.
    ///
    /// Returns `Some` when the frame must be skipped.
    fn track_resize(&mut self, host: &HostCtx<'_>) -> Option<FrameOutcome> {
        if !self.config.track_surface_size {
            return None;
        }
        let current = self.targets.size()?;
        if current == host.surface_size {
            return None;
        }

        let (width, height) = host.surface_size;
        log::info!(
            "layer `{}`: surface resized {}x{} -> {width}x{height}",
            self.config.label,
            current.0,
            current.1
        );

        self.invoker.unbind();
        match self.targets.ensure_target(&self.registry, width, height) {
            Ok(_) => {
                self.state = LayerState::TargetReady;
                Some(FrameOutcome::Skipped(SkipReason::Resized))
            }
            Err(err) => {
                log::warn!(
                    "layer `{}`: could not resize offscreen target: {err}",
                    self.config.label
                );
                self.state = LayerState::HandlesBound;
                Some(self.skip_or_fail(err, SkipReason::TargetUnavailable))
            }
        }
    }

    fn render(&mut self, host: &HostCtx<'_>, destination: &wgpu::TextureView) -> FrameOutcome {
        if let Err(err) = self
            .compositor
            .ensure_pipeline(&self.registry, host.surface_format)
        {
            log::warn!(
                "layer `{}`: blit pipeline unavailable: {err}",
                self.config.label
            );
            return self.skip_or_fail(err, SkipReason::BlitFailed);
        }

        // The guest's submission must be queued before the blit samples the target.
        match self.invoker.invoke(&self.registry.guest_view()) {
            RenderOutcome::Rendered => {}
            RenderOutcome::NotReady => {
                self.state = LayerState::TargetReady;
                return FrameOutcome::Skipped(SkipReason::GuestNotReady);
            }
            RenderOutcome::Failed => return FrameOutcome::Skipped(SkipReason::GuestFailed),
        }

        if let Err(err) = self
            .compositor
            .blit(&self.registry, self.targets.current(), destination)
        {
            log::warn!("layer `{}`: blit failed: {err}", self.config.label);
            return self.skip_or_fail(err, SkipReason::BlitFailed);
        }

        self.frames_composited += 1;
        if self.frames_composited == 1 {
            log::info!("layer `{}`: first frame composited", self.config.label);
        }
        FrameOutcome::Composited
    }

    fn skip_or_fail(&mut self, err: BridgeError, reason: SkipReason) -> FrameOutcome {
        if err.is_recoverable() {
            FrameOutcome::Skipped(reason)
        } else {
            self.fail(err);
            FrameOutcome::Inert
        }
    }

    fn fail(&mut self, err: BridgeError) {
        if self.state == LayerState::Failed {
            return;
        }
        log::error!("layer `{}` failed: {err}", self.config.label);
        self.state = LayerState::Failed;
        self.failure = Some(err.to_string());
    }

    // ── teardown ──────────────────────────────────────────────────────────

    /// Releases everything the layer owns or borrowed, in [`TEARDOWN_ORDER`].
    ///
    /// Returns the steps that ran. A second call does nothing and returns an
    /// empty list. The host's device/queue are not touched.
    pub fn dispose(&mut self) -> Vec<TeardownStep> {
        if self.disposed {
            return Vec::new();
        }

        let mut executed = Vec::with_capacity(TEARDOWN_ORDER.len());
        for step in TEARDOWN_ORDER {
            self.run_teardown_step(step);
            executed.push(step);
        }

        log::info!(
            "layer `{}` disposed after {} composited frames",
            self.config.label,
            self.frames_composited
        );
        executed
    }

    fn run_teardown_step(&mut self, step: TeardownStep) {
        match step {
            TeardownStep::StopGuestCalls => self.disposed = true,
            TeardownStep::ReleaseBindGroup => {
                self.compositor.release_bind_group();
            }
            TeardownStep::ReleasePipeline => {
                self.compositor.release_pipeline();
            }
            TeardownStep::ReleaseSampler => {
                self.compositor.release_sampler();
            }
            TeardownStep::ReleaseGuestReferences => self.invoker.release(),
            TeardownStep::ReleaseTarget => {
                self.targets.release(&self.registry);
            }
            TeardownStep::RevokeHandles => self.registry.revoke_all(),
        }
    }
}

impl Drop for GuestLayer {
    fn drop(&mut self) {
        self.dispose();
    }
}
