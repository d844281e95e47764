//! Guest render invocation.
//!
//! The guest runtime is an external collaborator. It is reached through two
//! small traits:
//! - [`GuestRuntime`] resolves the per-frame entry point by name and owns any
//!   guest-side state.
//! - [`FrameRenderer`] is the resolved entry point: "render one frame into the
//!   shared target".
//!
//! [`GuestRenderInvoker`] holds exactly one renderer at a time. Until the entry
//! point resolves it holds a [`NullRenderer`]; afterwards it holds the bound
//! renderer. Unbinding swaps the null renderer back in.

use crate::error::GuestError;
use crate::handles::GuestGpu;

/// The guest's per-frame entry point.
pub trait FrameRenderer {
    /// Renders one frame into the offscreen target.
    ///
    /// GPU work must be submitted to the shared queue before returning.
    /// `Ok(false)` mirrors a falsy return value from the guest.
    fn render_frame(&mut self, gpu: &GuestGpu) -> Result<bool, GuestError>;
}

impl<F> FrameRenderer for F
where
    F: FnMut(&GuestGpu) -> Result<bool, GuestError>,
{
    fn render_frame(&mut self, gpu: &GuestGpu) -> Result<bool, GuestError> {
        self(gpu)
    }
}

/// Contract implemented by embedded runtimes.
pub trait GuestRuntime {
    /// Called once when the shared handles become available.
    fn attach(&mut self, gpu: GuestGpu) {
        let _ = gpu;
    }

    /// Looks up the entry point named `entry_point`.
    ///
    /// `Ok(None)` means "not exposed yet" and is not an error.
    fn resolve(&mut self, entry_point: &str)
    -> Result<Option<Box<dyn FrameRenderer>>, GuestError>;

    /// Releases guest-side references during disposal.
    fn cleanup(&mut self) {}
}

/// Stand-in renderer used while the guest is not ready.
pub struct NullRenderer {
    entry_point: String,
}

impl NullRenderer {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
        }
    }
}

impl FrameRenderer for NullRenderer {
    fn render_frame(&mut self, _gpu: &GuestGpu) -> Result<bool, GuestError> {
        Err(GuestError::Unavailable {
            entry_point: self.entry_point.clone(),
        })
    }
}

/// Result of one guest render call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderOutcome {
    /// The guest rendered and submitted its frame.
    Rendered,
    /// The entry point is not available; skip compositing silently.
    NotReady,
    /// The entry point ran and failed; the error has been logged.
    Failed,
}

/// Calls into the guest once per frame.
pub struct GuestRenderInvoker {
    // Field order matters: the renderer may hold guest objects that must be
    // released before the runtime that created them.
    renderer: Box<dyn FrameRenderer>,
    runtime: Box<dyn GuestRuntime>,
    entry_point: String,
    bound: bool,
    attached: bool,
}

impl GuestRenderInvoker {
    pub fn new(runtime: Box<dyn GuestRuntime>, entry_point: impl Into<String>) -> Self {
        let entry_point = entry_point.into();
        Self {
            renderer: Box::new(NullRenderer::new(entry_point.clone())),
            runtime,
            entry_point,
            bound: false,
            attached: false,
        }
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Hands the shared-handle view to the runtime. Only the first call has an effect.
    pub fn attach(&mut self, gpu: GuestGpu) {
        if self.attached {
            return;
        }
        self.runtime.attach(gpu);
        self.attached = true;
    }

    /// Resolves the entry point if it is not bound yet.
    ///
    /// Returns `true` when a renderer is bound after the call.
    pub fn bind(&mut self) -> bool {
        if self.bound {
            return true;
        }

        match self.runtime.resolve(&self.entry_point) {
            Ok(Some(renderer)) => {
                self.renderer = renderer;
                self.bound = true;
                log::info!("guest entry point `{}` bound", self.entry_point);
                true
            }
            Ok(None) => {
                log::debug!("guest entry point `{}` not exposed yet", self.entry_point);
                false
            }
            Err(err) => {
                log::warn!(
                    "resolving guest entry point `{}` failed: {err}",
                    self.entry_point
                );
                false
            }
        }
    }

    /// Swaps the null renderer back in; the entry point must be bound again
    /// with [`bind`](Self::bind).
    pub fn unbind(&mut self) {
        if !self.bound {
            return;
        }
        self.renderer = Box::new(NullRenderer::new(self.entry_point.clone()));
        self.bound = false;
    }

    /// Renders one guest frame through whichever renderer is held.
    ///
    /// Never resolves the entry point. While unbound the [`NullRenderer`]
    /// answers and the frame is [`RenderOutcome::NotReady`].
    pub fn invoke(&mut self, gpu: &GuestGpu) -> RenderOutcome {
        match self.renderer.render_frame(gpu) {
            Ok(true) => RenderOutcome::Rendered,
            Ok(false) => {
                log::warn!("guest `{}` reported failure", self.entry_point);
                RenderOutcome::Failed
            }
            Err(GuestError::Unavailable { .. }) => {
                if self.bound {
                    log::debug!(
                        "guest entry point `{}` became unavailable",
                        self.entry_point
                    );
                    self.unbind();
                }
                RenderOutcome::NotReady
            }
            Err(GuestError::Raised { message }) => {
                log::warn!("guest `{}` raised: {message}", self.entry_point);
                RenderOutcome::Failed
            }
        }
    }

    /// Releases every guest-side reference: the bound renderer first, then the
    /// runtime's own cleanup hook.
    pub fn release(&mut self) {
        self.unbind();
        self.runtime.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::handles::HandleRegistry;

    /// Runtime whose entry point appears after `ready_after` lookups.
    struct ScriptedRuntime {
        lookups: u32,
        ready_after: u32,
        results: Rc<Cell<u32>>,
        cleanups: Rc<Cell<u32>>,
        outcome: fn(u32) -> Result<bool, GuestError>,
    }

    impl GuestRuntime for ScriptedRuntime {
        fn resolve(
            &mut self,
            _entry_point: &str,
        ) -> Result<Option<Box<dyn FrameRenderer>>, GuestError> {
            self.lookups += 1;
            if self.lookups <= self.ready_after {
                return Ok(None);
            }
            let calls = self.results.clone();
            let outcome = self.outcome;
            Ok(Some(Box::new(move |_gpu: &GuestGpu| {
                calls.set(calls.get() + 1);
                outcome(calls.get())
            })))
        }

        fn cleanup(&mut self) {
            self.cleanups.set(self.cleanups.get() + 1);
        }
    }

    fn invoker(
        ready_after: u32,
        outcome: fn(u32) -> Result<bool, GuestError>,
    ) -> (GuestRenderInvoker, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let cleanups = Rc::new(Cell::new(0));
        let runtime = ScriptedRuntime {
            lookups: 0,
            ready_after,
            results: calls.clone(),
            cleanups: cleanups.clone(),
            outcome,
        };
        (
            GuestRenderInvoker::new(Box::new(runtime), "render_frame"),
            calls,
            cleanups,
        )
    }

    // ── binding ───────────────────────────────────────────────────────────

    #[test]
    fn not_ready_until_entry_point_is_exposed() {
        let registry = HandleRegistry::new();
        let gpu = registry.guest_view();
        let (mut invoker, calls, _) = invoker(2, |_| Ok(true));

        assert!(!invoker.bind());
        assert!(!invoker.bind());
        assert!(invoker.bind());
        assert!(invoker.is_bound());
        assert_eq!(invoker.invoke(&gpu), RenderOutcome::Rendered);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn unbound_invoke_hits_the_null_renderer() {
        let registry = HandleRegistry::new();
        let gpu = registry.guest_view();
        let (mut invoker, calls, _) = invoker(0, |_| Ok(true));

        // The entry point is resolvable, but invoke alone never resolves it.
        assert_eq!(invoker.invoke(&gpu), RenderOutcome::NotReady);
        assert_eq!(invoker.invoke(&gpu), RenderOutcome::NotReady);
        assert!(!invoker.is_bound());
        assert_eq!(calls.get(), 0);

        assert!(invoker.bind());
        assert_eq!(invoker.invoke(&gpu), RenderOutcome::Rendered);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn bound_renderer_is_cached() {
        let registry = HandleRegistry::new();
        let gpu = registry.guest_view();
        let (mut invoker, calls, _) = invoker(0, |_| Ok(true));

        assert!(invoker.bind());
        for _ in 0..5 {
            assert!(invoker.bind());
            assert_eq!(invoker.invoke(&gpu), RenderOutcome::Rendered);
        }
        assert_eq!(calls.get(), 5);
    }

    // ── outcomes ──────────────────────────────────────────────────────────

    #[test]
    fn falsy_result_is_a_failure() {
        let registry = HandleRegistry::new();
        let (mut invoker, _, _) = invoker(0, |_| Ok(false));
        assert!(invoker.bind());
        assert_eq!(invoker.invoke(&registry.guest_view()), RenderOutcome::Failed);
        assert!(invoker.is_bound());
    }

    #[test]
    fn raised_error_keeps_the_binding() {
        let registry = HandleRegistry::new();
        let gpu = registry.guest_view();
        let (mut invoker, calls, _) = invoker(0, |n| {
            if n == 1 {
                Err(GuestError::Raised {
                    message: "ZeroDivisionError".into(),
                })
            } else {
                Ok(true)
            }
        });

        assert!(invoker.bind());
        assert_eq!(invoker.invoke(&gpu), RenderOutcome::Failed);
        assert!(invoker.is_bound());
        assert_eq!(invoker.invoke(&gpu), RenderOutcome::Rendered);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn unavailable_entry_point_unbinds() {
        let registry = HandleRegistry::new();
        let (mut invoker, _, _) = invoker(0, |_| {
            Err(GuestError::Unavailable {
                entry_point: "render_frame".into(),
            })
        });

        assert!(invoker.bind());
        assert_eq!(invoker.invoke(&registry.guest_view()), RenderOutcome::NotReady);
        assert!(!invoker.is_bound());
    }

    #[test]
    fn null_renderer_reports_unavailable() {
        let registry = HandleRegistry::new();
        let mut renderer = NullRenderer::new("render_frame");
        assert_eq!(
            renderer.render_frame(&registry.guest_view()),
            Err(GuestError::Unavailable {
                entry_point: "render_frame".into()
            })
        );
    }

    // ── release ───────────────────────────────────────────────────────────

    #[test]
    fn release_unbinds_and_runs_cleanup() {
        let registry = HandleRegistry::new();
        let (mut invoker, _, cleanups) = invoker(0, |_| Ok(true));
        assert!(invoker.bind());
        assert_eq!(invoker.invoke(&registry.guest_view()), RenderOutcome::Rendered);

        invoker.release();
        assert!(!invoker.is_bound());
        assert_eq!(cleanups.get(), 1);
    }
}
