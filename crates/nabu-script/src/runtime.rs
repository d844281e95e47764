use nabu_bridge::{FrameRenderer, GuestError, GuestGpu, GuestRuntime};
use rquickjs::{Context, Function, Persistent, Runtime, Value};

use crate::binding;
use crate::error::{ScriptError, caught, exception_message};
use crate::renderer::ScriptRenderer;

/// Name of the optional global a script defines to release its own state.
pub const CLEANUP_FUNCTION: &str = "cleanup";

/// A QuickJS runtime acting as a bridge guest.
pub struct ScriptRuntime {
    // Dropped before `runtime`.
    context: Context,
    runtime: Runtime,
    attached: bool,
}

impl ScriptRuntime {
    pub fn new() -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        Ok(Self {
            context,
            runtime,
            attached: false,
        })
    }

    /// Creates a runtime and evaluates `source` in it.
    pub fn with_source(source: &str) -> Result<Self, ScriptError> {
        let runtime = Self::new()?;
        runtime.execute(source)?;
        Ok(runtime)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Caps the QuickJS heap. `0` removes the limit.
    pub fn set_memory_limit(&self, bytes: usize) {
        self.runtime.set_memory_limit(bytes);
    }

    /// Evaluates `source` as a global script.
    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(source)
                .map_err(|err| caught(&ctx, err))
        })
    }

    /// Calls a global function by name with no arguments.
    pub fn call_function(&self, name: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            let func: Function = ctx.globals().get(name)?;
            func.call::<_, ()>(()).map_err(|err| caught(&ctx, err))
        })
    }

    /// Returns `true` if the global `name` is a function.
    pub fn has_function(&self, name: &str) -> bool {
        self.context.with(|ctx| {
            ctx.globals()
                .get::<_, Value>(name)
                .map(|value| value.is_function())
                .unwrap_or(false)
        })
    }
}

impl GuestRuntime for ScriptRuntime {
    fn attach(&mut self, gpu: GuestGpu) {
        let installed = self.context.with(|ctx| {
            binding::install(&ctx, gpu).map_err(|err| caught(&ctx, err))
        });
        match installed {
            Ok(()) => {
                self.attached = true;
                log::debug!("script runtime attached to shared GPU handles");
            }
            Err(err) => log::error!("installing the `gpu` global failed: {err}"),
        }
    }

    fn resolve(
        &mut self,
        entry_point: &str,
    ) -> Result<Option<Box<dyn FrameRenderer>>, GuestError> {
        self.context.with(|ctx| {
            let value: Value = ctx.globals().get(entry_point).map_err(|err| match err {
                rquickjs::Error::Exception => GuestError::Raised {
                    message: exception_message(&ctx),
                },
                other => GuestError::Raised {
                    message: other.to_string(),
                },
            })?;

            let Some(func) = value.into_function() else {
                return Ok(None);
            };

            let renderer = ScriptRenderer::new(
                self.context.clone(),
                entry_point,
                Persistent::save(&ctx, func),
            );
            Ok(Some(Box::new(renderer) as Box<dyn FrameRenderer>))
        })
    }

    fn cleanup(&mut self) {
        if !self.has_function(CLEANUP_FUNCTION) {
            return;
        }
        if let Err(err) = self.call_function(CLEANUP_FUNCTION) {
            log::warn!("script `{CLEANUP_FUNCTION}` failed: {err}");
        }
    }
}
