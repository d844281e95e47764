use nabu_bridge::{FrameRenderer, GuestError, GuestGpu};
use rquickjs::{Context, Function, Persistent, Value};

use crate::error::exception_message;

/// A script's render entry point, bound once and called every frame.
pub struct ScriptRenderer {
    // Dropped before `context`.
    func: Persistent<Function<'static>>,
    context: Context,
    name: String,
}

impl ScriptRenderer {
    pub(crate) fn new(
        context: Context,
        name: impl Into<String>,
        func: Persistent<Function<'static>>,
    ) -> Self {
        Self {
            func,
            context,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FrameRenderer for ScriptRenderer {
    fn render_frame(&mut self, _gpu: &GuestGpu) -> Result<bool, GuestError> {
        self.context.with(|ctx| {
            // A script that deleted or replaced its entry point is treated as unloaded.
            let current: Value = ctx.globals().get(self.name.as_str()).map_err(|err| {
                GuestError::Raised {
                    message: err.to_string(),
                }
            })?;
            if !current.is_function() {
                return Err(GuestError::Unavailable {
                    entry_point: self.name.clone(),
                });
            }

            let func = self
                .func
                .clone()
                .restore(&ctx)
                .map_err(|err| GuestError::Raised {
                    message: err.to_string(),
                })?;

            match func.call::<_, Value>(()) {
                Ok(result) => Ok(truthy(&result)),
                Err(rquickjs::Error::Exception) => Err(GuestError::Raised {
                    message: exception_message(&ctx),
                }),
                Err(err) => Err(GuestError::Raised {
                    message: err.to_string(),
                }),
            }
        })
    }
}

/// JavaScript truthiness.
pub(crate) fn truthy(value: &Value<'_>) -> bool {
    if let Some(b) = value.as_bool() {
        return b;
    }
    if value.is_undefined() || value.is_null() {
        return false;
    }
    if let Some(i) = value.as_int() {
        return i != 0;
    }
    if let Some(f) = value.as_float() {
        return f != 0.0 && !f.is_nan();
    }
    if let Some(s) = value.as_string() {
        return s.to_string().map(|s| !s.is_empty()).unwrap_or(true);
    }
    true
}
