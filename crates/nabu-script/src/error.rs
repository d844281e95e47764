use rquickjs::Ctx;
use thiserror::Error;

/// Errors from the script runtime.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("QuickJS error: {0}")]
    Js(#[from] rquickjs::Error),

    /// A script threw; `message` is the thrown error's message.
    #[error("uncaught exception: {message}")]
    Exception { message: String },
}

/// Converts an rquickjs error, pulling the pending exception out of `ctx`.
pub(crate) fn caught(ctx: &Ctx<'_>, err: rquickjs::Error) -> ScriptError {
    match err {
        rquickjs::Error::Exception => ScriptError::Exception {
            message: exception_message(ctx),
        },
        other => ScriptError::Js(other),
    }
}

/// Message of the pending exception. Clears it.
pub(crate) fn exception_message(ctx: &Ctx<'_>) -> String {
    let value = ctx.catch();

    if let Some(exception) = value.as_exception() {
        return exception
            .message()
            .unwrap_or_else(|| "exception without message".to_string());
    }
    // `throw "text"` and friends.
    if let Some(text) = value.as_string().and_then(|s| s.to_string().ok()) {
        return text;
    }
    format!("thrown {:?} value", value.type_of())
}
