//! JavaScript guest for the nabu bridge.
//!
//! A [`ScriptRuntime`] runs QuickJS and implements
//! [`GuestRuntime`](nabu_bridge::GuestRuntime): scripts define a global
//! `render_frame()` and draw into the shared target through the global `gpu`
//! object installed on attach.
//!
//! ```js
//! function render_frame() {
//!     const [w, h] = gpu.size();
//!     return gpu.clear(gpu.view(), 0.1, 0.2, 0.3, 1.0);
//! }
//! ```

mod binding;
mod error;
mod renderer;
mod runtime;

pub use binding::clear_view;
pub use error::ScriptError;
pub use renderer::ScriptRenderer;
pub use runtime::ScriptRuntime;

pub use rquickjs;
