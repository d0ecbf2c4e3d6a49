pub mod js_executor;
pub mod surface;

pub use js_executor::JsExecutor;
pub use surface::{BrowserCookie, Locator, PortalSurface};
