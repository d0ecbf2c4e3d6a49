pub mod cancel;
pub mod logging;
pub mod strategy;

pub use cancel::until_cancelled;
pub use strategy::first_success;
