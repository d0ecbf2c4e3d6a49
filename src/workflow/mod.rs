pub mod search_ctx;
pub mod search_flow;

pub use search_ctx::SearchCtx;
pub use search_flow::{FlowPolicy, SearchFlow, SearchReport, SessionProvider};
