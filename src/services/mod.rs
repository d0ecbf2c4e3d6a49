pub mod captcha;
pub mod gateway;
pub mod ocr;
pub mod portal_http;
pub mod record_sink;
pub mod result_parser;
pub mod search_executor;
pub mod session_bridge;
pub mod topology;

pub use captcha::{CaptchaResolver, CaptchaStrategy, FallbackStrategy, OcrStrategy};
pub use gateway::{GatewayTimings, PortalGateway, Ready};
pub use ocr::{OcrEngine, TesseractCli};
pub use portal_http::{PortalHttp, ReqwestPortal};
pub use record_sink::{JsonlRecordSink, MemoryRecordSink, RecordSink};
pub use search_executor::{SearchExecutor, SearchPolicy};
pub use session_bridge::SessionBridge;
pub use topology::{TopologyDiscoverer, TopologyTimings};
