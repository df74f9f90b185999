pub mod http;
pub mod stomp_ws;

pub use http::HttpBackend;
pub use stomp_ws::StompWsTransport;
