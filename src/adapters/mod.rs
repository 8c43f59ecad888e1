// Adapters layer: concrete implementations for external systems.

pub mod http;
pub mod lua;
pub mod storage;

pub use http::HttpPlatform;
pub use lua::LuaScript;
pub use storage::LocalStorage;
