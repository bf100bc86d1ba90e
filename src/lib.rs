pub mod api;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod entities;
pub mod error;
pub mod external;
pub mod format;
pub mod server;
