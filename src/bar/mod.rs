//! The bar-facing side: wire protocol, click input, and the dispatch
//! loop.

pub mod click_listener;
pub mod dispatch;
pub mod protocol;

pub use click_listener::ClickEvent;
pub use dispatch::Dispatcher;
