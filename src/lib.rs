pub mod api;
pub mod cache;
pub mod friends;
pub mod logging;
pub mod pipeline;
pub mod types;
pub mod util;
