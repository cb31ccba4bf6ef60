mod command_dispatcher;
mod device_cache;
mod status_poller;
mod store_client;

pub use command_dispatcher::*;
pub use device_cache::*;
pub use status_poller::*;
pub use store_client::*;
