pub mod command;
pub mod store;

pub use command::CommandError;
pub use store::StoreError;
