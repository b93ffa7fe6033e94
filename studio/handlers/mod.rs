pub mod page;
pub mod channel;
pub mod command;
