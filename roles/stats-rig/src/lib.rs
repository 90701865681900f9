pub mod poller;
pub mod stats_handler;
pub mod upstream;
