pub mod config;
pub mod cost;
pub mod error;
pub mod handler;
pub mod http_client;
pub mod model;
pub mod report;
pub mod reporters;
pub mod timer;
#[cfg(test)]
pub mod test_util;
