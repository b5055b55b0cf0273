pub mod app_init;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod domain;
pub mod event;
pub mod host;
pub mod id;
pub mod logging;
pub mod rate_limit;
pub mod result;
pub mod router;
pub mod service;
pub mod storage;

#[cfg(test)]
pub mod test_support;
