//! citechat library exports for testing

pub mod api;
pub mod chat;
pub mod core;
pub mod term;

#[cfg(test)]
pub mod test_support;
