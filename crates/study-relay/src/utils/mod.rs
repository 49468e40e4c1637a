//! Utilities module - small text helpers shared by the handlers

pub mod text_utils;

pub use text_utils::TextUtils;
