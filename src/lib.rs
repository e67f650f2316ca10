//! Scoped translation cache: plain-text `key=value` translation files, tiered lookup with
//! whitespace reconstruction, regex rules, and an append-only log of learned translations.

pub mod cache;
pub mod codec;
pub mod config;
pub mod directive;
pub mod error;
pub mod ffi;
pub mod markers;
pub mod normalize;
pub mod partial;
pub mod richtext;
pub mod rules;
pub mod store;
pub mod templating;
pub mod textutil;
