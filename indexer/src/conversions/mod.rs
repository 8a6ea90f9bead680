//! Conversions from the change-stream encoding to plain JSON.

pub mod attribute;
