#![allow(clippy::missing_safety_doc)]
pub mod ptr;
