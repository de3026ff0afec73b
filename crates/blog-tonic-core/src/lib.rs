#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates name the same `ObjectId` type the
// identifier helpers produce.
pub use bson;
