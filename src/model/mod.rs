//! Accessory → service → characteristic hierarchy.

mod accessory;
mod characteristic;
mod handle;
mod perms;
mod service;
mod spec;

pub use accessory::*;
pub use characteristic::*;
pub use handle::*;
pub use perms::*;
pub use service::*;
pub use spec::*;

#[cfg(test)]
mod model_test;
