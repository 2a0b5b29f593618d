//! Attribute database engine for smart-home accessory servers.
//!
//! A typed accessory → service → characteristic tree with instance-id
//! assignment, validated remote writes, durable values, batched change
//! notification and a structural configuration version.
//!
//! ```ignore
//! let mut db = AttributeDb::open(DbConfig::new()?.validate()?)?;
//! let aid = db.add_accessory(AidRequest::Exact(1))?;
//! let info = db.add_service(aid, ServiceSpec::of(svc::ACCESSORY_INFORMATION)?)?;
//! db.add_characteristic(info, CharSpec::of(chr::IDENTIFY)?)?;
//! let light = db.add_service(aid, ServiceSpec::of(svc::LIGHT_BULB)?)?;
//! let on = db.add_characteristic(light, CharSpec::of(chr::ON)?.durable())?;
//! db.finalize()?;
//!
//! on.set_value(true, true)?;
//! let payloads = db.poll();
//! ```

mod catalog;
mod config;
mod constants;
mod db;
mod errors;
mod hasher;
mod model;
mod notify;
mod storage;
mod tree;
mod update;
mod value;
pub mod utils;

pub use catalog::*;
pub use config::*;
pub use db::*;
pub use errors::*;
pub use hasher::*;
pub use model::*;
pub use notify::*;
pub use storage::*;
pub use tree::*;
pub use update::*;
pub use utils::*;
pub use value::*;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
