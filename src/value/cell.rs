use std::fmt;

use parking_lot::RwLock;

use super::Format;
use super::Value;
use crate::ValueError;

/// Storage slot for one characteristic value.
///
/// The format is fixed at construction; every store is coerced into it, so the
/// slot can never hold a value of another format.
pub struct ValueCell {
    format: Format,
    slot: RwLock<Value>,
}

impl ValueCell {
    pub fn new(value: Value) -> Self {
        Self {
            format: value.format(),
            slot: RwLock::new(value),
        }
    }

    pub fn empty(format: Format) -> Self {
        Self::new(Value::empty(format))
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn get(&self) -> Value {
        self.slot.read().clone()
    }

    /// Reads through a borrow, without cloning string or binary payloads.
    pub fn with<R>(
        &self,
        f: impl FnOnce(&Value) -> R,
    ) -> R {
        f(&self.slot.read())
    }

    pub fn set(
        &self,
        value: Value,
    ) -> Result<(), ValueError> {
        let value = value.coerce(self.format)?;
        *self.slot.write() = value;
        Ok(())
    }

    /// Stores a value already coerced into this cell's format.
    pub(crate) fn put(
        &self,
        value: Value,
    ) {
        debug_assert_eq!(value.format(), self.format);
        *self.slot.write() = value;
    }

    /// Copies another cell of the same format into this one.
    pub fn copy_from(
        &self,
        other: &ValueCell,
    ) {
        debug_assert_eq!(self.format, other.format);
        let value = other.get();
        *self.slot.write() = value;
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ValueCell")
            .field("format", &self.format)
            .field("value", &*self.slot.read())
            .finish()
    }
}
