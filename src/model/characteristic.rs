use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use dashmap::DashSet;

use crate::Format;
use crate::HapType;
use crate::ObserverId;
use crate::Perms;
use crate::Value;
use crate::ValueCell;

/// Write marker of the current poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateFlag {
    None = 0,
    Written = 1,
    WrittenWithResponse = 2,
}

impl UpdateFlag {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => UpdateFlag::Written,
            2 => UpdateFlag::WrittenWithResponse,
            _ => UpdateFlag::None,
        }
    }
}

/// Numeric bounds, already coerced into the characteristic's format
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub min: Value,
    pub max: Value,
    pub step: Option<Value>,
}

/// One readable/writable/observable attribute.
///
/// Values live in two cells: `value` is what readers observe, `pending` holds a
/// remote candidate while the owning service decides whether to accept it.
pub struct Characteristic {
    pub(crate) aid: u32,
    pub(crate) iid: u32,
    pub(crate) type_id: HapType,
    pub(crate) name: String,
    pub(crate) perms: Perms,
    pub(crate) value: ValueCell,
    pub(crate) pending: ValueCell,
    pub(crate) range: Option<Range>,
    pub(crate) valid_values: Option<BTreeSet<u32>>,
    pub(crate) description: Option<String>,
    pub(crate) unit: Option<String>,
    pub(crate) durable_key: Option<String>,
    pub(crate) subscribers: DashSet<ObserverId>,
    epoch: Instant,
    /// nanos since `epoch`
    updated_at: AtomicU64,
    update_flag: AtomicU8,
    retired: AtomicBool,
}

impl Characteristic {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        aid: u32,
        iid: u32,
        type_id: HapType,
        name: String,
        perms: Perms,
        initial: Value,
        range: Option<Range>,
        valid_values: Option<BTreeSet<u32>>,
        description: Option<String>,
        unit: Option<String>,
        durable_key: Option<String>,
    ) -> Self {
        Self {
            aid,
            iid,
            type_id,
            name,
            perms,
            pending: ValueCell::new(initial.clone()),
            value: ValueCell::new(initial),
            range,
            valid_values,
            description,
            unit,
            durable_key,
            subscribers: DashSet::new(),
            epoch: Instant::now(),
            updated_at: AtomicU64::new(0),
            update_flag: AtomicU8::new(UpdateFlag::None as u8),
            retired: AtomicBool::new(false),
        }
    }

    pub fn aid(&self) -> u32 {
        self.aid
    }

    pub fn iid(&self) -> u32 {
        self.iid
    }

    pub fn type_id(&self) -> HapType {
        self.type_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> Format {
        self.value.format()
    }

    pub fn perms(&self) -> Perms {
        self.perms
    }

    pub fn range(&self) -> Option<&Range> {
        self.range.as_ref()
    }

    pub fn valid_values(&self) -> Option<&BTreeSet<u32>> {
        self.valid_values.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn durable_key(&self) -> Option<&str> {
        self.durable_key.as_deref()
    }

    pub fn get_value(&self) -> Value {
        self.value.get()
    }

    /// Candidate of an in-flight remote write; equals `get_value()` otherwise.
    pub fn get_pending_value(&self) -> Value {
        self.pending.get()
    }

    /// Whether a remote write touched this characteristic in the current poll cycle
    pub fn was_written(&self) -> bool {
        self.update_flag() != UpdateFlag::None
    }

    pub fn update_flag(&self) -> UpdateFlag {
        UpdateFlag::from_u8(self.update_flag.load(Ordering::Acquire))
    }

    pub fn time_since_update(&self) -> Duration {
        let updated = Duration::from_nanos(self.updated_at.load(Ordering::Acquire));
        self.epoch.elapsed().saturating_sub(updated)
    }

    pub fn is_subscribed(
        &self,
        observer: ObserverId,
    ) -> bool {
        self.subscribers.contains(&observer)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Set once the owning accessory is removed; retired characteristics no
    /// longer notify or persist.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Range and valid-values check. Values of non-numeric formats always pass.
    pub(crate) fn admits(
        &self,
        candidate: &Value,
    ) -> bool {
        if let Some(range) = &self.range {
            if !candidate.within(&range.min, &range.max) {
                return false;
            }
        }
        match &self.valid_values {
            Some(valid) => candidate
                .as_u32()
                .map(|v| valid.contains(&v))
                .unwrap_or(false),
            None => true,
        }
    }

    /// Local set path: both cells take the value.
    pub(crate) fn store_local(
        &self,
        value: Value,
    ) {
        self.pending.put(value.clone());
        self.value.put(value);
        self.touch();
    }

    pub(crate) fn stage(
        &self,
        candidate: Value,
    ) {
        self.pending.put(candidate);
    }

    pub(crate) fn revert_staged(&self) {
        self.pending.copy_from(&self.value);
    }

    pub(crate) fn commit_staged(
        &self,
        flag: UpdateFlag,
    ) {
        self.value.copy_from(&self.pending);
        self.update_flag.store(flag as u8, Ordering::Release);
        self.touch();
    }

    pub(crate) fn clear_update_flag(&self) {
        self.update_flag
            .store(UpdateFlag::None as u8, Ordering::Release);
    }

    /// Returns false when the observer was already subscribed.
    pub(crate) fn subscribe(
        &self,
        observer: ObserverId,
    ) -> bool {
        self.subscribers.insert(observer)
    }

    /// Returns false when the observer was not subscribed.
    pub(crate) fn unsubscribe(
        &self,
        observer: ObserverId,
    ) -> bool {
        self.subscribers.remove(&observer).is_some()
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
        self.subscribers.clear();
    }

    fn touch(&self) {
        let nanos = self.epoch.elapsed().as_nanos().min(u64::MAX as u128) as u64;
        self.updated_at.store(nanos, Ordering::Release);
    }
}

impl fmt::Debug for Characteristic {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Characteristic")
            .field("aid", &self.aid)
            .field("iid", &self.iid)
            .field("type", &self.type_id)
            .field("name", &self.name)
            .field("value", &self.value)
            .field("durable_key", &self.durable_key)
            .finish()
    }
}
