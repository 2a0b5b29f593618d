use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::Characteristic;
use crate::HapType;

/// Veto hook run while a remote candidate is staged. Returning `false`
/// rejects the write.
pub type UpdateHandler = Box<dyn Fn(&Characteristic) -> bool + Send + Sync>;

/// Per-cycle hook run by [`crate::AttributeDb::poll`] before notifications
/// are drained.
pub type PollHandler = Box<dyn Fn(&Service) + Send + Sync>;

/// Arena handle of a service inside its [`crate::AttributeTree`]. Handles are
/// never reused, so a handle to a removed service stays unresolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKey(pub(crate) usize);

impl ServiceKey {
    pub fn index(&self) -> usize {
        self.0
    }
}

pub struct Service {
    pub(crate) aid: u32,
    pub(crate) iid: u32,
    pub(crate) type_id: HapType,
    pub(crate) name: String,
    pub(crate) primary: bool,
    pub(crate) hidden: bool,
    pub(crate) characteristics: Vec<Arc<Characteristic>>,
    pub(crate) linked: Vec<ServiceKey>,
    /// Catalog-required characteristic types, checked at finalize
    pub(crate) required: &'static [HapType],
    pub(crate) handler: Option<UpdateHandler>,
    pub(crate) poll_handler: Option<PollHandler>,
}

impl Service {
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

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn characteristics(&self) -> &[Arc<Characteristic>] {
        &self.characteristics
    }

    pub fn linked(&self) -> &[ServiceKey] {
        &self.linked
    }

    pub(crate) fn has_characteristic(
        &self,
        type_id: HapType,
    ) -> bool {
        self.characteristics.iter().any(|c| c.type_id == type_id)
    }

    /// Runs the update handler against a staged candidate.
    pub(crate) fn approve(
        &self,
        characteristic: &Characteristic,
    ) -> bool {
        match &self.handler {
            Some(handler) => {
                let approved = handler(characteristic);
                if !approved {
                    debug!(
                        aid = self.aid,
                        iid = characteristic.iid,
                        service = %self.name,
                        "Update handler rejected write"
                    );
                }
                approved
            }
            None => true,
        }
    }

    /// Runs the poll hook; returns whether one is installed.
    pub(crate) fn run_poll(&self) -> bool {
        match &self.poll_handler {
            Some(hook) => {
                hook(self);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Service")
            .field("aid", &self.aid)
            .field("iid", &self.iid)
            .field("type", &self.type_id)
            .field("name", &self.name)
            .field("characteristics", &self.characteristics.len())
            .field("linked", &self.linked)
            .finish()
    }
}
