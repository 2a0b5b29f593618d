use crate::constants::FIRST_INSTANCE_ID;
use crate::RegistrationError;
use crate::ServiceKey;

/// Top-level device entry. Owns the per-accessory instance-id counter.
#[derive(Debug)]
pub struct Accessory {
    pub(crate) aid: u32,
    /// Highest instance id handed out so far
    pub(crate) last_iid: u32,
    pub(crate) services: Vec<ServiceKey>,
}

impl Accessory {
    pub(crate) fn new(aid: u32) -> Self {
        Self {
            aid,
            last_iid: FIRST_INSTANCE_ID - 1,
            services: Vec::new(),
        }
    }

    pub fn aid(&self) -> u32 {
        self.aid
    }

    pub fn services(&self) -> &[ServiceKey] {
        &self.services
    }

    pub fn last_iid(&self) -> u32 {
        self.last_iid
    }

    /// Next instance id, without consuming it.
    pub(crate) fn peek_iid(&self) -> Result<u32, RegistrationError> {
        self.last_iid
            .checked_add(1)
            .ok_or(RegistrationError::OutOfResource {
                what: "instance ids",
                limit: u32::MAX as u64,
            })
    }

    pub(crate) fn claim_iid(
        &mut self,
        iid: u32,
    ) {
        debug_assert!(iid > self.last_iid);
        self.last_iid = iid;
    }

    /// Continues numbering at `start`. Ids already handed out are never repeated.
    pub(crate) fn reset_iid(
        &mut self,
        start: u32,
    ) -> Result<(), RegistrationError> {
        if start == 0 || start <= self.last_iid {
            return Err(RegistrationError::InstanceIdConflict {
                aid: self.aid,
                requested: start,
                last: self.last_iid,
            });
        }
        self.last_iid = start - 1;
        Ok(())
    }
}
