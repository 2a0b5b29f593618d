//! Accessory collection, instance-id assignment and `(aid, iid)` resolution.
//!
//! Services live in an arena indexed by [`ServiceKey`]. Removing an accessory
//! empties its arena slots instead of compacting, so a stale key can never
//! alias a newer service.

mod serialize;

pub use serialize::*;


use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::svc;
use crate::Accessory;
use crate::CharSpec;
use crate::Characteristic;
use crate::Error;
use crate::RegistrationError;
use crate::Result;
use crate::Service;
use crate::ServiceKey;
use crate::ServiceSpec;

/// Accessory id requested at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AidRequest {
    Exact(u32),
    /// One past the highest registered id
    NextAvailable,
}

/// Index entry of one characteristic
#[derive(Debug, Clone)]
pub struct CharSlot {
    pub service: ServiceKey,
    pub characteristic: Arc<Characteristic>,
}

#[derive(Debug)]
pub struct AttributeTree {
    accessories: Vec<Accessory>,
    services: Vec<Option<Service>>,
    index: HashMap<(u32, u32), CharSlot>,
    finalized: bool,
    /// Registration faults that forbid finalizing
    faults: Vec<String>,
    max_accessories: usize,
}

impl AttributeTree {
    pub fn new(max_accessories: usize) -> Self {
        Self {
            accessories: Vec::new(),
            services: Vec::new(),
            index: HashMap::new(),
            finalized: false,
            faults: Vec::new(),
            max_accessories,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }

    pub fn faults(&self) -> &[String] {
        &self.faults
    }

    pub fn accessories(&self) -> &[Accessory] {
        &self.accessories
    }

    pub fn accessory(
        &self,
        aid: u32,
    ) -> Option<&Accessory> {
        self.accessories.iter().find(|a| a.aid == aid)
    }

    pub fn service(
        &self,
        key: ServiceKey,
    ) -> Option<&Service> {
        self.services.get(key.0).and_then(Option::as_ref)
    }

    pub fn locate(
        &self,
        aid: u32,
        iid: u32,
    ) -> Option<&CharSlot> {
        self.index.get(&(aid, iid))
    }

    pub fn find(
        &self,
        aid: u32,
        iid: u32,
    ) -> Option<&Arc<Characteristic>> {
        self.locate(aid, iid).map(|slot| &slot.characteristic)
    }

    /// Characteristics in registration order
    /// Live services in accessory order
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.accessories
            .iter()
            .flat_map(|a| a.services.iter())
            .filter_map(|key| self.service(*key))
    }

    pub fn characteristics(&self) -> impl Iterator<Item = &Arc<Characteristic>> {
        self.services().flat_map(|s| s.characteristics.iter())
    }

    /// Number of registered characteristics
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    pub fn add_accessory(
        &mut self,
        request: AidRequest,
    ) -> Result<u32> {
        if self.accessories.len() >= self.max_accessories {
            return Err(RegistrationError::OutOfResource {
                what: "accessories",
                limit: self.max_accessories as u64,
            }
            .into());
        }
        let aid = match request {
            AidRequest::Exact(0) => return Err(RegistrationError::InvalidAccessoryId.into()),
            AidRequest::Exact(aid) => {
                if self.accessory(aid).is_some() {
                    self.faults.push(format!("accessory id {aid} registered twice"));
                    return Err(RegistrationError::DuplicateIdentity { aid }.into());
                }
                aid
            }
            AidRequest::NextAvailable => {
                let max = self.accessories.iter().map(|a| a.aid).max().unwrap_or(0);
                max.checked_add(1).ok_or(RegistrationError::OutOfResource {
                    what: "accessory ids",
                    limit: u32::MAX as u64,
                })?
            }
        };
        self.accessories.push(Accessory::new(aid));
        debug!(aid, "Accessory registered");
        Ok(aid)
    }

    pub fn add_service(
        &mut self,
        aid: u32,
        spec: ServiceSpec,
    ) -> Result<ServiceKey> {
        let key = ServiceKey(self.services.len());
        let accessory = self
            .accessories
            .iter_mut()
            .find(|a| a.aid == aid)
            .ok_or(RegistrationError::AccessoryNotFound { aid })?;
        let iid = accessory.peek_iid()?;
        accessory.claim_iid(iid);
        accessory.services.push(key);

        let service = spec.build(aid, iid);
        debug!(aid, iid, service = %service.name, "Service registered");
        self.services.push(Some(service));
        Ok(key)
    }

    pub fn add_characteristic(
        &mut self,
        key: ServiceKey,
        spec: CharSpec,
    ) -> Result<Arc<Characteristic>> {
        let aid = self
            .service(key)
            .map(|s| s.aid)
            .ok_or(RegistrationError::ServiceNotFound(key.0))?;
        let accessory = self
            .accessories
            .iter_mut()
            .find(|a| a.aid == aid)
            .ok_or(RegistrationError::AccessoryNotFound { aid })?;
        let iid = accessory.peek_iid()?;
        let characteristic = Arc::new(spec.build(aid, iid)?);
        accessory.claim_iid(iid);

        if let Some(Some(service)) = self.services.get_mut(key.0) {
            service.characteristics.push(characteristic.clone());
        }
        self.index.insert(
            (aid, iid),
            CharSlot {
                service: key,
                characteristic: characteristic.clone(),
            },
        );
        debug!(aid, iid, name = %characteristic.name, "Characteristic registered");
        Ok(characteristic)
    }

    pub fn link_services(
        &mut self,
        from: ServiceKey,
        to: ServiceKey,
    ) -> Result<()> {
        if self.service(to).is_none() {
            return Err(RegistrationError::DanglingLink {
                from: from.0,
                to: to.0,
            }
            .into());
        }
        match self.services.get_mut(from.0).and_then(Option::as_mut) {
            Some(service) => {
                if !service.linked.contains(&to) {
                    service.linked.push(to);
                }
                Ok(())
            }
            None => Err(RegistrationError::DanglingLink {
                from: from.0,
                to: to.0,
            }
            .into()),
        }
    }

    /// Continues the accessory's numbering at `start`. Only before finalize.
    pub fn reset_instance_ids(
        &mut self,
        aid: u32,
        start: u32,
    ) -> Result<()> {
        if self.finalized {
            return Err(RegistrationError::AlreadyFinalized.into());
        }
        let accessory = self
            .accessories
            .iter_mut()
            .find(|a| a.aid == aid)
            .ok_or(RegistrationError::AccessoryNotFound { aid })?;
        accessory.reset_iid(start)?;
        Ok(())
    }

    /// Removes an accessory and retires its characteristics.
    ///
    /// Returns `Ok(None)` when the id is not registered. Fails without changing
    /// anything when a surviving service links into the accessory.
    pub fn remove_accessory(
        &mut self,
        aid: u32,
    ) -> Result<Option<Vec<Arc<Characteristic>>>> {
        let Some(pos) = self.accessories.iter().position(|a| a.aid == aid) else {
            return Ok(None);
        };
        let doomed: HashSet<ServiceKey> = self.accessories[pos].services.iter().copied().collect();
        for (idx, slot) in self.services.iter().enumerate() {
            let Some(service) = slot else {
                continue;
            };
            if doomed.contains(&ServiceKey(idx)) {
                continue;
            }
            if let Some(target) = service.linked.iter().find(|k| doomed.contains(k)) {
                return Err(RegistrationError::DanglingLink {
                    from: idx,
                    to: target.0,
                }
                .into());
            }
        }

        let accessory = self.accessories.remove(pos);
        let mut removed = Vec::new();
        for key in accessory.services {
            if let Some(service) = self.services.get_mut(key.0).and_then(Option::take) {
                for c in service.characteristics {
                    self.index.remove(&(c.aid, c.iid));
                    c.retire();
                    removed.push(c);
                }
            }
        }
        info!(aid, characteristics = removed.len(), "Accessory removed");
        Ok(Some(removed))
    }

    /// Checks the tree is fit to be served.
    pub fn validate(&self) -> Result<()> {
        if !self.faults.is_empty() {
            return Err(Error::Fatal(self.faults.join("; ")));
        }
        if self.accessories.is_empty() {
            return Err(Error::Fatal("no accessories registered".to_string()));
        }

        for accessory in &self.accessories {
            let aid = accessory.aid;
            let mut information = 0;
            for (pos, key) in accessory.services.iter().enumerate() {
                let service = self.service(*key).ok_or(RegistrationError::ServiceNotFound(key.0))?;
                if service.type_id == svc::ACCESSORY_INFORMATION {
                    information += 1;
                } else if pos == 0 {
                    return Err(RegistrationError::MissingIdentification {
                        aid,
                        reason: "first service must be AccessoryInformation",
                    }
                    .into());
                }
                if let Some(link) = service.linked.iter().find(|l| self.service(**l).is_none()) {
                    return Err(RegistrationError::DanglingLink {
                        from: key.0,
                        to: link.0,
                    }
                    .into());
                }
                for required in service.required {
                    if !service.has_characteristic(*required) {
                        warn!(
                            aid,
                            iid = service.iid,
                            service = %service.name,
                            missing = %required,
                            "Service is missing a required characteristic"
                        );
                    }
                }
            }
            match information {
                0 => {
                    return Err(RegistrationError::MissingIdentification {
                        aid,
                        reason: "no AccessoryInformation service",
                    }
                    .into())
                }
                1 => {}
                _ => {
                    return Err(RegistrationError::MissingIdentification {
                        aid,
                        reason: "AccessoryInformation appears more than once",
                    }
                    .into())
                }
            }
        }
        Ok(())
    }

    /// Renders the selected part of the tree.
    ///
    /// With both ids set, the result is a flat `characteristics` list (empty when
    /// the pair does not resolve); otherwise an `accessories` listing.
    pub fn serialize(
        &self,
        filter: &AttributeFilter,
    ) -> Result<Vec<u8>> {
        let bytes = match (filter.aid, filter.iid) {
            (Some(aid), Some(iid)) => {
                let characteristics = self
                    .find(aid, iid)
                    .map(|c| vec![CharView::render(c, filter.fields | Fields::AID, filter.observer)])
                    .unwrap_or_default();
                serde_json::to_vec(&CharacteristicsBody { characteristics })?
            }
            (aid, _) => {
                let accessories = self
                    .accessories
                    .iter()
                    .filter(|a| aid.map_or(true, |wanted| wanted == a.aid))
                    .map(|a| self.accessory_view(a, filter))
                    .collect();
                serde_json::to_vec(&AccessoriesBody { accessories })?
            }
        };
        Ok(bytes)
    }

    fn accessory_view(
        &self,
        accessory: &Accessory,
        filter: &AttributeFilter,
    ) -> AccessoryView {
        let fields = filter.fields - Fields::AID;
        let services = accessory
            .services
            .iter()
            .filter_map(|key| self.service(*key))
            .map(|s| ServiceView {
                iid: s.iid,
                type_id: s.type_id.to_string(),
                primary: s.primary,
                hidden: s.hidden,
                linked: s
                    .linked
                    .iter()
                    .filter_map(|k| self.service(*k))
                    .map(|l| l.iid)
                    .collect(),
                characteristics: s
                    .characteristics
                    .iter()
                    .map(|c| CharView::render(c, fields, filter.observer))
                    .collect(),
            })
            .collect();
        AccessoryView {
            aid: accessory.aid,
            services,
        }
    }
}
