//! Builders that turn a catalog row (or a custom definition) into a
//! registered characteristic or service.

use std::collections::BTreeSet;

use crate::catalog;
use crate::constants::DURABLE_IID_MASK;
use crate::convert::durable_key;
use crate::CharType;
use crate::Characteristic;
use crate::Format;
use crate::HapType;
use crate::Perms;
use crate::PollHandler;
use crate::Range;
use crate::RegistrationError;
use crate::Result;
use crate::Service;
use crate::ServiceType;
use crate::UpdateHandler;
use crate::Value;

#[derive(Debug, Clone)]
pub struct CharSpec {
    type_id: HapType,
    name: String,
    format: Format,
    perms: Perms,
    initial: Value,
    range: Option<(Value, Value)>,
    step: Option<Value>,
    custom_range: bool,
    valid_values: Option<BTreeSet<u32>>,
    description: Option<String>,
    unit: Option<String>,
    durable: bool,
}

impl CharSpec {
    pub fn of(type_id: HapType) -> Result<Self> {
        catalog::characteristic(type_id)
            .map(Self::from_catalog)
            .ok_or_else(|| RegistrationError::UnknownCharacteristic(type_id.to_string()).into())
    }

    pub fn named(name: &str) -> Result<Self> {
        catalog::characteristic_named(name)
            .map(Self::from_catalog)
            .ok_or_else(|| RegistrationError::UnknownCharacteristic(name.to_string()).into())
    }

    pub fn from_catalog(row: &CharType) -> Self {
        Self {
            type_id: row.type_id,
            name: row.name.to_string(),
            format: row.format,
            perms: row.perms,
            initial: row.default.materialize(row.format),
            range: row
                .range
                .map(|(min, max)| (Value::Float(min), Value::Float(max))),
            step: None,
            custom_range: false,
            valid_values: (!row.valid_values.is_empty())
                .then(|| row.valid_values.iter().copied().collect()),
            description: None,
            unit: row.unit.map(str::to_string),
            durable: false,
        }
    }

    /// Vendor-specific characteristic outside the catalog.
    pub fn custom(
        type_id: HapType,
        name: impl Into<String>,
        format: Format,
        perms: Perms,
    ) -> Self {
        Self {
            type_id,
            name: name.into(),
            format,
            perms,
            initial: Value::empty(format),
            range: None,
            step: None,
            custom_range: false,
            valid_values: None,
            description: None,
            unit: None,
            durable: false,
        }
    }

    pub fn type_id(&self) -> HapType {
        self.type_id
    }

    pub fn value(
        mut self,
        value: impl Into<Value>,
    ) -> Self {
        self.initial = value.into();
        self
    }

    pub fn range(
        mut self,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.range = Some((min.into(), max.into()));
        self.custom_range = true;
        self
    }

    pub fn step(
        mut self,
        step: impl Into<Value>,
    ) -> Self {
        self.step = Some(step.into());
        self.custom_range = true;
        self
    }

    /// Restricts writes to the listed values (int and uint8/16/32 only).
    pub fn valid_values(
        mut self,
        values: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.valid_values = Some(values.into_iter().collect());
        self
    }

    pub fn perms(
        mut self,
        perms: Perms,
    ) -> Self {
        self.perms = perms;
        self
    }

    pub fn add_perms(
        mut self,
        perms: Perms,
    ) -> Self {
        self.perms |= perms;
        self
    }

    pub fn remove_perms(
        mut self,
        perms: Perms,
    ) -> Self {
        self.perms -= perms;
        self
    }

    pub fn description(
        mut self,
        description: impl Into<String>,
    ) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unit(
        mut self,
        unit: impl Into<String>,
    ) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Binds the characteristic to non-volatile storage.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub(crate) fn build(
        self,
        aid: u32,
        iid: u32,
    ) -> Result<Characteristic> {
        let format = self.format;
        if self.custom_range && !format.is_numeric() {
            return Err(RegistrationError::RangeNotSupported {
                type_id: self.type_id,
                format,
            }
            .into());
        }
        if self.valid_values.is_some() && !format.is_enumerable() {
            return Err(RegistrationError::ValidValuesNotSupported {
                type_id: self.type_id,
                format,
            }
            .into());
        }

        let range = match self.range {
            Some((min, max)) if format.is_numeric() => Some(Range {
                min: min.coerce(format)?,
                max: max.coerce(format)?,
                step: self.step.map(|s| s.coerce(format)).transpose()?,
            }),
            _ => None,
        };
        let initial = self.initial.coerce(format)?;

        let key = match self.durable {
            true if iid > DURABLE_IID_MASK => {
                return Err(RegistrationError::NotDurable { aid, iid }.into());
            }
            true => Some(durable_key(self.type_id.0, aid, iid)),
            false => None,
        };

        Ok(Characteristic::new(
            aid,
            iid,
            self.type_id,
            self.name,
            self.perms,
            initial,
            range,
            self.valid_values,
            self.description,
            self.unit,
            key,
        ))
    }
}

pub struct ServiceSpec {
    type_id: HapType,
    name: String,
    primary: bool,
    hidden: bool,
    required: &'static [HapType],
    handler: Option<UpdateHandler>,
    poll_handler: Option<PollHandler>,
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("type", &self.type_id)
            .field("name", &self.name)
            .field("primary", &self.primary)
            .field("hidden", &self.hidden)
            .finish()
    }
}

impl ServiceSpec {
    pub fn of(type_id: HapType) -> Result<Self> {
        catalog::service(type_id)
            .map(Self::from_catalog)
            .ok_or_else(|| RegistrationError::UnknownService(type_id.to_string()).into())
    }

    pub fn named(name: &str) -> Result<Self> {
        catalog::service_named(name)
            .map(Self::from_catalog)
            .ok_or_else(|| RegistrationError::UnknownService(name.to_string()).into())
    }

    pub fn from_catalog(row: &ServiceType) -> Self {
        Self {
            type_id: row.type_id,
            name: row.name.to_string(),
            primary: false,
            hidden: false,
            required: row.required,
            handler: None,
            poll_handler: None,
        }
    }

    pub fn custom(
        type_id: HapType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            type_id,
            name: name.into(),
            primary: false,
            hidden: false,
            required: &[],
            handler: None,
            poll_handler: None,
        }
    }

    pub fn type_id(&self) -> HapType {
        self.type_id
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Installs the veto hook consulted on every remote write to one of this
    /// service's characteristics.
    pub fn on_update<F>(
        mut self,
        handler: F,
    ) -> Self
    where
        F: Fn(&Characteristic) -> bool + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Installs a hook run once per poll cycle, before that cycle's
    /// notifications are drained. Local sets made from it are delivered in
    /// the same cycle.
    pub fn on_poll<F>(
        mut self,
        hook: F,
    ) -> Self
    where
        F: Fn(&Service) + Send + Sync + 'static,
    {
        self.poll_handler = Some(Box::new(hook));
        self
    }

    pub(crate) fn build(
        self,
        aid: u32,
        iid: u32,
    ) -> Service {
        Service {
            aid,
            iid,
            type_id: self.type_id,
            name: self.name,
            primary: self.primary,
            hidden: self.hidden,
            characteristics: Vec::new(),
            linked: Vec::new(),
            required: self.required,
            handler: self.handler,
            poll_handler: self.poll_handler,
        }
    }
}
