//! Attribute payload views.
//!
//! Field selection follows the protocol's read flags. View structs keep their
//! field order stable, so the same tree always renders to the same bytes.

use bitflags::bitflags;
use serde::Serialize;

use crate::Characteristic;
use crate::ObserverId;
use crate::Perms;
use crate::StatusCode;

bitflags! {
    /// Which fields a characteristic entry carries
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fields: u16 {
        const AID = 1;
        const META = 2;
        const PERMS = 4;
        const TYPE = 8;
        const EV = 16;
        const DESC = 32;
        const VALUE = 128;
        const STATUS = 256;
    }
}

impl Fields {
    /// Full attribute database listing
    pub const DATABASE: Fields = Fields::META
        .union(Fields::PERMS)
        .union(Fields::TYPE)
        .union(Fields::DESC)
        .union(Fields::VALUE);

    /// Value-free structural listing
    pub const STRUCTURE: Fields = Fields::META.union(Fields::PERMS).union(Fields::TYPE);
}

/// Selects which part of the tree to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeFilter {
    pub aid: Option<u32>,
    pub iid: Option<u32>,
    pub fields: Fields,
    /// Requesting observer, for the `ev` field
    pub observer: Option<ObserverId>,
}

impl AttributeFilter {
    pub fn database() -> Self {
        Self {
            aid: None,
            iid: None,
            fields: Fields::DATABASE,
            observer: None,
        }
    }

    pub fn structure() -> Self {
        Self {
            fields: Fields::STRUCTURE,
            ..Self::database()
        }
    }

    pub fn accessory(aid: u32) -> Self {
        Self {
            aid: Some(aid),
            ..Self::database()
        }
    }

    pub fn characteristic(
        aid: u32,
        iid: u32,
    ) -> Self {
        Self {
            aid: Some(aid),
            iid: Some(iid),
            fields: Fields::VALUE,
            observer: None,
        }
    }

    pub fn with_fields(
        mut self,
        fields: Fields,
    ) -> Self {
        self.fields = fields;
        self
    }

    pub fn for_observer(
        mut self,
        observer: ObserverId,
    ) -> Self {
        self.observer = Some(observer);
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CharView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) aid: Option<u32>,
    pub(crate) iid: u32,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    perms: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ev: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(rename = "minValue", skip_serializing_if = "Option::is_none")]
    min_value: Option<serde_json::Value>,
    #[serde(rename = "maxValue", skip_serializing_if = "Option::is_none")]
    max_value: Option<serde_json::Value>,
    #[serde(rename = "minStep", skip_serializing_if = "Option::is_none")]
    min_step: Option<serde_json::Value>,
    #[serde(rename = "valid-values", skip_serializing_if = "Option::is_none")]
    valid_values: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<i32>,
}

impl CharView {
    pub(crate) fn render(
        c: &Characteristic,
        fields: Fields,
        observer: Option<ObserverId>,
    ) -> Self {
        let meta = fields.contains(Fields::META);
        let range = if meta { c.range.as_ref() } else { None };
        Self {
            aid: fields.contains(Fields::AID).then_some(c.aid),
            iid: c.iid,
            type_id: fields
                .contains(Fields::TYPE)
                .then(|| c.type_id.to_string()),
            perms: fields.contains(Fields::PERMS).then(|| c.perms.tags()),
            format: meta.then(|| c.format().tag()),
            value: (fields.contains(Fields::VALUE) && c.perms.contains(Perms::PAIRED_READ))
                .then(|| c.get_value().to_json()),
            ev: fields
                .contains(Fields::EV)
                .then(|| observer.map(|o| c.is_subscribed(o)).unwrap_or(false)),
            description: if fields.contains(Fields::DESC) {
                c.description.clone()
            } else {
                None
            },
            unit: if meta { c.unit.clone() } else { None },
            min_value: range.map(|r| r.min.to_json()),
            max_value: range.map(|r| r.max.to_json()),
            min_step: range.and_then(|r| r.step.as_ref()).map(|s| s.to_json()),
            valid_values: if meta {
                c.valid_values
                    .as_ref()
                    .map(|v| v.iter().copied().collect())
            } else {
                None
            },
            status: None,
        }
    }

    pub(crate) fn status_only(
        aid: u32,
        iid: u32,
        status: StatusCode,
    ) -> Self {
        Self {
            aid: Some(aid),
            iid,
            type_id: None,
            perms: None,
            format: None,
            value: None,
            ev: None,
            description: None,
            unit: None,
            min_value: None,
            max_value: None,
            min_step: None,
            valid_values: None,
            status: Some(status.code()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ServiceView {
    pub(crate) iid: u32,
    #[serde(rename = "type")]
    pub(crate) type_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub(crate) primary: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub(crate) hidden: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) linked: Vec<u32>,
    pub(crate) characteristics: Vec<CharView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessoryView {
    pub(crate) aid: u32,
    pub(crate) services: Vec<ServiceView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessoriesBody {
    pub(crate) accessories: Vec<AccessoryView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CharacteristicsBody {
    pub(crate) characteristics: Vec<CharView>,
}
