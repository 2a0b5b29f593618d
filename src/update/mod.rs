//! Remote write batches.
//!
//! Each item is resolved, checked and applied on its own: a failing item
//! leaves its characteristic untouched and never rolls back earlier items.

#[cfg(test)]
mod update_test;

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::error;
use tracing::trace;

use crate::storage::write_through;
use crate::AttributeTree;
use crate::Change;
use crate::CharSlot;
use crate::NotificationRouter;
use crate::ObserverId;
use crate::PersistenceStore;
use crate::Perms;
use crate::Result;
use crate::UpdateFlag;
use crate::Value;

/// Protocol status of one batch item or read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    InsufficientPrivileges = -70401,
    UnableToPerform = -70402,
    Busy = -70403,
    ReadOnly = -70404,
    WriteOnly = -70405,
    NotificationNotSupported = -70406,
    OutOfResource = -70407,
    OperationTimedOut = -70408,
    UnknownResource = -70409,
    InvalidValue = -70410,
    InsufficientAuthorization = -70411,
}

impl StatusCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// One item of a remote write batch
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WriteRequest {
    pub aid: u32,
    pub iid: u32,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(rename = "ev", default)]
    pub events: Option<bool>,
    /// Read-back requested
    #[serde(rename = "r", default)]
    pub response: bool,
}

impl WriteRequest {
    pub fn write(
        aid: u32,
        iid: u32,
        value: serde_json::Value,
    ) -> Self {
        Self {
            aid,
            iid,
            value: Some(value),
            events: None,
            response: false,
        }
    }

    pub fn events(
        aid: u32,
        iid: u32,
        enable: bool,
    ) -> Self {
        Self {
            aid,
            iid,
            value: None,
            events: Some(enable),
            response: false,
        }
    }

    pub fn with_response(mut self) -> Self {
        self.response = true;
        self
    }
}

#[derive(Deserialize)]
struct WriteBatch {
    characteristics: Vec<WriteRequest>,
}

/// Parses a `{"characteristics": [...]}` write body.
pub fn parse_write_batch(body: &[u8]) -> Result<Vec<WriteRequest>> {
    let batch: WriteBatch = serde_json::from_slice(body)?;
    Ok(batch.characteristics)
}

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    pub aid: u32,
    pub iid: u32,
    pub status: StatusCode,
    /// Read-back value, present when requested and the write succeeded
    pub value: Option<Value>,
}

impl WriteResult {
    fn status(
        request: &WriteRequest,
        status: StatusCode,
    ) -> Self {
        Self {
            aid: request.aid,
            iid: request.iid,
            status,
            value: None,
        }
    }
}

#[derive(Serialize)]
struct ResultItem {
    aid: u32,
    iid: u32,
    status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ResultBody {
    characteristics: Vec<ResultItem>,
}

/// Renders batch results as a `{"characteristics": [...]}` body.
pub fn render_write_results(results: &[WriteResult]) -> Result<Vec<u8>> {
    let characteristics = results
        .iter()
        .map(|r| ResultItem {
            aid: r.aid,
            iid: r.iid,
            status: r.status.code(),
            value: r.value.as_ref().map(Value::to_json),
        })
        .collect();
    Ok(serde_json::to_vec(&ResultBody { characteristics })?)
}

/// Applies remote write batches against a tree.
pub struct UpdateEngine<'a> {
    tree: &'a AttributeTree,
    router: &'a NotificationRouter,
    store: &'a dyn PersistenceStore,
}

impl<'a> UpdateEngine<'a> {
    pub fn new(
        tree: &'a AttributeTree,
        router: &'a NotificationRouter,
        store: &'a dyn PersistenceStore,
    ) -> Self {
        Self {
            tree,
            router,
            store,
        }
    }

    /// Applies the batch in order. `origin` is the writing observer, if any;
    /// it is not notified of its own writes.
    pub fn apply(
        &self,
        batch: &[WriteRequest],
        origin: Option<ObserverId>,
    ) -> Vec<WriteResult> {
        let results: Vec<WriteResult> = batch.iter().map(|item| self.apply_one(item, origin)).collect();
        debug!(
            items = results.len(),
            failed = results.iter().filter(|r| !r.status.is_ok()).count(),
            "Write batch applied"
        );
        results
    }

    fn apply_one(
        &self,
        request: &WriteRequest,
        origin: Option<ObserverId>,
    ) -> WriteResult {
        let Some(slot) = self.tree.locate(request.aid, request.iid) else {
            return WriteResult::status(request, StatusCode::UnknownResource);
        };
        let c = &slot.characteristic;
        if request.value.is_none() && request.events.is_none() {
            return WriteResult::status(request, StatusCode::InvalidValue);
        }
        if request.value.is_some() && !c.perms.contains(Perms::PAIRED_WRITE) {
            return WriteResult::status(request, StatusCode::ReadOnly);
        }
        if request.events.is_some() && !c.perms.contains(Perms::EVENTS) {
            return WriteResult::status(request, StatusCode::NotificationNotSupported);
        }
        let subscriber = match (request.events, origin) {
            (None, _) => None,
            (Some(enable), Some(observer)) if self.router.is_open(observer) => Some((enable, observer)),
            (Some(_), _) => {
                debug!(aid = c.aid, iid = c.iid, ?origin, "Rejected event toggle without an open observer");
                return WriteResult::status(request, StatusCode::UnableToPerform);
            }
        };

        if let Some(json) = &request.value {
            let candidate = match Value::from_json(c.format(), json) {
                Ok(v) if c.admits(&v) => v,
                Ok(v) => {
                    debug!(aid = c.aid, iid = c.iid, value = %v, "Rejected out-of-range write");
                    return WriteResult::status(request, StatusCode::InvalidValue);
                }
                Err(e) => {
                    debug!(aid = c.aid, iid = c.iid, "Rejected write: {}", e);
                    return WriteResult::status(request, StatusCode::InvalidValue);
                }
            };
            if let Err(status) = self.commit(slot, candidate, request.response, origin) {
                return WriteResult::status(request, status);
            }
        }

        if let Some((enable, observer)) = subscriber {
            if enable {
                self.router.subscribe(c, observer);
            } else {
                self.router.unsubscribe(c, observer);
            }
        }

        WriteResult {
            aid: request.aid,
            iid: request.iid,
            status: StatusCode::Ok,
            value: request.response.then(|| c.get_value()),
        }
    }

    /// Stage, approve, persist, commit, publish.
    fn commit(
        &self,
        slot: &CharSlot,
        candidate: Value,
        response: bool,
        origin: Option<ObserverId>,
    ) -> std::result::Result<(), StatusCode> {
        let c = &slot.characteristic;
        c.stage(candidate.clone());
        let approved = self
            .tree
            .service(slot.service)
            .map(|s| s.approve(c))
            .unwrap_or(true);
        if !approved {
            c.revert_staged();
            return Err(StatusCode::UnableToPerform);
        }
        if let Some(key) = c.durable_key() {
            if let Err(e) = write_through(self.store, key, &candidate) {
                error!(aid = c.aid, iid = c.iid, key, "Failed to persist write: {}", e);
                c.revert_staged();
                return Err(StatusCode::UnableToPerform);
            }
        }

        let flag = if response {
            UpdateFlag::WrittenWithResponse
        } else {
            UpdateFlag::Written
        };
        c.commit_staged(flag);
        trace!(aid = c.aid, iid = c.iid, value = %candidate, ?origin, "Remote write applied");
        self.router
            .sink()
            .publish(Change::new(c.clone(), candidate, origin));
        Ok(())
    }
}
