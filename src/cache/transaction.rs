//! Buffered transaction
//!
//! Holds sets and deletes in a local overlay and replays them onto the
//! parent when `end()` is called.
//!
//! ## Deadline
//! The deadline is fixed when the transaction begins. Every buffered `set`
//! and `delete` immediately moves the parent key's expiration to that
//! deadline, so a transaction that is never ended leaves its keys alive no
//! longer than the deadline allows. This costs one backend round trip per
//! buffered write.
//!
//! ## Replay
//! `end()` walks the overlay once in identifier order. The first failure
//! stops the replay and is returned; earlier entries stay applied and later
//! ones are dropped. Replay is not atomic across keys.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Cache;
use crate::codec::{JsonCodec, PayloadCodec};
use crate::error::{CacheError, Result};

/// Uncommitted mutation for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// Encoded payload to write at `end()`
    Write(Vec<u8>),

    /// Delete at `end()`; reads report a miss until then
    Delete,
}

/// Cache scope that buffers writes until `end()`
///
/// Mutating calls take `&mut self`; sharing one transaction across threads
/// needs external locking.
#[derive(Debug)]
pub struct BufferedTransaction<P: Cache, C: PayloadCodec = JsonCodec> {
    parent: P,
    codec: C,
    overlay: BTreeMap<String, Pending>,
    deadline: SystemTime,
}

impl<P: Cache, C: PayloadCodec> BufferedTransaction<P, C> {
    /// Wrap `parent`, with a deadline of now + `max`
    pub fn new(parent: P, codec: C, max: Duration) -> Result<Self> {
        let deadline = SystemTime::now().checked_add(max).ok_or_else(|| {
            CacheError::Config(format!("transaction duration {:?} out of range", max))
        })?;

        tracing::debug!("Transaction opened, keys kept alive for {:?}", max);

        Ok(Self {
            parent,
            codec,
            overlay: BTreeMap::new(),
            deadline,
        })
    }

    /// Absolute time every touched key is kept alive until
    pub fn deadline(&self) -> SystemTime {
        self.deadline
    }

    /// Buffered mutation for an identifier, if any
    pub fn pending(&self, id: &str) -> Option<&Pending> {
        self.overlay.get(id)
    }

    /// Number of identifiers with a buffered mutation
    pub fn len(&self) -> usize {
        self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }

    /// The cache this transaction replays onto
    pub fn parent(&self) -> &P {
        &self.parent
    }

    fn buffer(&mut self, id: &str, pending: Pending) -> Result<()> {
        self.overlay.insert(id.to_string(), pending);
        self.parent.expire(id, self.deadline)
    }
}

impl<P: Cache, C: PayloadCodec> Cache for BufferedTransaction<P, C> {
    // Never constructed: nesting is rejected
    type Scope = Self;

    fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        match self.overlay.get(id) {
            Some(Pending::Write(bytes)) => self.codec.decode(bytes),
            Some(Pending::Delete) => Err(CacheError::Miss),
            None => self.parent.get(id),
        }
    }

    fn set<T: Serialize + ?Sized>(&mut self, id: &str, value: &T) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        self.buffer(id, Pending::Write(bytes))
    }

    fn set_raw(&mut self, id: &str, data: &[u8]) -> Result<()> {
        self.parent.set_raw(id, data)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.buffer(id, Pending::Delete)
    }

    fn expire(&mut self, id: &str, at: SystemTime) -> Result<()> {
        self.parent.expire(id, at)
    }

    fn begin(&self, _max: Duration) -> Result<Self::Scope> {
        Err(CacheError::NestedTransaction)
    }

    fn end(self) -> Result<()> {
        let Self {
            mut parent, overlay, ..
        } = self;

        tracing::debug!("Transaction ending, replaying {} mutations", overlay.len());

        let total = overlay.len();
        for (applied, (id, pending)) in overlay.into_iter().enumerate() {
            let replayed = match pending {
                Pending::Delete => parent.delete(&id),
                Pending::Write(bytes) => parent.set_raw(&id, &bytes),
            };

            if let Err(e) = replayed {
                tracing::warn!(
                    "Replay aborted at {} after {} of {} mutations: {}",
                    id,
                    applied,
                    total,
                    e
                );
                return Err(e);
            }
        }

        Ok(())
    }
}
