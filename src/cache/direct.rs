//! Direct store
//!
//! Unbuffered path to the backend. Cheap to clone: clones share the backend
//! handle, prefix and codec.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{BufferedTransaction, Cache};
use crate::backend::Backend;
use crate::codec::{JsonCodec, PayloadCodec};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Cache that reads and writes the backend directly
#[derive(Clone)]
pub struct DirectStore<C: PayloadCodec = JsonCodec> {
    backend: Arc<dyn Backend>,
    prefix: Arc<str>,
    default_ttl: Duration,
    codec: C,
}

impl DirectStore<JsonCodec> {
    /// JSON-encoding store with the default one hour TTL
    pub fn new(backend: Arc<dyn Backend>, prefix: impl Into<String>) -> Self {
        let config = Config::builder().prefix(prefix).build();
        Self::with_codec(backend, &config, JsonCodec)
    }

    /// JSON-encoding store using prefix and TTL from config
    pub fn from_config(backend: Arc<dyn Backend>, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_codec(backend, config, JsonCodec))
    }
}

impl<C: PayloadCodec> DirectStore<C> {
    /// Store with an explicit payload codec
    pub fn with_codec(backend: Arc<dyn Backend>, config: &Config, codec: C) -> Self {
        Self {
            backend,
            prefix: Arc::from(config.prefix.as_str()),
            default_ttl: config.default_ttl,
            codec,
        }
    }

    /// Replace the TTL used by `set` and `set_raw`
    pub fn with_default_ttl(mut self, ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(CacheError::Config(
                "default_ttl must be greater than zero".to_string(),
            ));
        }
        self.default_ttl = ttl;
        Ok(self)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Backend key for an identifier
    pub fn key(&self, id: &str) -> String {
        let mut key = String::with_capacity(self.prefix.len() + id.len());
        key.push_str(&self.prefix);
        key.push_str(id);
        key
    }

    /// Raw bytes stored for an identifier
    pub fn get_raw(&self, id: &str) -> Result<Vec<u8>> {
        self.backend.get(&self.key(id))?.ok_or(CacheError::Miss)
    }
}

impl<C: PayloadCodec> Cache for DirectStore<C> {
    type Scope = BufferedTransaction<DirectStore<C>, C>;

    fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        let bytes = self.get_raw(id)?;
        self.codec.decode(&bytes)
    }

    fn set<T: Serialize + ?Sized>(&mut self, id: &str, value: &T) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        self.set_raw(id, &bytes)
    }

    fn set_raw(&mut self, id: &str, data: &[u8]) -> Result<()> {
        tracing::trace!("set {} ({} bytes)", id, data.len());
        self.backend.set(&self.key(id), data, self.default_ttl)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        tracing::trace!("delete {}", id);
        self.backend.delete(&self.key(id))?;
        Ok(())
    }

    fn expire(&mut self, id: &str, at: SystemTime) -> Result<()> {
        if !self.backend.expire_at(&self.key(id), at)? {
            tracing::trace!("expire {}: no such key", id);
        }
        Ok(())
    }

    fn begin(&self, max: Duration) -> Result<Self::Scope> {
        BufferedTransaction::new(self.clone(), self.codec.clone(), max)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<C: PayloadCodec> fmt::Debug for DirectStore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectStore")
            .field("prefix", &self.prefix)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
