use std::sync::Arc;

use crate::chain::{ChainReader, ChainWriter};
use crate::credential::Identity;

/// Everything a tick needs from the outside world, built once at startup.
///
/// Cloning is cheap; ticks never run concurrently so nothing here is locked.
#[derive(Clone)]
pub struct KeeperContext {
    pub reader: Arc<dyn ChainReader>,
    pub writer: Arc<dyn ChainWriter>,
    pub identity: Identity,
    /// Registry reference used in reports (the contract address).
    pub registry: String,
    /// Query sent to the reader on every tick.
    pub query: Vec<u8>,
}

impl KeeperContext {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        identity: Identity,
        registry: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            writer,
            identity,
            registry: registry.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: Vec<u8>) -> Self {
        self.query = query;
        self
    }
}
