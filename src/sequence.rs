//! Identifier allocation for auto-increment tables.
//!
//! An [`AutoIncrementSource`] hands out the next unused identifier and is
//! told how far a batch advanced it. A save reads the counter once and
//! writes it once; nothing is held in between, so callers that save the
//! same table from several tasks at once must serialize those saves
//! themselves. Each individual call on the built-in sources is atomic.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tabula_common::{Error, Result};
use tabula_db::queries::sequences;
use tabula_db::Context;

use crate::handler::Handler;

/// Counter that allocates identifiers for one table.
#[async_trait]
pub trait AutoIncrementSource: Send + Sync + 'static {
    /// Return the next unused identifier and advance past it.
    fn next_id(&self, handler: &Handler) -> Result<i64>;

    /// Make `next` the next identifier to hand out.
    fn set_next_id(&self, handler: &Handler, next: i64) -> Result<()>;

    async fn next_id_async(&self, handler: &Handler) -> Result<i64> {
        self.next_id(handler)
    }

    async fn set_next_id_async(&self, handler: &Handler, next: i64) -> Result<()> {
        self.set_next_id(handler, next)
    }
}

/// In-process counter. Restarts whenever the process does.
#[derive(Debug)]
pub struct MemorySequence {
    next: AtomicI64,
}

impl MemorySequence {
    /// Counter starting at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }

    /// The identifier the next call to `next_id` will return.
    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for MemorySequence {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoIncrementSource for MemorySequence {
    fn next_id(&self, _handler: &Handler) -> Result<i64> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| next.checked_add(1))
            .map_err(|next| Error::invalid_input(format!("identifier space exhausted at {next}")))
    }

    fn set_next_id(&self, _handler: &Handler, next: i64) -> Result<()> {
        self.next.fetch_max(next, Ordering::SeqCst);
        Ok(())
    }
}

/// Counter persisted in the `tabula_sequences` table of the handler's
/// database.
#[derive(Debug, Clone)]
pub struct TableSequence {
    name: String,
    start: i64,
}

impl TableSequence {
    /// Sequence `name` starting at 1.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::starting_at(name, 1)
    }

    pub fn starting_at<S: Into<String>>(name: S, start: i64) -> Self {
        Self {
            name: name.into(),
            start,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identifier the next call to `next_id` will return.
    pub fn peek(&self, handler: &Handler) -> Result<i64> {
        let ctx = Context::open(handler.pool())?;
        Ok(sequences::peek(ctx.connection()?, &self.name)?.unwrap_or(self.start))
    }
}

#[async_trait]
impl AutoIncrementSource for TableSequence {
    fn next_id(&self, handler: &Handler) -> Result<i64> {
        let ctx = Context::open(handler.pool())?;
        sequences::next_id(ctx.connection()?, &self.name, self.start)
    }

    fn set_next_id(&self, handler: &Handler, next: i64) -> Result<()> {
        let ctx = Context::open(handler.pool())?;
        sequences::set_next_id(ctx.connection()?, &self.name, self.start, next)
    }

    async fn next_id_async(&self, handler: &Handler) -> Result<i64> {
        let mut ctx = Context::open_async(handler.pool()).await?;
        let (name, start) = (self.name.clone(), self.start);
        ctx.with_connection_async(move |conn| sequences::next_id(conn, &name, start))
            .await
    }

    async fn set_next_id_async(&self, handler: &Handler, next: i64) -> Result<()> {
        let mut ctx = Context::open_async(handler.pool()).await?;
        let (name, start) = (self.name.clone(), self.start);
        ctx.with_connection_async(move |conn| sequences::set_next_id(conn, &name, start, next))
            .await
    }
}
