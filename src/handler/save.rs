//! Single and batched upserts.
//!
//! Order within one call: identifier allocation, parameter binding, command
//! execution, completion report, counter update. Any failure is reported to
//! the observer once and then returned unchanged.

use tabula_common::{Error, Result, SqlValue};
use tabula_db::Context;

use super::{Attempt, Handler, Operation, Subject};
use crate::accessor::parameter_name;
use crate::table::Entity;

impl Handler {
    /// Insert or update one entity, returning the number of affected rows.
    ///
    /// On an auto-increment table an entity whose identifier still has the
    /// key type's default value is assigned a fresh identifier first.
    pub fn save<E: Entity>(&self, entity: &mut E) -> Result<usize> {
        let mut attempt = Attempt::default();
        match self.try_save(entity, &mut attempt) {
            Ok(affected) => Ok(affected),
            Err(error) => {
                self.report_failure(&error, &attempt, Operation::Save, Subject::Entity(&*entity));
                Err(error)
            }
        }
    }

    fn try_save<E: Entity>(&self, entity: &mut E, attempt: &mut Attempt) -> Result<usize> {
        let table = self.table::<E>()?;
        attempt.table = Some(table.name().to_string());

        if let Some(source) = table.auto_increment() {
            if *entity.id() == E::Key::default() {
                let id = source.next_id(self)?;
                table.identifier().set_value(entity, SqlValue::Integer(id))?;
            }
        }

        let ctx = Context::open(&self.pool)?;
        let command = attempt.command.insert(ctx.create_command(table.save_query()?));
        for column in table.columns() {
            command.add_parameter(column.get_parameter(entity)?);
        }

        let affected = ctx.execute(command)?;
        self.observer
            .on_command_executed(command, affected, Subject::Entity(&*entity));
        Ok(affected)
    }

    /// Async form of [`save`](Self::save).
    pub async fn save_async<E: Entity>(&self, entity: &mut E) -> Result<usize> {
        let mut attempt = Attempt::default();
        match self.try_save_async(entity, &mut attempt).await {
            Ok(affected) => Ok(affected),
            Err(error) => {
                self.report_failure(&error, &attempt, Operation::Save, Subject::Entity(&*entity));
                Err(error)
            }
        }
    }

    async fn try_save_async<E: Entity>(&self, entity: &mut E, attempt: &mut Attempt) -> Result<usize> {
        let table = self.table::<E>()?;
        attempt.table = Some(table.name().to_string());

        if let Some(source) = table.auto_increment() {
            if *entity.id() == E::Key::default() {
                let id = source.next_id_async(self).await?;
                table
                    .identifier()
                    .set_value_async(entity, SqlValue::Integer(id))
                    .await?;
            }
        }

        let mut ctx = Context::open_async(&self.pool).await?;
        let command = attempt.command.insert(ctx.create_command(table.save_query()?));
        for column in table.columns() {
            command.add_parameter(column.get_parameter_async(entity).await?);
        }

        let affected = ctx.execute_async(command).await?;
        self.observer
            .on_command_executed(command, affected, Subject::Entity(&*entity));
        Ok(affected)
    }

    /// Insert or update every entry with one statement.
    pub fn save_many<E: Entity>(&self, entries: &mut [E]) -> Result<usize> {
        self.save_many_with(entries, |_, _| {})
    }

    /// Like [`save_many`](Self::save_many), calling `on_saved` with each
    /// entry and its index once the entry's values have been bound.
    ///
    /// On an auto-increment table one identifier is allocated for the whole
    /// batch; entry `i` receives `start + i` and the counter is moved to
    /// `start + entries.len()` after the statement ran. An empty batch
    /// executes nothing and returns `Ok(0)`.
    ///
    /// One statement binds `entries.len() * columns` parameters. Batches
    /// above SQLite's limit of
    /// [`MAX_PARAMETERS`](crate::table::query::MAX_PARAMETERS) are rejected
    /// with [`Error::InvalidInput`](tabula_common::Error::InvalidInput)
    /// before an identifier is allocated; split them into smaller batches.
    pub fn save_many_with<E, F>(&self, entries: &mut [E], mut on_saved: F) -> Result<usize>
    where
        E: Entity,
        F: FnMut(&E, usize),
    {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut attempt = Attempt::default();
        match self.try_save_many(entries, &mut on_saved, &mut attempt) {
            Ok(affected) => Ok(affected),
            Err(error) => {
                let subject = match attempt.index {
                    Some(index) => Subject::Entity(&entries[index]),
                    None => Subject::None,
                };
                self.report_failure(&error, &attempt, Operation::SaveMany, subject);
                Err(error)
            }
        }
    }

    fn try_save_many<E, F>(&self, entries: &mut [E], on_saved: &mut F, attempt: &mut Attempt) -> Result<usize>
    where
        E: Entity,
        F: FnMut(&E, usize),
    {
        let table = self.table::<E>()?;
        attempt.table = Some(table.name().to_string());

        let count = entries.len();
        let text = table.save_query_for(count)?;
        let start = match table.auto_increment() {
            Some(source) => Some(source.next_id(self)?),
            None => None,
        };
        let end = start.map(|start| batch_end(start, count)).transpose()?;

        let ctx = Context::open(&self.pool)?;
        let command = attempt.command.insert(ctx.create_command(text));

        for (index, entry) in entries.iter_mut().enumerate() {
            attempt.index = Some(index);
            if let Some(start) = start {
                table
                    .identifier()
                    .set_value(entry, SqlValue::Integer(start + index as i64))?;
            }
            for column in table.columns() {
                let parameter = column.get_parameter(entry)?;
                command.add(parameter_name(&parameter.name, index), parameter.value);
            }
            on_saved(entry, index);
        }

        let affected = ctx.execute(command)?;
        // The sequence may need a connection of its own.
        drop(ctx);

        let saved: &[E] = entries;
        self.observer.on_command_executed(
            command,
            affected,
            Subject::Entries {
                entries: &saved,
                count,
            },
        );

        if let (Some(source), Some(end)) = (table.auto_increment(), end) {
            source.set_next_id(self, end)?;
        }
        Ok(affected)
    }

    /// Async form of [`save_many`](Self::save_many).
    pub async fn save_many_async<E: Entity>(&self, entries: &mut [E]) -> Result<usize> {
        self.save_many_with_async(entries, |_, _| {}).await
    }

    /// Async form of [`save_many_with`](Self::save_many_with).
    ///
    /// Yields to the runtime once per entry.
    pub async fn save_many_with_async<E, F>(&self, entries: &mut [E], mut on_saved: F) -> Result<usize>
    where
        E: Entity,
        F: FnMut(&E, usize) + Send,
    {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut attempt = Attempt::default();
        match self
            .try_save_many_async(entries, &mut on_saved, &mut attempt)
            .await
        {
            Ok(affected) => Ok(affected),
            Err(error) => {
                let subject = match attempt.index {
                    Some(index) => Subject::Entity(&entries[index]),
                    None => Subject::None,
                };
                self.report_failure(&error, &attempt, Operation::SaveMany, subject);
                Err(error)
            }
        }
    }

    async fn try_save_many_async<E, F>(
        &self,
        entries: &mut [E],
        on_saved: &mut F,
        attempt: &mut Attempt,
    ) -> Result<usize>
    where
        E: Entity,
        F: FnMut(&E, usize) + Send,
    {
        let table = self.table::<E>()?;
        attempt.table = Some(table.name().to_string());

        let count = entries.len();
        let text = table.save_query_for(count)?;
        let start = match table.auto_increment() {
            Some(source) => Some(source.next_id_async(self).await?),
            None => None,
        };
        let end = start.map(|start| batch_end(start, count)).transpose()?;

        let mut ctx = Context::open_async(&self.pool).await?;
        let command = attempt.command.insert(ctx.create_command(text));

        for (index, entry) in entries.iter_mut().enumerate() {
            attempt.index = Some(index);
            if let Some(start) = start {
                table
                    .identifier()
                    .set_value_async(entry, SqlValue::Integer(start + index as i64))
                    .await?;
            }
            for column in table.columns() {
                let parameter = column.get_parameter_async(entry).await?;
                command.add(parameter_name(&parameter.name, index), parameter.value);
            }
            on_saved(entry, index);
            tokio::task::yield_now().await;
        }

        let affected = ctx.execute_async(command).await?;
        drop(ctx);

        let saved: &[E] = entries;
        self.observer.on_command_executed(
            command,
            affected,
            Subject::Entries {
                entries: &saved,
                count,
            },
        );

        if let (Some(source), Some(end)) = (table.auto_increment(), end) {
            source.set_next_id_async(self, end).await?;
        }
        Ok(affected)
    }
}

/// Identifier following a batch of `count` entries starting at `start`.
fn batch_end(start: i64, count: usize) -> Result<i64> {
    i64::try_from(count)
        .ok()
        .and_then(|count| start.checked_add(count))
        .ok_or_else(|| {
            Error::invalid_input(format!(
                "identifier space exhausted: cannot allocate {count} identifiers from {start}"
            ))
        })
}
