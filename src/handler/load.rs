//! Key-equality loads and deletes.

use std::sync::Arc;

use tabula_common::{Error, Result, SqlType, SqlValue};
use tabula_db::Context;

use super::{Attempt, Handler, Operation, Subject};
use crate::table::query::KEY_PARAMETER;
use crate::table::{Entity, TableMetadata};

impl Handler {
    /// Load the entity whose identifier equals `id`.
    pub fn load_one<E: Entity + Default>(&self, id: &E::Key) -> Result<Option<E>> {
        let table = self.table::<E>()?;
        let key = table.identifier().name().to_string();
        Ok(self.load_where(&table, &key, id.to_sql())?.into_iter().next())
    }

    /// Load every entity whose `key` column equals `value`.
    pub fn load_all<E: Entity + Default, V: SqlType>(&self, key: &str, value: &V) -> Result<Vec<E>> {
        let table = self.table::<E>()?;
        self.load_where(&table, key, value.to_sql())
    }

    /// Delete the entity whose identifier equals `id`, returning the number
    /// of deleted rows.
    pub fn delete<E: Entity>(&self, id: &E::Key) -> Result<usize> {
        let table = self.table::<E>()?;
        let key = table.identifier().name().to_string();
        self.delete_where(&table, &key, id.to_sql())
    }

    /// Delete every entity whose `key` column equals `value`.
    pub fn delete_all<E: Entity, V: SqlType>(&self, key: &str, value: &V) -> Result<usize> {
        let table = self.table::<E>()?;
        self.delete_where(&table, key, value.to_sql())
    }

    /// Async form of [`load_one`](Self::load_one).
    pub async fn load_one_async<E: Entity + Default>(&self, id: &E::Key) -> Result<Option<E>> {
        let table = self.table::<E>()?;
        let key = table.identifier().name().to_string();
        Ok(self
            .load_where_async(&table, &key, id.to_sql())
            .await?
            .into_iter()
            .next())
    }

    /// Async form of [`load_all`](Self::load_all).
    pub async fn load_all_async<E: Entity + Default, V: SqlType>(
        &self,
        key: &str,
        value: &V,
    ) -> Result<Vec<E>> {
        let table = self.table::<E>()?;
        self.load_where_async(&table, key, value.to_sql()).await
    }

    /// Async form of [`delete`](Self::delete).
    pub async fn delete_async<E: Entity>(&self, id: &E::Key) -> Result<usize> {
        let table = self.table::<E>()?;
        let key = table.identifier().name().to_string();
        self.delete_where_async(&table, &key, id.to_sql()).await
    }

    /// Async form of [`delete_all`](Self::delete_all).
    pub async fn delete_all_async<E: Entity, V: SqlType>(&self, key: &str, value: &V) -> Result<usize> {
        let table = self.table::<E>()?;
        self.delete_where_async(&table, key, value.to_sql()).await
    }

    fn load_where<E: Entity + Default>(
        &self,
        table: &Arc<TableMetadata<E>>,
        key: &str,
        value: SqlValue,
    ) -> Result<Vec<E>> {
        let mut attempt = Attempt {
            table: Some(table.name().to_string()),
            ..Default::default()
        };

        let result = (|| -> Result<Vec<E>> {
            let ctx = Context::open(&self.pool)?;
            let command = attempt.command.insert(ctx.create_command(table.load_query(key)?));
            command.add(KEY_PARAMETER, value);

            let rows = ctx.query(command)?;
            self.observer.on_command_executed(command, rows.len(), Subject::None);

            rows.into_iter()
                .map(|row| materialize(table, row))
                .collect::<Result<Vec<E>>>()
        })();

        result.inspect_err(|error| {
            self.report_failure(error, &attempt, Operation::Load, Subject::None)
        })
    }

    async fn load_where_async<E: Entity + Default>(
        &self,
        table: &Arc<TableMetadata<E>>,
        key: &str,
        value: SqlValue,
    ) -> Result<Vec<E>> {
        let mut attempt = Attempt {
            table: Some(table.name().to_string()),
            ..Default::default()
        };

        let result = async {
            let mut ctx = Context::open_async(&self.pool).await?;
            let command = attempt.command.insert(ctx.create_command(table.load_query(key)?));
            command.add(KEY_PARAMETER, value);

            let rows = ctx.query_async(command).await?;
            self.observer.on_command_executed(command, rows.len(), Subject::None);

            let mut entities = Vec::with_capacity(rows.len());
            for row in rows {
                entities.push(materialize_async(table, row).await?);
            }
            Ok::<_, Error>(entities)
        }
        .await;

        result.inspect_err(|error| {
            self.report_failure(error, &attempt, Operation::Load, Subject::None)
        })
    }

    fn delete_where<E: Entity>(
        &self,
        table: &Arc<TableMetadata<E>>,
        key: &str,
        value: SqlValue,
    ) -> Result<usize> {
        let mut attempt = Attempt {
            table: Some(table.name().to_string()),
            ..Default::default()
        };

        let result = (|| -> Result<usize> {
            let ctx = Context::open(&self.pool)?;
            let command = attempt.command.insert(ctx.create_command(table.delete_query(key)?));
            command.add(KEY_PARAMETER, value);

            let affected = ctx.execute(command)?;
            self.observer.on_command_executed(command, affected, Subject::None);
            Ok(affected)
        })();

        result.inspect_err(|error| {
            self.report_failure(error, &attempt, Operation::Delete, Subject::None)
        })
    }

    async fn delete_where_async<E: Entity>(
        &self,
        table: &Arc<TableMetadata<E>>,
        key: &str,
        value: SqlValue,
    ) -> Result<usize> {
        let mut attempt = Attempt {
            table: Some(table.name().to_string()),
            ..Default::default()
        };

        let result = async {
            let mut ctx = Context::open_async(&self.pool).await?;
            let command = attempt.command.insert(ctx.create_command(table.delete_query(key)?));
            command.add(KEY_PARAMETER, value);

            let affected = ctx.execute_async(command).await?;
            self.observer.on_command_executed(command, affected, Subject::None);
            Ok::<_, Error>(affected)
        }
        .await;

        result.inspect_err(|error| {
            self.report_failure(error, &attempt, Operation::Delete, Subject::None)
        })
    }
}

fn check_width<E: Entity>(table: &TableMetadata<E>, row: &[SqlValue]) -> Result<()> {
    let expected = table.fields().len() + 1;
    if row.len() != expected {
        return Err(Error::internal(format!(
            "row of table {} has {} cells, expected {expected}",
            table.name(),
            row.len()
        )));
    }
    Ok(())
}

/// Build an entity from one row selected in column order.
fn materialize<E: Entity + Default>(table: &TableMetadata<E>, row: Vec<SqlValue>) -> Result<E> {
    check_width(table, &row)?;
    let mut entity = E::default();
    for (column, cell) in table.columns().zip(row) {
        column.set_value(&mut entity, cell)?;
    }
    Ok(entity)
}

async fn materialize_async<E: Entity + Default>(
    table: &TableMetadata<E>,
    row: Vec<SqlValue>,
) -> Result<E> {
    check_width(table, &row)?;
    let mut entity = E::default();
    for (column, cell) in table.columns().zip(row) {
        column.set_value_async(&mut entity, cell).await?;
    }
    Ok(entity)
}
