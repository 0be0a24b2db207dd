//! Diagnostics hooks for executed and failed commands.

use std::fmt;

use tabula_common::Error;
use tabula_db::Command;

/// What a command was executed for.
#[derive(Clone, Copy)]
pub enum Subject<'a> {
    /// Nothing beyond the command itself (loads and deletes, or a batch
    /// that failed before its first entry).
    None,
    /// A single entity.
    Entity(&'a dyn fmt::Debug),
    /// A batch of entities.
    Entries {
        entries: &'a dyn fmt::Debug,
        count: usize,
    },
}

impl fmt::Debug for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Entity(entity) => f.debug_tuple("Entity").field(entity).finish(),
            Self::Entries { count, .. } => f.debug_struct("Entries").field("count", count).finish(),
        }
    }
}

/// The handler operation that produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    SaveMany,
    Load,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::SaveMany => write!(f, "save_many"),
            Self::Load => write!(f, "load"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Where a failure happened.
#[derive(Debug, Clone, Copy)]
pub struct FailureContext<'a> {
    /// Table name, once metadata was resolved.
    pub table: Option<&'a str>,
    pub operation: Operation,
    /// The command, once it was created.
    pub command: Option<&'a Command>,
}

/// Receives a report for every command the handler runs.
///
/// Reports are diagnostics only; observers cannot change the outcome.
pub trait CommandObserver: Send + Sync {
    /// A command completed and changed or returned `affected` rows.
    fn on_command_executed(&self, command: &Command, affected: usize, subject: Subject<'_>);

    /// An operation failed; the same error is returned to the caller.
    fn on_exception(&self, error: &Error, context: &FailureContext<'_>, subject: Subject<'_>);
}

/// Observer that writes reports to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CommandObserver for TracingObserver {
    fn on_command_executed(&self, command: &Command, affected: usize, subject: Subject<'_>) {
        tracing::debug!(
            sql = command.text(),
            parameters = command.parameters().len(),
            affected,
            subject = ?subject,
            "command executed"
        );
    }

    fn on_exception(&self, error: &Error, context: &FailureContext<'_>, subject: Subject<'_>) {
        tracing::error!(
            error = %error,
            operation = %context.operation,
            table = context.table.unwrap_or("<unresolved>"),
            sql = context.command.map(|c| c.text()),
            subject = ?subject,
            "command failed"
        );
    }
}
