//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB with the fixture
//! tables, a private [`TableRegistry`] and a [`RecordingObserver`], plus the
//! fixture entities the tests save and load.

#![allow(dead_code)]

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tabula::serialization::{
    Converting, DateTimeSerializer, DisplaySerializer, JsonSerializer, NullAsDefault,
    UuidBytesSerializer,
};
use tabula::{
    CommandObserver, Entity, Error, FailureContext, Handler, Operation, Result, Serializer,
    SqlType, SqlValue, Subject, TableBuilder, TableRegistry, TableSequence, ValueKind,
};
use tabula_db::pool::{init_memory_pool_with, DbPool};
use tabula_db::PoolOptions;
use tabula_db::queries::sequences;
use tabula_db::Command;

pub const SCHEMA: &str = "
    CREATE TABLE Players (
        Id INTEGER PRIMARY KEY,
        Name TEXT NOT NULL
    );
    CREATE TABLE Notes (
        Id INTEGER PRIMARY KEY,
        Body TEXT NOT NULL CHECK (length(Body) > 0)
    );
    CREATE TABLE Characters (
        Id INTEGER PRIMARY KEY,
        Name TEXT NOT NULL,
        Class TEXT NOT NULL,
        Stats TEXT NOT NULL,
        Born TEXT NOT NULL,
        Guild BLOB NOT NULL,
        Level TEXT NOT NULL,
        Nickname TEXT,
        Motto TEXT
    );
    CREATE TABLE Curses (
        Id INTEGER PRIMARY KEY,
        Power TEXT
    );
";

/// Test harness wrapping a [`Handler`] backed by an in-memory database.
pub struct TestHarness {
    pub handler: Handler,
    pub db: DbPool,
    pub observer: Arc<RecordingObserver>,
}

impl TestHarness {
    /// Create a new harness with the fixture schema.
    pub fn new() -> Self {
        Self::with_pool_size(PoolOptions::default().max_size)
    }

    /// Like [`new`](Self::new) with at most `max_size` pooled connections.
    pub fn with_pool_size(max_size: u32) -> Self {
        init_tracing();

        let db = init_memory_pool_with(PoolOptions {
            max_size,
            ..PoolOptions::default()
        })
        .expect("failed to create in-memory pool");
        db.get()
            .expect("failed to get connection")
            .execute_batch(SCHEMA)
            .expect("failed to create fixture tables");

        let observer = Arc::new(RecordingObserver::default());
        let handler = Handler::new(db.clone())
            .with_registry(Arc::new(TableRegistry::new()))
            .with_observer(observer.clone());

        Self {
            handler,
            db,
            observer,
        }
    }

    /// Number of rows in `table`.
    pub fn count(&self, table: &str) -> i64 {
        self.db
            .get()
            .expect("failed to get connection")
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("failed to count rows")
    }

    /// Next identifier the persisted sequence `name` will hand out, `None`
    /// until the sequence is first used.
    pub fn next_id(&self, name: &str) -> Option<i64> {
        let conn = self.db.get().expect("failed to get connection");
        sequences::peek(&conn, name).expect("failed to read sequence")
    }
}

/// Route tracing output through the test harness, filtered by `RUST_LOG`.
fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tabula=debug,tabula_db=info".to_string());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Executed {
    pub sql: String,
    pub parameters: Vec<String>,
    pub affected: usize,
    pub subject: String,
}

#[derive(Debug, Clone)]
pub struct Failed {
    pub error: String,
    pub operation: Operation,
    pub table: Option<String>,
    pub sql: Option<String>,
    pub subject: String,
}

/// Observer that keeps every report for later assertions.
#[derive(Default)]
pub struct RecordingObserver {
    executed: Mutex<Vec<Executed>>,
    failed: Mutex<Vec<Failed>>,
}

impl RecordingObserver {
    pub fn executed(&self) -> Vec<Executed> {
        self.executed.lock().clone()
    }

    pub fn failed(&self) -> Vec<Failed> {
        self.failed.lock().clone()
    }
}

impl CommandObserver for RecordingObserver {
    fn on_command_executed(&self, command: &Command, affected: usize, subject: Subject<'_>) {
        self.executed.lock().push(Executed {
            sql: command.text().to_string(),
            parameters: command.parameters().iter().map(|p| p.name.clone()).collect(),
            affected,
            subject: format!("{subject:?}"),
        });
    }

    fn on_exception(&self, error: &Error, context: &FailureContext<'_>, subject: Subject<'_>) {
        self.failed.lock().push(Failed {
            error: error.to_string(),
            operation: context.operation,
            table: context.table.map(str::to_string),
            sql: context.command.map(|c| c.text().to_string()),
            subject: format!("{subject:?}"),
        });
    }
}

// ---------------------------------------------------------------------------
// Fixture entities
// ---------------------------------------------------------------------------

/// Auto-increment table whose counter starts at 5.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Player {
    pub id: i64,
    pub name: String,
}

impl Player {
    pub fn named(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
}

impl Entity for Player {
    type Key = i64;

    fn id(&self) -> &i64 {
        &self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn describe(table: &mut TableBuilder<Self>) {
        table
            .name("Players")
            .field("Name", |p| &p.name, |p, v| p.name = v)
            .auto_increment(TableSequence::starting_at("Players", 5));
    }
}

/// Plain table without auto-increment.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Note {
    pub id: i64,
    pub body: String,
}

impl Note {
    pub fn new(id: i64, body: &str) -> Self {
        Self {
            id,
            body: body.to_string(),
        }
    }
}

impl Entity for Note {
    type Key = i64;

    fn id(&self) -> &i64 {
        &self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn describe(table: &mut TableBuilder<Self>) {
        table
            .name("Notes")
            .field("Body", |n| &n.body, |n, v| n.body = v);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Class {
    #[default]
    Warrior,
    Mage,
    Rogue,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warrior => write!(f, "warrior"),
            Self::Mage => write!(f, "mage"),
            Self::Rogue => write!(f, "rogue"),
        }
    }
}

impl FromStr for Class {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "warrior" => Ok(Self::Warrior),
            "mage" => Ok(Self::Mage),
            "rogue" => Ok(Self::Rogue),
            other => Err(format!("unknown class: {other}")),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: u8,
    pub wisdom: u8,
    pub perks: Vec<String>,
}

/// Entity exercising every built-in serializer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub class: Class,
    pub stats: Stats,
    pub born: DateTime<Utc>,
    pub guild: Uuid,
    pub level: u16,
    pub nickname: Option<String>,
    pub motto: Option<String>,
}

impl Entity for Character {
    type Key = i64;

    fn id(&self) -> &i64 {
        &self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn describe(table: &mut TableBuilder<Self>) {
        table
            .name("Characters")
            .field("Name", |c| &c.name, |c, v| c.name = v)
            .serialized("Class", |c| &c.class, |c, v| c.class = v, DisplaySerializer::<Class>::new())
            .serialized("Stats", |c| &c.stats, |c, v| c.stats = v, JsonSerializer::<Stats>::new())
            .serialized("Born", |c| &c.born, |c, v| c.born = v, DateTimeSerializer)
            .serialized("Guild", |c| &c.guild, |c, v| c.guild = v, UuidBytesSerializer)
            .serialized(
                "Level",
                |c| &c.level,
                |c, v| c.level = v,
                Converting::<u16, String>::new(),
            )
            .field("Nickname", |c| &c.nickname, |c, v| c.nickname = v)
            .serialized_optional(
                "Motto",
                |c| c.motto.as_ref(),
                |c, v| c.motto = v,
                NullAsDefault::new(DisplaySerializer::<String>::new()),
            )
            .auto_increment(TableSequence::new("Characters"));
    }
}

/// Storage type that claims to be text but can carry any cell.
pub struct Mislabeled(pub SqlValue);

impl SqlType for Mislabeled {
    fn kind() -> ValueKind {
        ValueKind::Text
    }

    fn to_sql(&self) -> SqlValue {
        self.0.clone()
    }

    fn from_sql(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::Text(_) => Ok(Mislabeled(value)),
            other => Err(Error::type_mismatch(
                "Mislabeled",
                "Text",
                other.kind_name(),
                "reading column",
            )),
        }
    }
}

/// Serializer that writes the wrong storage kind for negative values.
pub struct CursedSerializer;

impl Serializer for CursedSerializer {
    type Domain = i64;
    type Storage = Mislabeled;

    fn serialize(&self, value: &i64) -> Result<Mislabeled> {
        if *value < 0 {
            Ok(Mislabeled(SqlValue::Integer(*value)))
        } else {
            Ok(Mislabeled(SqlValue::Text(value.to_string())))
        }
    }

    fn deserialize(&self, value: Mislabeled) -> Result<i64> {
        match value.0 {
            SqlValue::Text(s) => s
                .parse()
                .map_err(|e| Error::conversion("Text", "i64", format!("{s}: {e}"))),
            other => Err(Error::type_mismatch(
                "CursedSerializer",
                "Text",
                other.kind_name(),
                "deserializing",
            )),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Curse {
    pub id: i64,
    pub power: i64,
}

impl Curse {
    pub fn new(id: i64, power: i64) -> Self {
        Self { id, power }
    }
}

impl Entity for Curse {
    type Key = i64;

    fn id(&self) -> &i64 {
        &self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn describe(table: &mut TableBuilder<Self>) {
        table
            .name("Curses")
            .serialized("Power", |c| &c.power, |c, v| c.power = v, CursedSerializer);
    }
}

pub fn sample_character(name: &str) -> Character {
    Character {
        id: 0,
        name: name.to_string(),
        class: Class::Mage,
        stats: Stats {
            strength: 4,
            wisdom: 18,
            perks: vec!["arcane".to_string(), "night vision".to_string()],
        },
        born: "2021-03-14T09:26:53Z".parse().expect("valid timestamp"),
        guild: Uuid::new_v4(),
        level: 12,
        nickname: Some("Sparky".to_string()),
        motto: Some("Knowledge is power".to_string()),
    }
}
