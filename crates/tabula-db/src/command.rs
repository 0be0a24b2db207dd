//! SQL commands with named parameters.
//!
//! A [`Command`] is plain data: statement text plus the values bound to its
//! `:name` placeholders. It is executed through a
//! [`Context`](crate::context::Context).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rusqlite::types::{Value, ValueRef};
use rusqlite::Statement;
use tabula_common::{Error, Result, SqlValue};

/// A value bound to one named placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Placeholder name without the leading `:`.
    pub name: String,
    pub value: SqlValue,
}

impl Parameter {
    pub fn new<S: Into<String>>(name: S, value: SqlValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Statement text and its bound parameters.
#[derive(Debug, Clone)]
pub struct Command {
    text: Arc<str>,
    parameters: Vec<Parameter>,
    positions: HashMap<String, usize>,
}

impl Command {
    /// Create a command with no parameters bound yet.
    pub fn new<S: Into<Arc<str>>>(text: S) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// The SQL text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bound parameters in insertion order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Look up the value bound to `name`.
    pub fn parameter(&self, name: &str) -> Option<&SqlValue> {
        self.positions
            .get(name)
            .map(|&i| &self.parameters[i].value)
    }

    /// Bind `value` to `name`, replacing any value already bound to it.
    pub fn add<S: Into<String>>(&mut self, name: S, value: SqlValue) -> &mut Self {
        self.add_parameter(Parameter::new(name, value))
    }

    /// Bind a prepared [`Parameter`], replacing any value already bound to its name.
    pub fn add_parameter(&mut self, parameter: Parameter) -> &mut Self {
        match self.positions.get(&parameter.name) {
            Some(&i) => self.parameters[i].value = parameter.value,
            None => {
                self.positions
                    .insert(parameter.name.clone(), self.parameters.len());
                self.parameters.push(parameter);
            }
        }
        self
    }

    /// Bind every parameter onto a prepared statement.
    ///
    /// The statement must declare exactly the placeholders this command binds.
    pub(crate) fn bind(&self, stmt: &mut Statement<'_>) -> Result<()> {
        if stmt.parameter_count() != self.parameters.len() {
            return Err(Error::invalid_input(format!(
                "statement expects {} parameters, {} bound",
                stmt.parameter_count(),
                self.parameters.len()
            )));
        }

        for parameter in &self.parameters {
            let placeholder = format!(":{}", parameter.name);
            let index = stmt
                .parameter_index(&placeholder)
                .map_err(Error::execution)?
                .ok_or_else(|| {
                    Error::invalid_input(format!("statement has no parameter {placeholder}"))
                })?;
            stmt.raw_bind_parameter(index, to_driver(&parameter.value))
                .map_err(Error::execution)?;
        }

        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)?;
        if !self.parameters.is_empty() {
            write!(f, " [")?;
            for (i, p) in self.parameters.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, ":{}={}", p.name, p.value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

pub(crate) fn to_driver(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(n) => Value::Integer(*n),
        SqlValue::Real(r) => Value::Real(*r),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
    }
}

pub(crate) fn from_driver(value: ValueRef<'_>) -> Result<SqlValue> {
    Ok(match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Integer(n),
        ValueRef::Real(r) => SqlValue::Real(r),
        ValueRef::Text(bytes) => SqlValue::Text(
            String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::conversion("Text", "String", e.to_string()))?,
        ),
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    })
}
