//! Queries against the tables tabula owns.

pub mod sequences;
