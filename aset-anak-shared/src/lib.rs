//! Types and pure logic shared by the Aset Anak server and its clients.
//!
//! Nothing in this crate performs I/O: the server owns storage and HTTP, this
//! crate owns the vocabulary (ids, records, holdings), input validation,
//! display formatting and the aggregation rules.

pub mod age;
pub mod api;
pub mod domain;
pub mod jwt;
pub mod money;
pub mod path;
pub mod totals;
pub mod validate;
