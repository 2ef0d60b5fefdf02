//! Aset Anak server: storage, services and the HTTP surface.

pub mod server;
pub mod service;
pub mod storage;
