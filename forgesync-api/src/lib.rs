//! Shared data model for the forgesync welding cell.
//!
//! The wire format mirrors the remote CRUD device registry field for field,
//! so every crate that talks to the store (client, mock, tests) agrees on
//! one record shape.

pub mod models;
