//! Query modules for the co-op game catalogue.
//!
//! Each module provides a query struct that borrows from a
//! [`Connection`](crate::connection::Connection) (or the loaded country list)
//! and exposes methods returning `Result<T>` with typed model payloads.

pub mod countries;
pub mod games;

pub use countries::{load_countries, CountryQuery};
pub use games::GameQuery;
