//! Database access layer

pub mod categories;
pub mod featured;
pub mod orders;
pub mod products;
pub mod tags;
