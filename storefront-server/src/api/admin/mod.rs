//! Admin console endpoints, all behind the bearer-token middleware

pub mod featured;
pub mod orders;
pub mod products;
pub mod taxonomy;
pub mod upload;
