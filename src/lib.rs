//! Customer registry: an HTTP gateway over a single `clientes` table and the
//! pieces the terminal client is built from.

#[macro_use]
extern crate log;

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod screen;

pub use error::Error;
