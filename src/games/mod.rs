//! Game implementations.

pub mod connect_n;
