//! Authentication helpers shared by the client and the CLI.

pub mod jwt;
