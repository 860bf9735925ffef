//! CLI subcommands

pub mod clean;
pub mod fetch;
pub mod generate;
pub mod init;
pub mod list;
