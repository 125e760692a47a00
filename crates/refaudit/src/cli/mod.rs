//! CLI module for refaudit
//!
//! Every command resolves its connection settings through [`config`] and
//! reports failures as [`error::HelpfulError`] where the user can act on them.

pub mod config;
pub mod error;
pub mod locales;
pub mod open;
pub mod output;
pub mod scan;
