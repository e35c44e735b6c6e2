//! CLI command implementations

pub(crate) mod common;
pub(crate) mod execution;
pub(crate) mod init;
pub(crate) mod meta;
pub(crate) mod project;
pub(crate) mod report;
pub(crate) mod requirement;
pub(crate) mod scenario;
pub(crate) mod script;
pub(crate) mod test_case;
