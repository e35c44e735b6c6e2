//! Schema steps for the ledger store, applied in ascending order.

/// One schema step; `name` is recorded alongside its number.
pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "ledger snapshot tables",
        sql: include_str!("v001_initial.sql"),
    },
    Migration {
        version: 2,
        name: "reporting views",
        sql: include_str!("v002_reporting_views.sql"),
    },
];

/// Highest schema number this build can produce.
pub fn latest_version() -> i32 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}
