//! Command implementations.

pub mod migrate;
pub mod posts;
pub mod roster;

/// Read the database URL the same way the portal does.
fn database_url() -> Option<String> {
    std::env::var("PORTAL_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

/// Write rendered output to stdout.
#[allow(clippy::print_stdout)]
fn emit(text: &str) {
    print!("{text}");
}
