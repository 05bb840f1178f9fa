//! Repository implementations for SQLite storage

pub mod account;
pub mod reset_token;

pub use account::SqliteAccountRepository;
pub use reset_token::SqliteResetTokenRepository;
