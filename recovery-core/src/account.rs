//! Accounts as seen by the reset protocol.
//!
//! | Field        | Type             | Description                                  |
//! | ------------ | ---------------- | -------------------------------------------- |
//! | `id`         | `AccountId`      | Opaque prefixed identifier (`acc_...`).      |
//! | `email`      | `String`         | Normalized email the account is registered to. |
//! | `name`       | `Option<String>` | Display name used to greet the account holder. |
//! | `created_at` | `DateTime`       | When the account was created.                |
//! | `updated_at` | `DateTime`       | When the account was last modified.          |
//!
//! Password hashes never leave the account store.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
