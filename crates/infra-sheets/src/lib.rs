// Lineup Infrastructure - Google Sheets Adapter
// Implements: SheetStore

pub mod auth;
pub mod layout;
pub mod store;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use store::GoogleSheetsStore;
