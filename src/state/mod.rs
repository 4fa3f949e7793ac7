/// State management module
///
/// This module handles all application state, including:
/// - Product records (data.rs)
/// - Placeholder records for incomplete data (placeholder.rs)
/// - The on-disk product catalog (catalog.rs)
/// - The SQLite-backed cart (cart.rs)

pub mod cart;
pub mod catalog;
pub mod data;
pub mod placeholder;
