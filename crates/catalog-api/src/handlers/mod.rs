//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod categories;
pub mod health;
pub mod items;
pub mod users;
