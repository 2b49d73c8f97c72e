//! Project context collection
//!
//! This module provides the [`LocalContextSeeder`] implementation of the
//! application's [`ContextSeeder`] port. It gathers a snapshot of the project
//! once per session so the model starts with some orientation.
//!
//! # Usage
//!
//! ```no_run
//! use toolpod_application::ContextSeeder;
//! use toolpod_infrastructure::LocalContextSeeder;
//!
//! # async fn demo() {
//! let seeder = LocalContextSeeder::new(".");
//! let blob = seeder.collect().await;
//! println!("{}", blob.render());
//! # }
//! ```
//!
//! [`ContextSeeder`]: toolpod_application::ContextSeeder

mod seeder;

pub use seeder::LocalContextSeeder;
