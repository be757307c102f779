//! Repository layer: CRUD and query contracts per entity.
//!
//! # Responsibility
//! - Map each repository method to an explicit SQL statement or builder query.
//! - Keep SQL details away from callers.
//!
//! # Invariants
//! - Writes validate entities before touching the store.
//! - Store errors are propagated unchanged inside `RepoError::Db`.
//! - Repositories only accept fully migrated connections.

mod crud;
mod error;
pub mod member_repo;
pub(crate) mod support;
pub mod team_repo;

pub use crud::CrudRepository;
pub use error::{RepoError, RepoResult};
