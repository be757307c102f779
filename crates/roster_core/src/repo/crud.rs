//! Generic CRUD contract shared by every entity repository.

use super::{RepoError, RepoResult};
use crate::model::Entity;

/// Insert-or-update, lookup and delete over one entity type.
///
/// Implementations map each method to an explicit statement; nothing is
/// derived from method names.
pub trait CrudRepository<E: Entity> {
    /// Inserts a transient entity or updates a persisted one.
    ///
    /// Returns the stored value with its generated id populated.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when `entity.id()` is set but no row exists.
    fn save(&self, entity: &E) -> RepoResult<E>;

    /// Saves every entity in one transaction; nothing is kept on failure.
    fn save_all(&self, entities: &[E]) -> RepoResult<Vec<E>>;

    fn find_by_id(&self, id: E::Id) -> RepoResult<Option<E>>;

    fn exists_by_id(&self, id: E::Id) -> RepoResult<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }

    /// Returns every row in insertion order.
    fn find_all(&self) -> RepoResult<Vec<E>>;

    fn count(&self) -> RepoResult<u64>;

    /// Deletes the row identified by `id`.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no row matched.
    fn delete_by_id(&self, id: E::Id) -> RepoResult<()>;

    /// Deletes `entity` by its identity.
    ///
    /// # Errors
    /// - `RepoError::Transient` when the entity was never saved.
    fn delete(&self, entity: &E) -> RepoResult<()> {
        match entity.id() {
            Some(id) => self.delete_by_id(id),
            None => Err(RepoError::Transient(E::NAME)),
        }
    }
}
