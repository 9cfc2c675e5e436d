//! Storage boundary for sensitive field pairs.
//!
//! [`SensitiveFieldStore`] is the seam to the database: it persists both
//! columns of a [`SensitiveField`] in one operation and enforces uniqueness
//! on the blind index column. [`SensitiveFieldRepository`] sits on top and
//! makes every codec call explicit at the moment of write or read.

use crate::blind_index::BlindIndexToken;
use crate::error::StoreError;
use crate::field::{FieldCodec, SensitiveField};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Primary key of a stored row.
pub type RowId = u64;

/// Persists field pairs.
///
/// Implementations must write both columns of a field in the same
/// operation, and must reject a second row with an equal blind index.
/// Rows whose field is empty (`None` value) are not subject to the
/// uniqueness constraint.
pub trait SensitiveFieldStore: Send + Sync {
    /// Inserts a new row and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateIndex` if another row holds the same index.
    fn insert(&self, field: SensitiveField) -> Result<RowId, StoreError>;

    /// Loads a row by id.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn get(&self, id: RowId) -> Result<Option<SensitiveField>, StoreError>;

    /// Equality lookup on the blind index column.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn find_by_index(
        &self,
        token: &BlindIndexToken,
    ) -> Result<Option<(RowId, SensitiveField)>, StoreError>;

    /// Overwrites both columns of an existing row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the row does not exist, or
    /// `DuplicateIndex` if another row holds the new index.
    fn replace(&self, id: RowId, field: SensitiveField) -> Result<(), StoreError>;

    /// Deletes a row. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn remove(&self, id: RowId) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
struct Table {
    next_id: RowId,
    rows: HashMap<RowId, SensitiveField>,
    by_index: HashMap<String, RowId>,
}

/// In-memory store with a unique index on the blind index column.
///
/// Both columns of a row, and the unique index, change under a single write
/// lock.
#[derive(Debug)]
pub struct MemoryFieldStore {
    column: String,
    table: RwLock<Table>,
}

impl MemoryFieldStore {
    /// Creates an empty store for the named logical column.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self { column: column.into(), table: RwLock::new(Table::default()) }
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    /// Returns `true` if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.read().rows.is_empty()
    }

    fn duplicate(&self) -> StoreError {
        StoreError::DuplicateIndex { column: self.column.clone() }
    }
}

impl SensitiveFieldStore for MemoryFieldStore {
    fn insert(&self, field: SensitiveField) -> Result<RowId, StoreError> {
        let mut table = self.table.write();

        if let Some(index) = field.blind_index() {
            if table.by_index.contains_key(index) {
                return Err(self.duplicate());
            }
        }

        table.next_id += 1;
        let id = table.next_id;
        if let Some(index) = field.blind_index() {
            table.by_index.insert(index.to_string(), id);
        }
        table.rows.insert(id, field);
        drop(table);

        tracing::debug!(row_id = id, column = %self.column, "sensitive field inserted");
        Ok(id)
    }

    fn get(&self, id: RowId) -> Result<Option<SensitiveField>, StoreError> {
        Ok(self.table.read().rows.get(&id).cloned())
    }

    fn find_by_index(
        &self,
        token: &BlindIndexToken,
    ) -> Result<Option<(RowId, SensitiveField)>, StoreError> {
        let table = self.table.read();
        Ok(table
            .by_index
            .get(token.as_str())
            .and_then(|id| table.rows.get(id).map(|field| (*id, field.clone()))))
    }

    fn replace(&self, id: RowId, field: SensitiveField) -> Result<(), StoreError> {
        let mut table = self.table.write();

        if !table.rows.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if let Some(index) = field.blind_index() {
            if table.by_index.get(index).is_some_and(|owner| *owner != id) {
                return Err(self.duplicate());
            }
        }

        let old_index = table.rows.get(&id).and_then(|old| old.blind_index().map(str::to_string));
        if let Some(old_index) = old_index {
            table.by_index.remove(&old_index);
        }
        if let Some(index) = field.blind_index() {
            table.by_index.insert(index.to_string(), id);
        }
        table.rows.insert(id, field);
        drop(table);

        tracing::debug!(row_id = id, column = %self.column, "sensitive field replaced");
        Ok(())
    }

    fn remove(&self, id: RowId) -> Result<bool, StoreError> {
        let mut table = self.table.write();

        let Some(old) = table.rows.remove(&id) else {
            return Ok(false);
        };
        if let Some(index) = old.blind_index() {
            table.by_index.remove(index);
        }
        drop(table);

        tracing::debug!(row_id = id, column = %self.column, "sensitive field removed");
        Ok(true)
    }
}

/// Repository for one sensitive attribute, with explicit codec calls.
///
/// # Example
///
/// ```
/// use casecrypt::cipher::LegacyPolicy;
/// use casecrypt::field::{FieldCodec, IndexNormalization};
/// use casecrypt::secret::load;
/// use casecrypt::store::{MemoryFieldStore, SensitiveFieldRepository};
/// use std::sync::Arc;
///
/// let material = Arc::new(load("QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=", "pepper")?);
/// let codec = FieldCodec::new(material, LegacyPolicy::Reject, IndexNormalization::Lowercase);
/// let users = SensitiveFieldRepository::new(codec, MemoryFieldStore::new("email"));
///
/// let id = users.create(Some("Alice@Example.com"))?;
/// assert_eq!(users.find("alice@example.com")?, Some(id));
/// assert_eq!(users.read(id)?.as_deref(), Some("Alice@Example.com"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct SensitiveFieldRepository<S: SensitiveFieldStore> {
    codec: FieldCodec,
    store: S,
}

impl<S: SensitiveFieldStore> SensitiveFieldRepository<S> {
    /// Creates a repository over a store.
    pub const fn new(codec: FieldCodec, store: S) -> Self {
        Self { codec, store }
    }

    /// Returns the field codec.
    pub const fn codec(&self) -> &FieldCodec {
        &self.codec
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Seals a value and stores both columns.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateIndex` if the value is already stored.
    pub fn create(&self, value: Option<&str>) -> Result<RowId, StoreError> {
        let field = self.codec.seal(value)?;
        self.store.insert(field)
    }

    /// Reads and decrypts a row located by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id, or a field error if
    /// the stored ciphertext does not decrypt.
    pub fn read(&self, id: RowId) -> Result<Option<String>, StoreError> {
        let field = self.store.get(id)?.ok_or(StoreError::NotFound(id))?;
        Ok(self.codec.open(&field)?)
    }

    /// Finds the row holding `value` by comparing blind indexes.
    ///
    /// # Errors
    ///
    /// Returns error if index generation or the lookup fails.
    pub fn find(&self, value: &str) -> Result<Option<RowId>, StoreError> {
        let token = self.codec.search_token(value)?;
        Ok(self.store.find_by_index(&token)?.map(|(id, _)| id))
    }

    /// Returns `true` if some row holds `value`.
    ///
    /// # Errors
    ///
    /// Returns error if index generation or the lookup fails.
    pub fn exists(&self, value: &str) -> Result<bool, StoreError> {
        Ok(self.find(value)?.is_some())
    }

    /// Re-seals a row with a new value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `DuplicateIndex`.
    pub fn update(&self, id: RowId, value: Option<&str>) -> Result<(), StoreError> {
        let field = self.codec.seal(value)?;
        self.store.replace(id, field)
    }

    /// Deletes a row. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    pub fn delete(&self, id: RowId) -> Result<bool, StoreError> {
        self.store.remove(id)
    }
}
