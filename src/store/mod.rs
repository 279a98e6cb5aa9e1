//! Read-only domain store collaborator.
//!
//! Target resolution reads relationships the caller did not embed in the
//! event payload (an academy's principal, its teacher roster, the student
//! membership list). The store is consumed through a trait so the real
//! persistence layer stays out of this subsystem; the in-memory
//! implementation backs tests and embedded use.

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Academy, Teacher};

pub use memory::MemoryDomainStore;

/// Errors that can occur during a store lookup.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The underlying store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but the row could not be decoded.
    #[error("corrupt record for {entity} {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: i64,
        reason: String,
    },
}

/// Read-only lookups the target resolver may fall back to.
///
/// Every method is a point read; a missing entity is `Ok(None)` (or an empty
/// list), not an error. Errors mean the lookup itself failed.
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Fetch an academy with its principal and teacher roster loaded.
    async fn academy_by_id(&self, academy_id: i64) -> Result<Option<Academy>, StoreError>;

    /// Fetch a single teacher.
    async fn teacher_by_id(&self, teacher_id: i64) -> Result<Option<Teacher>, StoreError>;

    /// Ids of every student currently enrolled as a member of the academy.
    async fn academy_student_ids(&self, academy_id: i64) -> Result<Vec<i64>, StoreError>;
}
