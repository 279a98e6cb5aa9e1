//! In-memory domain store using DashMap.
//!
//! Holds fully-joined academies and membership lists. State is lost on
//! restart, which is fine for its two uses: tests and embedded demos.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{Academy, Teacher};

use super::{DomainStore, StoreError};

/// In-memory domain store.
///
/// When `fail_all` is set every lookup returns
/// [`StoreError::Unavailable`], which is how tests exercise the resolver's
/// swallow-and-continue path.
#[derive(Default)]
pub struct MemoryDomainStore {
    academies: DashMap<i64, Academy>,
    memberships: DashMap<i64, Vec<i64>>,
    fail_all: std::sync::atomic::AtomicBool,
}

impl MemoryDomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an academy (principal and teachers included).
    pub fn put_academy(&self, academy: Academy) {
        self.academies.insert(academy.id, academy);
    }

    /// Replace the student membership list of an academy.
    pub fn put_students(&self, academy_id: i64, student_ids: Vec<i64>) {
        self.memberships.insert(academy_id, student_ids);
    }

    /// Make every subsequent lookup fail with `Unavailable`.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_all
            .store(fail, std::sync::atomic::Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.fail_all.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(StoreError::Unavailable("lookups disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DomainStore for MemoryDomainStore {
    async fn academy_by_id(&self, academy_id: i64) -> Result<Option<Academy>, StoreError> {
        self.check_available()?;
        Ok(self.academies.get(&academy_id).map(|a| a.clone()))
    }

    async fn teacher_by_id(&self, teacher_id: i64) -> Result<Option<Teacher>, StoreError> {
        self.check_available()?;
        Ok(self.academies.iter().find_map(|academy| {
            academy
                .teachers
                .iter()
                .find(|t| t.id == teacher_id)
                .cloned()
        }))
    }

    async fn academy_student_ids(&self, academy_id: i64) -> Result<Vec<i64>, StoreError> {
        self.check_available()?;
        Ok(self
            .memberships
            .get(&academy_id)
            .map(|ids| ids.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Principal;

    fn sample_academy() -> Academy {
        Academy {
            id: 5,
            name: "North Campus".to_string(),
            principal: Some(Principal {
                id: 9,
                name: "Kim".to_string(),
            }),
            teachers: vec![Teacher {
                id: 11,
                name: "Lee".to_string(),
                academy_id: 5,
            }],
        }
    }

    #[tokio::test]
    async fn test_academy_round_trip() {
        let store = MemoryDomainStore::new();
        store.put_academy(sample_academy());

        let found = store.academy_by_id(5).await.expect("lookup");
        assert_eq!(found.map(|a| a.name), Some("North Campus".to_string()));
        assert!(store.academy_by_id(999).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn test_teacher_lookup_scans_rosters() {
        let store = MemoryDomainStore::new();
        store.put_academy(sample_academy());

        let teacher = store.teacher_by_id(11).await.expect("lookup");
        assert_eq!(teacher.map(|t| t.academy_id), Some(5));
        assert!(store.teacher_by_id(12).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn test_missing_membership_is_empty_not_error() {
        let store = MemoryDomainStore::new();
        assert!(store.academy_student_ids(5).await.expect("lookup").is_empty());

        store.put_students(5, vec![1, 2, 3]);
        assert_eq!(store.academy_student_ids(5).await.expect("lookup").len(), 3);
    }

    #[tokio::test]
    async fn test_fail_lookups_switch() {
        let store = MemoryDomainStore::new();
        store.put_academy(sample_academy());
        store.fail_lookups(true);

        assert!(store.academy_by_id(5).await.is_err());
        assert!(store.academy_student_ids(5).await.is_err());

        store.fail_lookups(false);
        assert!(store.academy_by_id(5).await.is_ok());
    }
}
