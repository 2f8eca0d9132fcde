//! Role provisioning
//!
//! Roles are keyed by type and created lazily on first use. Creation goes
//! through the storage get-or-create so concurrent runs converge on one
//! record per type.

use pitchline_core::{AgentError, AgentRole, PitchlineResult, RoleType};
use pitchline_storage::StorageTrait;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves role records by type.
pub trait RoleDirectory: Send + Sync {
    /// Get the record for `role_type`, creating it if absent.
    fn resolve(&self, role_type: RoleType) -> PitchlineResult<AgentRole>;

    /// Resolve every role that takes part in a run.
    fn resolve_all(&self) -> PitchlineResult<RoleSet> {
        let roles = RoleType::ALL
            .iter()
            .map(|role_type| Ok((*role_type, self.resolve(*role_type)?)))
            .collect::<PitchlineResult<HashMap<_, _>>>()?;
        Ok(RoleSet { roles })
    }
}

/// The resolved role records for one run.
#[derive(Debug, Clone, Default)]
pub struct RoleSet {
    roles: HashMap<RoleType, AgentRole>,
}

impl RoleSet {
    pub fn get(&self, role_type: RoleType) -> PitchlineResult<&AgentRole> {
        self.roles
            .get(&role_type)
            .ok_or_else(|| AgentError::UnknownRole { role: role_type }.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRole> {
        self.roles.values()
    }
}

/// Directory backed by the storage get-or-create.
#[derive(Debug)]
pub struct StorageRoleDirectory<S> {
    storage: Arc<S>,
}

impl<S: StorageTrait> StorageRoleDirectory<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

impl<S: StorageTrait> RoleDirectory for StorageRoleDirectory<S> {
    fn resolve(&self, role_type: RoleType) -> PitchlineResult<AgentRole> {
        let (role, created) = self.storage.role_get_or_create(role_type)?;
        if created {
            tracing::info!(
                role = %role_type,
                role_id = %role.role_id,
                "provisioned agent role"
            );
        }
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchline_core::PitchlineError;
    use pitchline_storage::InMemoryStorage;

    #[test]
    fn test_resolve_is_idempotent() {
        let storage = Arc::new(InMemoryStorage::new());
        let directory = StorageRoleDirectory::new(Arc::clone(&storage));

        let first = directory.resolve(RoleType::Scorer).unwrap();
        let second = directory.resolve(RoleType::Scorer).unwrap();
        assert_eq!(first.role_id, second.role_id);
        assert_eq!(first.name, "Scoring Agent");
        assert_eq!(storage.role_count().unwrap(), 1);
    }

    #[test]
    fn test_resolve_all_provisions_fixed_set() {
        let storage = Arc::new(InMemoryStorage::new());
        let directory = StorageRoleDirectory::new(Arc::clone(&storage));

        let set = directory.resolve_all().unwrap();
        assert_eq!(set.iter().count(), RoleType::ALL.len());
        for role_type in RoleType::ALL {
            assert_eq!(set.get(*role_type).unwrap().role_type, *role_type);
        }

        let again = directory.resolve_all().unwrap();
        assert_eq!(
            set.get(RoleType::Refiner).unwrap().role_id,
            again.get(RoleType::Refiner).unwrap().role_id
        );
        assert_eq!(storage.role_count().unwrap(), RoleType::ALL.len());
    }

    #[test]
    fn test_concurrent_resolve_converges() {
        let storage = Arc::new(InMemoryStorage::new());
        let directory = StorageRoleDirectory::new(Arc::clone(&storage));

        let ids: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| directory.resolve(RoleType::Research).unwrap().role_id))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(storage.role_count().unwrap(), 1);
    }

    #[test]
    fn test_empty_role_set_reports_unknown_role() {
        let set = RoleSet::default();
        assert!(matches!(
            set.get(RoleType::Orchestrator),
            Err(PitchlineError::Agent(AgentError::UnknownRole {
                role: RoleType::Orchestrator
            }))
        ));
    }
}
