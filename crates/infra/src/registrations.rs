use std::collections::HashMap;
use std::sync::RwLock;

use bizdesk_core::{DomainError, ExpectedVersion, RegistrationRequestId};
use bizdesk_onboarding::{OnboardingError, RegistrationRequest, RegistrationRequestRepository, RegistrationStatus};

/// In-memory registration request store for tests/dev.
///
/// `save` is a compare-and-swap on the aggregate version, so two admins
/// deciding the same request cannot both win.
#[derive(Debug, Default)]
pub struct InMemoryRegistrationRequestStore {
    inner: RwLock<HashMap<RegistrationRequestId, RegistrationRequest>>,
}

impl InMemoryRegistrationRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> OnboardingError {
    OnboardingError::Store("lock poisoned".to_string())
}

impl RegistrationRequestRepository for InMemoryRegistrationRequestStore {
    fn insert(&self, request: RegistrationRequest) -> Result<(), OnboardingError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&request.id) {
            return Err(DomainError::conflict(format!("registration request {} already exists", request.id)).into());
        }
        map.insert(request.id, request);
        Ok(())
    }

    fn get(&self, id: RegistrationRequestId) -> Result<Option<RegistrationRequest>, OnboardingError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    fn save(&self, request: RegistrationRequest, expected: ExpectedVersion) -> Result<(), OnboardingError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let current = map
            .get(&request.id)
            .map(|r| r.version)
            .ok_or_else(|| DomainError::not_found(format!("registration request {}", request.id)))?;

        if !expected.matches(current) {
            return Err(DomainError::conflict(format!(
                "registration request {} changed concurrently (expected {expected:?}, found {current})",
                request.id
            ))
            .into());
        }
        map.insert(request.id, request);
        Ok(())
    }

    fn list(&self, status: RegistrationStatus) -> Result<Vec<RegistrationRequest>, OnboardingError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut out: Vec<RegistrationRequest> = map.values().filter(|r| r.status == status).cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}
