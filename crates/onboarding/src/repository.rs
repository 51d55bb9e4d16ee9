use bizdesk_core::{ExpectedVersion, RegistrationRequestId};

use crate::{OnboardingError, RegistrationRequest, RegistrationStatus};

/// Persistence for registration requests.
pub trait RegistrationRequestRepository: Send + Sync {
    /// Store a newly submitted request; fails with a conflict if the id exists.
    fn insert(&self, request: RegistrationRequest) -> Result<(), OnboardingError>;

    fn get(&self, id: RegistrationRequestId) -> Result<Option<RegistrationRequest>, OnboardingError>;

    /// Replace a request if the stored version still matches `expected`.
    fn save(&self, request: RegistrationRequest, expected: ExpectedVersion) -> Result<(), OnboardingError>;

    /// Requests with `status`, oldest first.
    fn list(&self, status: RegistrationStatus) -> Result<Vec<RegistrationRequest>, OnboardingError>;
}

impl<R: RegistrationRequestRepository + ?Sized> RegistrationRequestRepository for std::sync::Arc<R> {
    fn insert(&self, request: RegistrationRequest) -> Result<(), OnboardingError> {
        (**self).insert(request)
    }

    fn get(&self, id: RegistrationRequestId) -> Result<Option<RegistrationRequest>, OnboardingError> {
        (**self).get(id)
    }

    fn save(&self, request: RegistrationRequest, expected: ExpectedVersion) -> Result<(), OnboardingError> {
        (**self).save(request, expected)
    }

    fn list(&self, status: RegistrationStatus) -> Result<Vec<RegistrationRequest>, OnboardingError> {
        (**self).list(status)
    }
}
