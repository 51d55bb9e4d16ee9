//! Integration tests across the onboarding and session pipeline.
//!
//! Tests: submit → approve (provision + outbox) → first login → forced
//! rotation → tenant access
//!
//! Verifies:
//! - Only platform admins decide requests, and only once
//! - Notification failures never lose a message
//! - A flagged owner cannot reach tenant data until the rotation

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use bizdesk_auth::{
        AuthConfig, AuthzError, Hs256JwtValidator, Navigation, PasswordPolicy, Principal, Role, RouteGuard,
        RouteRequirement, TenantDirectory, authorize_tenant,
    };
    use bizdesk_core::{RegistrationRequestId, UserId};
    use bizdesk_onboarding::{
        CompanyInfo, Notification, OnboardingError, OnboardingService, Outbox, OwnerInfo, ProvisionedAccount,
        ProvisioningRequest, RegistrationStatus, TenantProvisioner,
    };
    use bizdesk_session::{InMemoryCredentialStorage, LoginOutcome, LoginRequest, SessionError, SessionStore};

    use crate::{AccountDirectory, DirectoryIdentityGateway, InMemoryOutbox, InMemoryRegistrationRequestStore, RecordingNotifier};

    type Service = OnboardingService<
        Arc<InMemoryRegistrationRequestStore>,
        Arc<AccountDirectory>,
        Arc<InMemoryOutbox>,
        Arc<RecordingNotifier>,
    >;

    struct Harness {
        service: Service,
        directory: Arc<AccountDirectory>,
        outbox: Arc<InMemoryOutbox>,
        notifier: Arc<RecordingNotifier>,
        admin: Principal,
    }

    fn setup() -> Harness {
        let directory = Arc::new(AccountDirectory::new(&AuthConfig::default()));
        let admin = directory
            .seed_platform_admin("root@bizdesk.tn", "Root", "rootPassword1")
            .unwrap();
        let outbox = Arc::new(InMemoryOutbox::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = OnboardingService::new(
            Arc::new(InMemoryRegistrationRequestStore::new()),
            directory.clone(),
            outbox.clone(),
            notifier.clone(),
        );
        Harness {
            service,
            directory,
            outbox,
            notifier,
            admin,
        }
    }

    fn aziz() -> (OwnerInfo, CompanyInfo) {
        (
            OwnerInfo {
                name: "Aziz".into(),
                email: "aziz@x.tn".into(),
                phone: None,
            },
            CompanyInfo {
                name: "Acme".into(),
                category: "IT".into(),
                address: None,
                tax_id: None,
            },
        )
    }

    fn emailed_temporary_password(notifier: &RecordingNotifier) -> String {
        match &notifier.sent()[0] {
            Notification::RegistrationApproved { temporary_password, .. } => temporary_password.clone(),
            other => panic!("unexpected notification {other:?}"),
        }
    }

    /// Runs a competing approval's provisioning right after the winning one.
    struct CompetingProvisioner(Arc<AccountDirectory>);

    impl TenantProvisioner for CompetingProvisioner {
        fn provision(&self, request: &ProvisioningRequest) -> Result<ProvisionedAccount, OnboardingError> {
            let winner = self.0.provision(request)?;
            self.0.provision(request)?;
            Ok(winner)
        }
    }

    fn session(directory: Arc<AccountDirectory>) -> SessionStore<DirectoryIdentityGateway, InMemoryCredentialStorage> {
        let gateway = DirectoryIdentityGateway::new(directory, Hs256JwtValidator::new(b"test-secret".to_vec(), 3600));
        SessionStore::new(
            gateway,
            InMemoryCredentialStorage::new(),
            PasswordPolicy::default(),
            RouteGuard::default(),
        )
    }

    #[test]
    fn approval_provisions_flagged_owner_and_notifies() {
        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();
        assert_eq!(request.status, RegistrationStatus::Pending);

        let pending = h.service.list(Some(&h.admin), RegistrationStatus::Pending).unwrap();
        assert_eq!(pending.len(), 1);

        let receipt = h.service.approve(Some(&h.admin), request.id).unwrap();
        assert_eq!(receipt.request.status, RegistrationStatus::Approved);
        assert_eq!(receipt.request.decided_by, Some(h.admin.id));
        assert!(receipt.notification_delivered);

        let owner = h.directory.principal(receipt.owner_id).unwrap();
        assert!(owner.must_change_password);
        assert_eq!(owner.role, Role::BusinessOwner);
        assert!(h.directory.tenant_exists(receipt.tenant_id));

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient(), "aziz@x.tn");
        assert!(matches!(sent[0], Notification::RegistrationApproved { .. }));
        assert!(h.outbox.is_empty());

        assert!(h.service.list(Some(&h.admin), RegistrationStatus::Pending).unwrap().is_empty());
    }

    #[test]
    fn second_approval_conflicts_without_reprovisioning() {
        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();
        let receipt = h.service.approve(Some(&h.admin), request.id).unwrap();

        let err = h.service.approve(Some(&h.admin), request.id).unwrap_err();
        assert!(err.is_conflict());
        let err = h.service.reject(Some(&h.admin), request.id, "late").unwrap_err();
        assert!(err.is_conflict());

        let stored = h.service.get(Some(&h.admin), request.id).unwrap();
        assert_eq!(stored.status, RegistrationStatus::Approved);
        assert_eq!(stored.provisioned_tenant, Some(receipt.tenant_id));
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[test]
    fn late_provisioning_replay_keeps_emailed_password_valid() {
        let h = setup();
        let service = OnboardingService::new(
            Arc::new(InMemoryRegistrationRequestStore::new()),
            CompetingProvisioner(h.directory.clone()),
            h.outbox.clone(),
            h.notifier.clone(),
        );
        let (owner, company) = aziz();
        let request = service.submit(owner, company).unwrap();

        let receipt = service.approve(Some(&h.admin), request.id).unwrap();
        let temporary = emailed_temporary_password(&h.notifier);

        let owner = h
            .directory
            .verify_credentials("aziz@x.tn", &temporary, None, Utc::now())
            .unwrap();
        assert_eq!(owner.id, receipt.owner_id);
        assert!(owner.must_change_password);
    }

    #[test]
    fn concurrent_approvals_decide_once() {
        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();

        let outcomes: Vec<_> = std::thread::scope(|scope| {
            let racers: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| h.service.approve(Some(&h.admin), request.id)))
                .collect();
            racers.into_iter().map(|r| r.join().unwrap()).collect()
        });

        let approved: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
        assert_eq!(approved.len(), 1);
        assert!(outcomes.iter().filter_map(|o| o.as_ref().err()).all(OnboardingError::is_conflict));

        assert_eq!(h.notifier.sent().len(), 1);
        let temporary = emailed_temporary_password(&h.notifier);
        let owner = h
            .directory
            .verify_credentials("aziz@x.tn", &temporary, None, Utc::now())
            .unwrap();
        assert_eq!(owner.id, approved[0].owner_id);
    }

    #[test]
    fn empty_reason_keeps_request_pending() {
        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();

        let err = h.service.reject(Some(&h.admin), request.id, "   ").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            h.service.get(Some(&h.admin), request.id).unwrap().status,
            RegistrationStatus::Pending
        );

        let rejected = h.service.reject(Some(&h.admin), request.id, "Incomplete tax id").unwrap();
        assert_eq!(rejected.status, RegistrationStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Incomplete tax id"));
        assert!(matches!(
            h.notifier.sent().first(),
            Some(Notification::RegistrationRejected { reason, .. }) if reason == "Incomplete tax id"
        ));
    }

    #[test]
    fn failed_dispatch_is_retried_by_flush() {
        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();

        h.notifier.set_failing(true);
        let receipt = h.service.approve(Some(&h.admin), request.id).unwrap();
        assert!(!receipt.notification_delivered);
        assert_eq!(receipt.request.status, RegistrationStatus::Approved);
        assert_eq!(h.outbox.len(), 1);
        assert_eq!(h.outbox.pending()[0].attempts, 1);

        let report = h.service.flush_outbox();
        assert_eq!((report.sent, report.failed), (0, 1));

        h.notifier.set_failing(false);
        let report = h.service.flush_outbox();
        assert_eq!((report.sent, report.failed), (1, 0));
        assert!(h.outbox.is_empty());
        assert_eq!(h.notifier.sent()[0].recipient(), "aziz@x.tn");
    }

    #[test]
    fn review_is_reserved_to_platform_admins() {
        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();
        let owner = Principal::new(UserId::new(), "o@x.tn", "O", Role::BusinessOwner);
        let flagged_admin = h.admin.clone().requiring_password_change();

        assert_eq!(
            h.service.approve(None, request.id).unwrap_err(),
            OnboardingError::Authz(AuthzError::NotAuthenticated)
        );
        assert_eq!(
            h.service.list(Some(&owner), RegistrationStatus::Pending).unwrap_err(),
            OnboardingError::Authz(AuthzError::RoleNotAllowed {
                role: Role::BusinessOwner
            })
        );
        assert_eq!(
            h.service.reject(Some(&flagged_admin), request.id, "no").unwrap_err(),
            OnboardingError::Authz(AuthzError::PasswordChangeRequired)
        );
        assert!(h.service.get(Some(&h.admin), RegistrationRequestId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn invalid_submission_is_not_stored() {
        let h = setup();
        let (mut owner, company) = aziz();
        owner.email = "not-an-email".into();

        assert!(h.service.submit(owner, company).unwrap_err().is_validation());
        assert!(h.service.list(Some(&h.admin), RegistrationStatus::Pending).unwrap().is_empty());
    }

    #[tokio::test]
    async fn provisioned_owner_must_rotate_before_tenant_access() {
        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();
        let receipt = h.service.approve(Some(&h.admin), request.id).unwrap();
        let temporary = match &h.notifier.sent()[0] {
            Notification::RegistrationApproved { temporary_password, .. } => temporary_password.clone(),
            other => panic!("unexpected notification {other:?}"),
        };

        let store = session(h.directory.clone());
        let outcome = store.login(LoginRequest::new("aziz@x.tn", temporary.clone())).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::PasswordChangeRequired(_)));

        let dashboard = RouteRequirement::authenticated();
        assert!(matches!(
            store.navigate(&dashboard, "/dashboard"),
            Navigation::RedirectToPasswordReset { .. }
        ));
        assert_eq!(
            store.select_tenant(receipt.tenant_id, h.directory.as_ref()),
            Err(SessionError::Authz(AuthzError::PasswordChangeRequired))
        );

        assert!(matches!(
            store.change_password_first(&temporary).await,
            Err(SessionError::Validation(_))
        ));
        let owner = store.change_password_first("newStrongPass1").await.unwrap();
        assert!(!owner.must_change_password);

        assert_eq!(store.navigate(&dashboard, "/dashboard"), Navigation::Allow);
        assert_eq!(store.take_return_to().as_deref(), Some("/dashboard"));
        store.select_tenant(receipt.tenant_id, h.directory.as_ref()).unwrap();
        assert_eq!(store.snapshot().selected_tenant, Some(receipt.tenant_id));
        assert!(authorize_tenant(Some(&owner), receipt.tenant_id, h.directory.as_ref()).is_ok());
    }

    #[tokio::test]
    async fn invite_token_is_single_use() {
        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();
        let receipt = h.service.approve(Some(&h.admin), request.id).unwrap();
        let owner = h.directory.change_password_first(receipt.owner_id, "newStrongPass1").unwrap();

        let invitation = h
            .directory
            .invite_member(&owner, "sami@x.tn", "Sami", Role::TeamMember, &["invoices.view".to_string()])
            .unwrap();

        let store = session(h.directory.clone());
        let member = store.accept_invite(&invitation.token, "samiPassword1").await.unwrap();
        assert!(!member.must_change_password);
        assert_eq!(store.principal().map(|p| p.id), Some(invitation.member.id));

        assert!(matches!(
            store.accept_invite(&invitation.token, "samiPassword2").await,
            Err(SessionError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn temporary_token_goes_stale_after_rotation() {
        use bizdesk_session::IdentityGateway;

        let h = setup();
        let (owner, company) = aziz();
        let request = h.service.submit(owner, company).unwrap();
        h.service.approve(Some(&h.admin), request.id).unwrap();
        let temporary = match &h.notifier.sent()[0] {
            Notification::RegistrationApproved { temporary_password, .. } => temporary_password.clone(),
            other => panic!("unexpected notification {other:?}"),
        };

        let gateway =
            DirectoryIdentityGateway::new(h.directory.clone(), Hs256JwtValidator::new(b"test-secret".to_vec(), 3600));
        let grant = gateway.login(&LoginRequest::new("aziz@x.tn", temporary)).await.unwrap();
        assert!(grant.principal.must_change_password);

        let rotated = gateway.change_password_first(&grant.token, "newStrongPass1").await.unwrap();
        assert!(!rotated.principal.must_change_password);

        assert_eq!(
            gateway.current_principal(&grant.token).await,
            Err(SessionError::NotAuthenticated)
        );
        assert_eq!(gateway.current_principal(&rotated.token).await.unwrap().id, rotated.principal.id);
    }
}
