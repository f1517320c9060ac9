//! Note Service
//!
//! The note lifecycle: create, fetch, verify, update, availability and
//! ownership checks. Handlers are thin wrappers around these methods.
//!
//! Password state per note is either unprotected or protected:
//! - on a protected note, `password` is the proof of knowledge, `newPassword`
//!   rotates it and `removePassword` clears it
//! - on an unprotected note, a supplied `password` protects it

use chrono::Utc;
use notepad_core::{new_note_id, Note, NoteLimits, ShortCode};
use notepad_storage::{NoteStore, NoteUpdate, PasswordChange};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::services::{OwnerTokenIssuer, PasswordGuard, ShortCodeAllocator};
use crate::telemetry::metrics::with_metrics;
use crate::types::{
    AvailabilityResponse, CreateNoteRequest, CreateNoteResponse, NoteResponse, OwnershipResponse,
    UpdateNoteRequest,
};

/// Outcome of a password check against a protected note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The password matched; the full note is released.
    Valid(Note),
    Invalid,
}

/// Empty strings from form fields mean "not supplied".
fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Business logic for notes.
#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn NoteStore>,
    allocator: ShortCodeAllocator,
    guard: PasswordGuard,
    owner_tokens: OwnerTokenIssuer,
    limits: NoteLimits,
    public_base_url: String,
}

impl NoteService {
    pub fn new(
        store: Arc<dyn NoteStore>,
        guard: PasswordGuard,
        owner_tokens: OwnerTokenIssuer,
        limits: NoteLimits,
        public_base_url: impl Into<String>,
    ) -> Self {
        let allocator = ShortCodeAllocator::new(store.clone(), limits.short_codes);
        Self {
            store,
            allocator,
            guard,
            owner_tokens,
            limits,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn limits(&self) -> &NoteLimits {
        &self.limits
    }

    pub fn owner_tokens(&self) -> &OwnerTokenIssuer {
        &self.owner_tokens
    }

    /// Shareable URL for a short code.
    pub fn share_url(&self, code: &ShortCode) -> String {
        format!("{}/{}", self.public_base_url, code)
    }

    /// Readiness check for the backing store.
    pub async fn health_check(&self) -> ApiResult<()> {
        self.store.health_check().await?;
        Ok(())
    }

    /// Look a note up by a raw path code. A malformed code cannot exist.
    async fn load(&self, raw_code: &str) -> ApiResult<Note> {
        let Ok(code) = ShortCode::parse_lookup(raw_code) else {
            return Err(ApiError::note_not_found(raw_code));
        };
        self.store
            .note_get_by_code(&code)
            .await?
            .ok_or_else(|| ApiError::note_not_found(&code))
    }

    // ========================================================================
    // CREATE
    // ========================================================================

    /// Create a note.
    ///
    /// # Errors
    /// Validation errors for content, password or custom code, `CODE_TAKEN`
    /// for a custom code in use (or lost to a concurrent insert), and
    /// `ALLOCATION_EXHAUSTED` when no generated code was free.
    pub async fn create(&self, req: CreateNoteRequest) -> ApiResult<CreateNoteResponse> {
        let CreateNoteRequest {
            content,
            password,
            custom_code,
        } = req;

        self.limits.content.validate_non_empty(&content)?;

        let password = supplied(password);
        if let Some(password) = &password {
            self.limits.passwords.validate(password)?;
        }

        let custom_code = supplied(custom_code);
        let is_custom = custom_code.is_some();
        let short_code = match custom_code {
            Some(raw) => self.allocator.validate_custom(&raw).await?,
            None => self.allocator.generate_and_reserve().await?,
        };

        let password_hash = match &password {
            Some(password) => Some(self.guard.hash(password).await?),
            None => None,
        };

        let now = Utc::now();
        let note = Note {
            id: new_note_id(),
            short_code,
            content,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        self.store.note_insert(&note).await?;

        let protected = note.is_protected();
        with_metrics(|m| m.record_note_created(protected, is_custom));
        tracing::info!(
            note_id = %note.id,
            protected,
            custom_code = is_custom,
            "Note created"
        );

        Ok(CreateNoteResponse {
            url: self.share_url(&note.short_code),
            owner_token: self.owner_tokens.issue(note.id)?,
            short_code: note.short_code.into_inner(),
        })
    }

    // ========================================================================
    // READ
    // ========================================================================

    /// Fetch a note. Content of protected notes is withheld.
    pub async fn fetch(&self, raw_code: &str) -> ApiResult<NoteResponse> {
        let note = self.load(raw_code).await?;
        Ok(NoteResponse::public(note))
    }

    /// Check a password against a protected note.
    ///
    /// A wrong password is an `Invalid` outcome, returned after the guard's
    /// failure delay, not an error.
    ///
    /// # Errors
    /// `NOTE_NOT_FOUND`, or `NOT_PASSWORD_PROTECTED` if the note has no hash.
    pub async fn verify_password(&self, raw_code: &str, password: &str) -> ApiResult<VerifyOutcome> {
        let note = self.load(raw_code).await?;
        let Some(hash) = note.password_hash.as_deref() else {
            return Err(ApiError::not_password_protected(&note.short_code));
        };

        let valid = self.guard.verify(password, hash).await;
        with_metrics(|m| m.record_password_verification(valid));

        if valid {
            Ok(VerifyOutcome::Valid(note))
        } else {
            tracing::info!(note_id = %note.id, "Password verification failed");
            Ok(VerifyOutcome::Invalid)
        }
    }

    // ========================================================================
    // UPDATE
    // ========================================================================

    /// Apply a partial update.
    ///
    /// Input is validated before the password proof is checked, and the
    /// new code's availability is checked only after the proof succeeds.
    ///
    /// # Errors
    /// `UNAUTHORIZED` when a protected note's password is missing or wrong,
    /// validation errors for bad input or an empty update, `CODE_TAKEN` for a
    /// new short code in use, `NOTE_NOT_FOUND`.
    pub async fn update(&self, raw_code: &str, req: UpdateNoteRequest) -> ApiResult<NoteResponse> {
        let note = self.load(raw_code).await?;

        let password = supplied(req.password);
        let new_password = supplied(req.new_password);
        let remove_password = req.remove_password.unwrap_or(false);

        if let Some(content) = &req.content {
            self.limits.content.validate(content)?;
        }

        let new_code = match supplied(req.new_short_code) {
            Some(raw) if raw != note.short_code.as_str() => {
                Some(ShortCode::parse_custom(&raw, &self.limits.short_codes)?)
            }
            _ => None,
        };

        let password_change = match note.password_hash.as_deref() {
            Some(current_hash) => {
                if remove_password && new_password.is_some() {
                    return Err(ApiError::validation_failed(
                        "newPassword and removePassword cannot be combined",
                    ));
                }
                if let Some(next) = &new_password {
                    self.limits.passwords.validate(next)?;
                }
                let wants_change =
                    req.content.is_some() || new_code.is_some() || remove_password || new_password.is_some();
                if !wants_change {
                    return Err(ApiError::validation_failed("No changes requested"));
                }

                let valid = match &password {
                    Some(proof) => self.guard.verify(proof, current_hash).await,
                    None => self.guard.reject().await,
                };
                with_metrics(|m| m.record_password_verification(valid));
                if !valid {
                    tracing::info!(
                        note_id = %note.id,
                        proof_supplied = password.is_some(),
                        "Update rejected: password check failed"
                    );
                    return Err(ApiError::unauthorized("Invalid password"));
                }

                if remove_password {
                    PasswordChange::Clear
                } else if let Some(next) = new_password {
                    PasswordChange::Set(self.guard.hash(&next).await?)
                } else {
                    PasswordChange::Keep
                }
            }
            None => {
                // No current password to prove; the first one supplied
                // protects the note.
                if password.is_some() && new_password.is_some() {
                    return Err(ApiError::validation_failed(
                        "password and newPassword cannot be combined on an unprotected note",
                    ));
                }
                let initial = password.or(new_password);
                if let Some(initial) = &initial {
                    self.limits.passwords.validate(initial)?;
                }
                if req.content.is_none() && new_code.is_none() && initial.is_none() {
                    return Err(ApiError::validation_failed("No changes requested"));
                }
                match initial {
                    Some(initial) => PasswordChange::Set(self.guard.hash(&initial).await?),
                    None => PasswordChange::Keep,
                }
            }
        };

        if let Some(code) = &new_code {
            self.allocator.ensure_available(code).await?;
        }

        let update = NoteUpdate {
            content: req.content,
            password: password_change,
            short_code: new_code,
            updated_at: Utc::now(),
        };

        let updated = self
            .store
            .note_update(note.id, update)
            .await?
            .ok_or_else(|| ApiError::note_not_found(&note.short_code))?;

        tracing::info!(
            note_id = %updated.id,
            protected = updated.is_protected(),
            code_changed = updated.short_code != note.short_code,
            "Note updated"
        );

        Ok(NoteResponse::revealed(updated))
    }

    // ========================================================================
    // CHECKS
    // ========================================================================

    /// Whether a code could be claimed as a custom code right now.
    ///
    /// Never errors for absence. A code that fails the custom code rules is
    /// reported unavailable with a reason.
    pub async fn check_availability(&self, raw_code: &str) -> ApiResult<AvailabilityResponse> {
        let code = match ShortCode::parse_custom(raw_code, &self.limits.short_codes) {
            Ok(code) => code,
            Err(e) => {
                return Ok(AvailabilityResponse {
                    available: false,
                    reason: Some(e.to_string()),
                })
            }
        };

        let taken = self.store.note_code_exists(&code).await?;
        Ok(AvailabilityResponse {
            available: !taken,
            reason: None,
        })
    }

    /// Whether `token` is the owner token issued for this note.
    pub async fn check_ownership(
        &self,
        raw_code: &str,
        token: Option<&str>,
    ) -> ApiResult<OwnershipResponse> {
        let note = self.load(raw_code).await?;
        let is_owner = token
            .map(|token| self.owner_tokens.verify(note.id, token))
            .unwrap_or(false);
        Ok(OwnershipResponse { is_owner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordConfig;
    use crate::error::ErrorCode;
    use async_trait::async_trait;
    use notepad_core::NoteId;
    use notepad_storage::{InMemoryNoteStore, StoreError, StoreResult};
    use std::time::{Duration, Instant};

    fn service_over(store: Arc<dyn NoteStore>, passwords: &PasswordConfig) -> NoteService {
        let guard = PasswordGuard::new(passwords).unwrap();
        let tokens = OwnerTokenIssuer::new("unit-test-secret").unwrap();
        NoteService::new(store, guard, tokens, NoteLimits::default(), "https://notepad.test/")
    }

    fn service() -> (NoteService, InMemoryNoteStore) {
        let store = InMemoryNoteStore::new();
        let service = service_over(Arc::new(store.clone()), &PasswordConfig::for_testing());
        (service, store)
    }

    /// Reports every code free but loses every write to a concurrent claim.
    struct RacingStore {
        inner: InMemoryNoteStore,
    }

    #[async_trait]
    impl NoteStore for RacingStore {
        async fn note_insert(&self, note: &Note) -> StoreResult<()> {
            Err(StoreError::Conflict {
                short_code: note.short_code.to_string(),
            })
        }

        async fn note_get_by_code(&self, code: &ShortCode) -> StoreResult<Option<Note>> {
            self.inner.note_get_by_code(code).await
        }

        async fn note_code_exists(&self, _code: &ShortCode) -> StoreResult<bool> {
            Ok(false)
        }

        async fn note_update(&self, _id: NoteId, update: NoteUpdate) -> StoreResult<Option<Note>> {
            Err(StoreError::Conflict {
                short_code: update.short_code.map(ShortCode::into_inner).unwrap_or_default(),
            })
        }

        async fn health_check(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    fn create_req(content: &str, password: Option<&str>, code: Option<&str>) -> CreateNoteRequest {
        CreateNoteRequest {
            content: content.to_string(),
            password: password.map(str::to_string),
            custom_code: code.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_generated_code() {
        let (service, store) = service();
        let created = service.create(create_req("hello", None, None)).await.unwrap();

        assert_eq!(created.short_code.len(), 8);
        assert_eq!(created.url, format!("https://notepad.test/{}", created.short_code));
        assert_eq!(store.note_count(), 1);

        let fetched = service.fetch(&created.short_code).await.unwrap();
        assert_eq!(fetched.content, "hello");
        assert!(!fetched.has_password);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content() {
        let (service, store) = service();
        let err = service.create(create_req("  ", None, None)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingField);
        assert_eq!(store.note_count(), 0);
    }

    #[tokio::test]
    async fn test_create_custom_code_taken() {
        let (service, _) = service();
        service.create(create_req("a", None, Some("my-note"))).await.unwrap();
        let err = service
            .create(create_req("b", None, Some("my-note")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CodeTaken);
    }

    #[tokio::test]
    async fn test_empty_password_means_unprotected() {
        let (service, _) = service();
        let created = service.create(create_req("x", Some(""), None)).await.unwrap();
        let fetched = service.fetch(&created.short_code).await.unwrap();
        assert!(!fetched.has_password);
    }

    #[tokio::test]
    async fn test_protected_fetch_and_verify() {
        let (service, _) = service();
        let created = service
            .create(create_req("secret stuff", Some("pw1234"), Some("locked1")))
            .await
            .unwrap();

        let fetched = service.fetch("locked1").await.unwrap();
        assert!(fetched.has_password);
        assert_eq!(fetched.content, "");

        match service.verify_password("locked1", "pw1234").await.unwrap() {
            VerifyOutcome::Valid(note) => assert_eq!(note.content, "secret stuff"),
            VerifyOutcome::Invalid => panic!("expected valid password"),
        }
        assert_eq!(
            service.verify_password("locked1", "nope").await.unwrap(),
            VerifyOutcome::Invalid
        );
        assert_eq!(created.short_code, "locked1");
    }

    #[tokio::test]
    async fn test_verify_unprotected_is_error() {
        let (service, _) = service();
        service.create(create_req("open", None, Some("open123"))).await.unwrap();
        let err = service.verify_password("open123", "pw").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotPasswordProtected);
    }

    #[tokio::test]
    async fn test_fetch_missing_and_malformed() {
        let (service, _) = service();
        assert_eq!(
            service.fetch("missing1").await.unwrap_err().code,
            ErrorCode::NoteNotFound
        );
        assert_eq!(
            service.fetch("bad code!").await.unwrap_err().code,
            ErrorCode::NoteNotFound
        );
    }

    #[tokio::test]
    async fn test_update_protected_requires_password() {
        let (service, _) = service();
        service
            .create(create_req("v1", Some("pw1234"), Some("guarded")))
            .await
            .unwrap();
        let before = service.fetch("guarded").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let req = UpdateNoteRequest {
            content: Some("v2".to_string()),
            ..UpdateNoteRequest::default()
        };
        let err = service.update("guarded", req.clone()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let wrong = UpdateNoteRequest {
            password: Some("wrong".to_string()),
            ..req.clone()
        };
        assert_eq!(
            service.update("guarded", wrong).await.unwrap_err().code,
            ErrorCode::Unauthorized
        );

        let right = UpdateNoteRequest {
            password: Some("pw1234".to_string()),
            ..req
        };
        let updated = service.update("guarded", right).await.unwrap();
        assert_eq!(updated.content, "v2");
        assert!(updated.has_password);
        assert!(updated.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_password_is_delayed() {
        let passwords = PasswordConfig {
            failure_delay: Duration::from_millis(50),
            ..PasswordConfig::for_testing()
        };
        let service = service_over(Arc::new(InMemoryNoteStore::new()), &passwords);
        service
            .create(create_req("v1", Some("pw1234"), Some("delayed1")))
            .await
            .unwrap();

        let no_proof = UpdateNoteRequest {
            content: Some("v2".to_string()),
            ..UpdateNoteRequest::default()
        };
        let started = Instant::now();
        let err = service.update("delayed1", no_proof.clone()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(started.elapsed() >= Duration::from_millis(50));

        let wrong = UpdateNoteRequest {
            password: Some("wrong".to_string()),
            ..no_proof
        };
        let started = Instant::now();
        let wrong_err = service.update("delayed1", wrong).await.unwrap_err();
        assert_eq!(wrong_err.code, ErrorCode::Unauthorized);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(err.message, wrong_err.message);
    }

    #[tokio::test]
    async fn test_update_rotates_and_removes_password() {
        let (service, _) = service();
        service
            .create(create_req("body", Some("first"), Some("rotate1")))
            .await
            .unwrap();

        let rotate = UpdateNoteRequest {
            password: Some("first".to_string()),
            new_password: Some("second".to_string()),
            ..UpdateNoteRequest::default()
        };
        service.update("rotate1", rotate).await.unwrap();
        assert_eq!(
            service.verify_password("rotate1", "first").await.unwrap(),
            VerifyOutcome::Invalid
        );
        assert!(matches!(
            service.verify_password("rotate1", "second").await.unwrap(),
            VerifyOutcome::Valid(_)
        ));

        let remove = UpdateNoteRequest {
            password: Some("second".to_string()),
            remove_password: Some(true),
            ..UpdateNoteRequest::default()
        };
        let updated = service.update("rotate1", remove).await.unwrap();
        assert!(!updated.has_password);
        assert_eq!(service.fetch("rotate1").await.unwrap().content, "body");
    }

    #[tokio::test]
    async fn test_update_unprotected_sets_password() {
        let (service, _) = service();
        service.create(create_req("open", None, Some("protect1"))).await.unwrap();

        let req = UpdateNoteRequest {
            password: Some("fresh".to_string()),
            ..UpdateNoteRequest::default()
        };
        let updated = service.update("protect1", req).await.unwrap();
        assert!(updated.has_password);
        assert_eq!(service.fetch("protect1").await.unwrap().content, "");
    }

    #[tokio::test]
    async fn test_update_unprotected_rejects_two_initial_passwords() {
        let (service, _) = service();
        service.create(create_req("open", None, Some("protect2"))).await.unwrap();

        let req = UpdateNoteRequest {
            password: Some("first".to_string()),
            new_password: Some("second".to_string()),
            ..UpdateNoteRequest::default()
        };
        let err = service.update("protect2", req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(!service.fetch("protect2").await.unwrap().has_password);
    }

    #[tokio::test]
    async fn test_update_changes_short_code() {
        let (service, _) = service();
        service.create(create_req("a", None, Some("first-code"))).await.unwrap();
        service.create(create_req("b", None, Some("other-code"))).await.unwrap();

        let taken = UpdateNoteRequest {
            new_short_code: Some("other-code".to_string()),
            ..UpdateNoteRequest::default()
        };
        assert_eq!(
            service.update("first-code", taken).await.unwrap_err().code,
            ErrorCode::CodeTaken
        );

        let free = UpdateNoteRequest {
            new_short_code: Some("second-code".to_string()),
            ..UpdateNoteRequest::default()
        };
        let updated = service.update("first-code", free).await.unwrap();
        assert_eq!(updated.short_code, "second-code");
        assert_eq!(
            service.fetch("first-code").await.unwrap_err().code,
            ErrorCode::NoteNotFound
        );
    }

    #[tokio::test]
    async fn test_update_without_changes_rejected() {
        let (service, _) = service();
        service.create(create_req("a", None, Some("nochange"))).await.unwrap();

        let same_code = UpdateNoteRequest {
            new_short_code: Some("nochange".to_string()),
            ..UpdateNoteRequest::default()
        };
        let err = service.update("nochange", same_code).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let (service, _) = service();
        service.create(create_req("a", None, Some("timing1"))).await.unwrap();
        let before = service.fetch("timing1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let req = UpdateNoteRequest {
            content: Some("b".to_string()),
            ..UpdateNoteRequest::default()
        };
        let after = service.update("timing1", req).await.unwrap();
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_write_conflict_after_free_check_is_code_taken() {
        let inner = InMemoryNoteStore::new();
        let service = service_over(
            Arc::new(RacingStore {
                inner: inner.clone(),
            }),
            &PasswordConfig::for_testing(),
        );

        let custom = service
            .create(create_req("a", None, Some("raced-code")))
            .await
            .unwrap_err();
        assert_eq!(custom.code, ErrorCode::CodeTaken);

        let generated = service.create(create_req("a", None, None)).await.unwrap_err();
        assert_eq!(generated.code, ErrorCode::CodeTaken);

        let existing = Note {
            id: new_note_id(),
            short_code: ShortCode::from_stored("old-code".to_string()),
            content: "body".to_string(),
            password_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.note_insert(&existing).await.unwrap();

        let rename = UpdateNoteRequest {
            new_short_code: Some("raced-code".to_string()),
            ..UpdateNoteRequest::default()
        };
        let err = service.update("old-code", rename).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CodeTaken);
    }

    #[tokio::test]
    async fn test_check_availability() {
        let (service, _) = service();
        service.create(create_req("a", None, Some("in-use-1"))).await.unwrap();

        assert!(!service.check_availability("in-use-1").await.unwrap().available);
        assert!(service.check_availability("free-123").await.unwrap().available);

        let invalid = service.check_availability("x").await.unwrap();
        assert!(!invalid.available);
        assert!(invalid.reason.is_some());
    }

    #[tokio::test]
    async fn test_check_ownership() {
        let (service, _) = service();
        let created = service.create(create_req("mine", None, None)).await.unwrap();

        let owner = service
            .check_ownership(&created.short_code, Some(&created.owner_token))
            .await
            .unwrap();
        assert!(owner.is_owner);

        let stranger = service
            .check_ownership(&created.short_code, Some("deadbeef"))
            .await
            .unwrap();
        assert!(!stranger.is_owner);

        let anonymous = service.check_ownership(&created.short_code, None).await.unwrap();
        assert!(!anonymous.is_owner);
    }
}
