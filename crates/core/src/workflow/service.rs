//! Client-facing workflow operations.
//!
//! Every operation takes the calling [`Actor`] explicitly. Status changes go
//! through [`TransitionEngine`]; item results go through
//! [`ComputationAggregator`].

use std::sync::Arc;

use crate::calculation_status::RequestStatus;
use crate::callback::verify_callback_secret;
use crate::error::CoreError;
use crate::roles::Actor;
use crate::types::DbId;
use crate::wavelength::compute_wavelength;
use crate::workflow::aggregator::{AggregateOutcome, ComputationAggregator};
use crate::workflow::model::{
    CalculationItem, CalculationRequest, ComputedResult, DraftSummary, ItemResult,
    RequestDetail, RequestFilter, StatusChange,
};
use crate::workflow::store::WorkflowStore;
use crate::workflow::transition::TransitionEngine;

/// Maximum length of a request name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Pre-shared secret presented by the external computation service.
    pub callback_secret: String,
    /// Identity recorded as reviewer on automatic transitions.
    pub system_reviewer_id: DbId,
}

pub struct WorkflowService<S> {
    store: Arc<S>,
    config: WorkflowConfig,
}

impl<S: WorkflowStore> WorkflowService<S> {
    pub fn new(store: Arc<S>, config: WorkflowConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Draft editing
    // ------------------------------------------------------------------

    /// Add a particle to the caller's draft, creating the draft if needed.
    pub async fn create_draft_with_item(
        &self,
        actor: &Actor,
        particle_id: DbId,
    ) -> Result<RequestDetail, CoreError> {
        self.store
            .find_particle(particle_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Particle",
                id: particle_id,
            })?;

        let draft = self.find_or_create_draft(actor.user_id).await?;
        self.insert_item(&draft, particle_id).await?;

        tracing::info!(
            user_id = actor.user_id,
            request_id = draft.id,
            particle_id,
            "Particle added to draft"
        );
        self.detail(draft).await
    }

    pub async fn add_item(
        &self,
        request_id: DbId,
        actor: &Actor,
        particle_id: DbId,
    ) -> Result<CalculationItem, CoreError> {
        let request = self.editable_draft(request_id, actor).await?;
        self.store
            .find_particle(particle_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Particle",
                id: particle_id,
            })?;

        let item = self.insert_item(&request, particle_id).await?;
        tracing::info!(
            user_id = actor.user_id,
            request_id,
            particle_id,
            "Calculation item added"
        );
        Ok(item)
    }

    pub async fn remove_item(
        &self,
        request_id: DbId,
        actor: &Actor,
        particle_id: DbId,
    ) -> Result<(), CoreError> {
        self.editable_draft(request_id, actor).await?;

        if !self.store.remove_item(request_id, particle_id).await? {
            return Err(self.draft_write_missed(request_id, particle_id).await);
        }

        tracing::info!(
            user_id = actor.user_id,
            request_id,
            particle_id,
            "Calculation item removed"
        );
        Ok(())
    }

    /// Set the input velocity (m/s) of one item.
    pub async fn set_item_parameter(
        &self,
        request_id: DbId,
        actor: &Actor,
        particle_id: DbId,
        velocity: f64,
    ) -> Result<CalculationItem, CoreError> {
        if !velocity.is_finite() || velocity <= 0.0 {
            return Err(CoreError::Validation(
                "Velocity must be a positive finite number".into(),
            ));
        }
        self.editable_draft(request_id, actor).await?;

        match self
            .store
            .set_velocity(request_id, particle_id, velocity)
            .await?
        {
            Some(item) => {
                tracing::debug!(
                    request_id,
                    particle_id,
                    velocity,
                    "Calculation item velocity set"
                );
                Ok(item)
            }
            None => Err(self.draft_write_missed(request_id, particle_id).await),
        }
    }

    pub async fn rename(
        &self,
        request_id: DbId,
        actor: &Actor,
        name: &str,
    ) -> Result<CalculationRequest, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("Name must not be empty".into()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(CoreError::Validation(format!(
                "Name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }
        self.editable_draft(request_id, actor).await?;

        match self.store.rename_draft(request_id, name).await? {
            Some(request) => Ok(request),
            None => Err(self.not_a_draft(request_id).await),
        }
    }

    // ------------------------------------------------------------------
    // Status transitions
    // ------------------------------------------------------------------

    pub async fn submit(
        &self,
        request_id: DbId,
        actor: &Actor,
    ) -> Result<CalculationRequest, CoreError> {
        TransitionEngine::new(self.store.as_ref())
            .transition(request_id, RequestStatus::Formed, actor)
            .await
    }

    pub async fn delete(
        &self,
        request_id: DbId,
        actor: &Actor,
    ) -> Result<CalculationRequest, CoreError> {
        TransitionEngine::new(self.store.as_ref())
            .transition(request_id, RequestStatus::Deleted, actor)
            .await
    }

    /// Approve or reject a formed request.
    ///
    /// Approval computes every item's wavelength and commits the results
    /// together with the status change.
    pub async fn review(
        &self,
        request_id: DbId,
        actor: &Actor,
        approve: bool,
    ) -> Result<RequestDetail, CoreError> {
        let engine = TransitionEngine::new(self.store.as_ref());

        let request = if approve {
            // Authorization and status errors come from the engine.
            let approvable = actor.is_reviewer
                && self
                    .store
                    .find_request(request_id)
                    .await?
                    .is_some_and(|r| r.status == RequestStatus::Formed);
            let results = if approvable {
                computed_results(&self.store.list_items(request_id).await?)?
            } else {
                Vec::new()
            };
            engine
                .transition_with_results(request_id, RequestStatus::Completed, actor, results)
                .await?
        } else {
            engine
                .transition(request_id, RequestStatus::Rejected, actor)
                .await?
        };

        self.detail(request).await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// List submitted requests. Non-reviewers only see their own.
    pub async fn list(
        &self,
        mut filter: RequestFilter,
        actor: &Actor,
    ) -> Result<Vec<CalculationRequest>, CoreError> {
        if let (Some(from), Some(to)) = (filter.formed_from, filter.formed_to) {
            if from > to {
                return Err(CoreError::Validation(
                    "Start of the date range is after its end".into(),
                ));
            }
        }
        if !actor.is_reviewer {
            filter.owner_id = Some(actor.user_id);
        }
        self.store.list_requests(&filter).await
    }

    pub async fn get(&self, request_id: DbId, actor: &Actor) -> Result<RequestDetail, CoreError> {
        let request = self.visible_request(request_id, actor).await?;
        self.detail(request).await
    }

    pub async fn history(
        &self,
        request_id: DbId,
        actor: &Actor,
    ) -> Result<Vec<StatusChange>, CoreError> {
        self.visible_request(request_id, actor).await?;
        self.store.status_history(request_id).await
    }

    /// The caller's current draft and its item count, if any.
    pub async fn draft_summary(&self, actor: &Actor) -> Result<Option<DraftSummary>, CoreError> {
        let Some(draft) = self.store.find_draft(actor.user_id).await? else {
            return Ok(None);
        };
        let progress = self.store.item_progress(draft.id).await?;
        Ok(Some(DraftSummary {
            request_id: draft.id,
            item_count: usize::try_from(progress.total).unwrap_or(0),
        }))
    }

    // ------------------------------------------------------------------
    // Computation results
    // ------------------------------------------------------------------

    /// Callback surface for the external computation service.
    ///
    /// Authenticated only by the shared secret; no ownership or role check.
    pub async fn report_item_result(
        &self,
        item_id: DbId,
        result: ItemResult,
        secret: &str,
    ) -> Result<AggregateOutcome, CoreError> {
        if let Err(e) = verify_callback_secret(&self.config.callback_secret, secret) {
            tracing::warn!(item_id, "Rejected computation callback with invalid secret");
            return Err(e);
        }
        self.aggregator().set_item_result(item_id, result, None).await
    }

    /// Record a result on behalf of a signed-in reviewer.
    pub async fn record_item_result(
        &self,
        item_id: DbId,
        actor: &Actor,
        result: ItemResult,
    ) -> Result<AggregateOutcome, CoreError> {
        if !actor.is_reviewer {
            return Err(CoreError::Forbidden(
                "Reviewer role required to record results".into(),
            ));
        }
        self.aggregator()
            .set_item_result(item_id, result, Some(actor.user_id))
            .await
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn aggregator(&self) -> ComputationAggregator<'_, S> {
        ComputationAggregator::new(self.store.as_ref(), self.config.system_reviewer_id)
    }

    async fn find_or_create_draft(&self, owner_id: DbId) -> Result<CalculationRequest, CoreError> {
        if let Some(draft) = self.store.find_draft(owner_id).await? {
            return Ok(draft);
        }
        match self.store.create_draft(owner_id, None).await {
            Ok(draft) => {
                tracing::info!(user_id = owner_id, request_id = draft.id, "Draft created");
                Ok(draft)
            }
            // A concurrent call created the draft first.
            Err(CoreError::Conflict(_)) => {
                self.store.find_draft(owner_id).await?.ok_or_else(|| {
                    CoreError::Conflict("Draft was created and removed concurrently".into())
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn insert_item(
        &self,
        request: &CalculationRequest,
        particle_id: DbId,
    ) -> Result<CalculationItem, CoreError> {
        match self.store.add_item(request.id, particle_id).await? {
            Some(item) => Ok(item),
            None => Err(self.not_a_draft(request.id).await),
        }
    }

    /// Load a request the caller may edit: it exists, the caller owns it and
    /// it is still a draft.
    async fn editable_draft(
        &self,
        request_id: DbId,
        actor: &Actor,
    ) -> Result<CalculationRequest, CoreError> {
        let request = self.load_request(request_id).await?;
        if request.owner_id != actor.user_id {
            return Err(CoreError::Forbidden(format!(
                "Request {request_id} belongs to another user"
            )));
        }
        if request.status != RequestStatus::Draft {
            return Err(CoreError::PreconditionFailed(format!(
                "Request {request_id} is '{}' and can no longer be edited",
                request.status
            )));
        }
        Ok(request)
    }

    async fn visible_request(
        &self,
        request_id: DbId,
        actor: &Actor,
    ) -> Result<CalculationRequest, CoreError> {
        let request = self.load_request(request_id).await?;
        if request.owner_id != actor.user_id && !actor.is_reviewer {
            return Err(CoreError::Forbidden(format!(
                "Request {request_id} belongs to another user"
            )));
        }
        Ok(request)
    }

    async fn load_request(&self, request_id: DbId) -> Result<CalculationRequest, CoreError> {
        self.store
            .find_request(request_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "CalculationRequest",
                id: request_id,
            })
    }

    async fn detail(&self, request: CalculationRequest) -> Result<RequestDetail, CoreError> {
        let items = self.store.list_items(request.id).await?;
        Ok(RequestDetail { request, items })
    }

    /// Explain why a draft-guarded write matched nothing.
    async fn not_a_draft(&self, request_id: DbId) -> CoreError {
        match self.store.find_request(request_id).await {
            Ok(Some(request)) => CoreError::PreconditionFailed(format!(
                "Request {request_id} is '{}' and can no longer be edited",
                request.status
            )),
            Ok(None) => CoreError::NotFound {
                entity: "CalculationRequest",
                id: request_id,
            },
            Err(e) => e,
        }
    }

    /// Like [`Self::not_a_draft`], but a still-draft request means the item
    /// itself is missing.
    async fn draft_write_missed(&self, request_id: DbId, particle_id: DbId) -> CoreError {
        match self.store.find_request(request_id).await {
            Ok(Some(request)) if request.status == RequestStatus::Draft => CoreError::NotFound {
                entity: "CalculationItem",
                id: particle_id,
            },
            Ok(_) => self.not_a_draft(request_id).await,
            Err(e) => e,
        }
    }
}

/// Wavelengths for every item of a request being approved.
fn computed_results(items: &[CalculationItem]) -> Result<Vec<ComputedResult>, CoreError> {
    items
        .iter()
        .map(|item| {
            let velocity = item.velocity.ok_or_else(|| {
                CoreError::PreconditionFailed(format!(
                    "Item for particle '{}' has no velocity set",
                    item.particle_name
                ))
            })?;
            Ok(ComputedResult {
                item_id: item.id,
                wavelength: compute_wavelength(item.particle_mass, velocity),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::workflow::memory::MemoryStore;
    use crate::workflow::store::ItemStore;

    const SYSTEM: DbId = 1;
    const ALICE: DbId = 2;
    const BOB: DbId = 3;
    const REVIEWER: DbId = 9;
    const SECRET: &str = "callback-secret-for-tests";
    const ELECTRON_MASS: f64 = 9.109384e-31;

    fn service() -> WorkflowService<MemoryStore> {
        WorkflowService::new(
            Arc::new(MemoryStore::new()),
            WorkflowConfig {
                callback_secret: SECRET.into(),
                system_reviewer_id: SYSTEM,
            },
        )
    }

    /// Build a named, fully parameterised draft for `owner` and submit it.
    async fn submitted(svc: &WorkflowService<MemoryStore>, owner: DbId) -> RequestDetail {
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);
        let actor = Actor::creator(owner);
        let draft = svc
            .create_draft_with_item(&actor, electron.id)
            .await
            .unwrap();
        let id = draft.request.id;
        svc.set_item_parameter(id, &actor, electron.id, 1e6)
            .await
            .unwrap();
        svc.rename(id, &actor, "electron run").await.unwrap();
        svc.submit(id, &actor).await.unwrap();
        svc.get(id, &actor).await.unwrap()
    }

    #[tokio::test]
    async fn add_to_draft_reuses_single_draft() {
        let svc = service();
        let alice = Actor::creator(ALICE);
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);
        let proton = svc.store().insert_particle("proton", 1.67262192e-27);

        let first = svc
            .create_draft_with_item(&alice, electron.id)
            .await
            .unwrap();
        let second = svc
            .create_draft_with_item(&alice, proton.id)
            .await
            .unwrap();

        assert_eq!(first.request.id, second.request.id);
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.request.status, RequestStatus::Draft);

        let summary = svc.draft_summary(&alice).await.unwrap().unwrap();
        assert_eq!(summary.request_id, first.request.id);
        assert_eq!(summary.item_count, 2);
    }

    #[tokio::test]
    async fn adding_same_particle_twice_conflicts() {
        let svc = service();
        let alice = Actor::creator(ALICE);
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);

        svc.create_draft_with_item(&alice, electron.id)
            .await
            .unwrap();
        let err = svc
            .create_draft_with_item(&alice, electron.id)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));
    }

    #[tokio::test]
    async fn unknown_particle_is_not_found() {
        let svc = service();
        let err = svc
            .create_draft_with_item(&Actor::creator(ALICE), 999)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "Particle", .. });
        assert!(svc.draft_summary(&Actor::creator(ALICE)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_owner_may_edit_draft() {
        let svc = service();
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);
        let draft = svc
            .create_draft_with_item(&Actor::creator(ALICE), electron.id)
            .await
            .unwrap();

        let err = svc
            .set_item_parameter(draft.request.id, &Actor::creator(BOB), electron.id, 1e6)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[tokio::test]
    async fn velocity_must_be_positive_and_finite() {
        let svc = service();
        let alice = Actor::creator(ALICE);
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);
        let draft = svc
            .create_draft_with_item(&alice, electron.id)
            .await
            .unwrap();

        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = svc
                .set_item_parameter(draft.request.id, &alice, electron.id, bad)
                .await
                .unwrap_err();
            assert_matches!(err, CoreError::Validation(_));
        }
    }

    #[tokio::test]
    async fn editing_missing_item_is_not_found() {
        let svc = service();
        let alice = Actor::creator(ALICE);
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);
        let proton = svc.store().insert_particle("proton", 1.67262192e-27);
        let draft = svc
            .create_draft_with_item(&alice, electron.id)
            .await
            .unwrap();

        let err = svc
            .set_item_parameter(draft.request.id, &alice, proton.id, 1e6)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });

        let err = svc
            .remove_item(draft.request.id, &alice, proton.id)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
    }

    #[tokio::test]
    async fn rename_validates_length() {
        let svc = service();
        let alice = Actor::creator(ALICE);
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);
        let draft = svc
            .create_draft_with_item(&alice, electron.id)
            .await
            .unwrap();

        let err = svc.rename(draft.request.id, &alice, "   ").await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));

        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        let err = svc.rename(draft.request.id, &alice, &long).await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));

        let renamed = svc
            .rename(draft.request.id, &alice, "  slow electrons ")
            .await
            .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("slow electrons"));
    }

    #[tokio::test]
    async fn submit_requires_velocity_and_stays_draft() {
        let svc = service();
        let alice = Actor::creator(ALICE);
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);
        let draft = svc
            .create_draft_with_item(&alice, electron.id)
            .await
            .unwrap();
        svc.rename(draft.request.id, &alice, "run").await.unwrap();

        let err = svc.submit(draft.request.id, &alice).await.unwrap_err();
        assert_matches!(err, CoreError::PreconditionFailed(_));

        let after = svc.get(draft.request.id, &alice).await.unwrap();
        assert_eq!(after.request.status, RequestStatus::Draft);
        assert!(after.request.formed_at.is_none());
    }

    #[tokio::test]
    async fn submit_sets_formed_at_and_freezes_items() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;
        let alice = Actor::creator(ALICE);

        assert_eq!(detail.request.status, RequestStatus::Formed);
        assert!(detail.request.formed_at.is_some());
        assert!(svc.draft_summary(&alice).await.unwrap().is_none());

        let particle_id = detail.items[0].particle_id;
        let err = svc
            .set_item_parameter(detail.request.id, &alice, particle_id, 2e6)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::PreconditionFailed(_));
    }

    #[tokio::test]
    async fn approve_computes_electron_wavelength() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;

        let reviewed = svc
            .review(detail.request.id, &Actor::reviewer(REVIEWER), true)
            .await
            .unwrap();

        assert_eq!(reviewed.request.status, RequestStatus::Completed);
        assert_eq!(reviewed.request.reviewer_id, Some(REVIEWER));
        assert!(reviewed.request.completed_at.is_some());
        let lambda = reviewed.items[0].wavelength.unwrap();
        assert!(((lambda - 7.274e-10) / 7.274e-10).abs() < 1e-3, "got {lambda}");
    }

    #[tokio::test]
    async fn creator_cannot_review() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;
        let err = svc
            .review(detail.request.id, &Actor::creator(ALICE), true)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[tokio::test]
    async fn concurrent_approve_and_reject_exactly_one_wins() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;
        let id = detail.request.id;
        let reviewer = Actor::reviewer(REVIEWER);

        let (approve, reject) =
            tokio::join!(svc.review(id, &reviewer, true), svc.review(id, &reviewer, false));

        let outcomes = [approve.is_ok(), reject.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        for result in [approve, reject] {
            if let Err(e) = result {
                assert_matches!(e, CoreError::InvalidTransition { .. });
            }
        }

        let history = svc.history(id, &reviewer).await.unwrap();
        let terminal = history
            .iter()
            .filter(|c| c.to_status.is_terminal())
            .count();
        assert_eq!(terminal, 1);
    }

    #[tokio::test]
    async fn delete_draft_hides_it() {
        let svc = service();
        let alice = Actor::creator(ALICE);
        let electron = svc.store().insert_particle("electron", ELECTRON_MASS);
        let draft = svc
            .create_draft_with_item(&alice, electron.id)
            .await
            .unwrap();

        let deleted = svc.delete(draft.request.id, &alice).await.unwrap();
        assert_eq!(deleted.status, RequestStatus::Deleted);

        let err = svc.get(draft.request.id, &alice).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });

        // Items are kept for audit.
        let items = svc.store().list_items(draft.request.id).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn list_scopes_creators_to_their_own_requests() {
        let svc = service();
        let alice_req = submitted(&svc, ALICE).await;
        let bob_req = submitted(&svc, BOB).await;

        let alice_sees = svc
            .list(RequestFilter::default(), &Actor::creator(ALICE))
            .await
            .unwrap();
        assert_eq!(alice_sees.len(), 1);
        assert_eq!(alice_sees[0].id, alice_req.request.id);

        let reviewer_sees = svc
            .list(RequestFilter::default(), &Actor::reviewer(REVIEWER))
            .await
            .unwrap();
        assert_eq!(reviewer_sees.len(), 2);

        svc.review(bob_req.request.id, &Actor::reviewer(REVIEWER), false)
            .await
            .unwrap();
        let rejected = svc
            .list(
                RequestFilter {
                    status: Some(RequestStatus::Rejected),
                    ..Default::default()
                },
                &Actor::reviewer(REVIEWER),
            )
            .await
            .unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].id, bob_req.request.id);
    }

    #[tokio::test]
    async fn list_rejects_inverted_date_range() {
        let svc = service();
        let now = chrono::Utc::now();
        let err = svc
            .list(
                RequestFilter {
                    formed_from: Some(now),
                    formed_to: Some(now - chrono::Duration::days(1)),
                    ..Default::default()
                },
                &Actor::reviewer(REVIEWER),
            )
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[tokio::test]
    async fn other_creator_cannot_read_request() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;
        let err = svc
            .get(detail.request.id, &Actor::creator(BOB))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[tokio::test]
    async fn callback_with_wrong_secret_changes_nothing() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;

        let err = svc
            .report_item_result(detail.items[0].id, ItemResult::Wavelength(1e-10), "nope")
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Unauthorized(_));

        let after = svc.get(detail.request.id, &Actor::creator(ALICE)).await.unwrap();
        assert_eq!(after, detail);
    }

    #[tokio::test]
    async fn callback_completes_request_with_system_reviewer() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;

        let outcome = svc
            .report_item_result(detail.items[0].id, ItemResult::Wavelength(7.27e-10), SECRET)
            .await
            .unwrap();

        assert!(outcome.transitioned);
        assert_eq!(outcome.request.status, RequestStatus::Completed);
        assert_eq!(outcome.request.reviewer_id, Some(SYSTEM));
        assert_eq!(outcome.item.wavelength, Some(7.27e-10));
    }

    #[tokio::test]
    async fn callback_rejection_twice_is_a_noop() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;
        let item_id = detail.items[0].id;

        let first = svc
            .report_item_result(item_id, ItemResult::Rejected, SECRET)
            .await
            .unwrap();
        let second = svc
            .report_item_result(item_id, ItemResult::Rejected, SECRET)
            .await
            .unwrap();

        assert_eq!(first.request.status, RequestStatus::Rejected);
        assert!(!second.transitioned);
        assert_eq!(second.request, first.request);
    }

    #[tokio::test]
    async fn record_item_result_requires_reviewer() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;
        let err = svc
            .record_item_result(
                detail.items[0].id,
                &Actor::creator(ALICE),
                ItemResult::Wavelength(1e-10),
            )
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));

        let outcome = svc
            .record_item_result(
                detail.items[0].id,
                &Actor::reviewer(REVIEWER),
                ItemResult::Wavelength(1e-10),
            )
            .await
            .unwrap();
        assert_eq!(outcome.request.reviewer_id, Some(REVIEWER));
    }

    #[tokio::test]
    async fn history_records_only_table_transitions() {
        let svc = service();
        let detail = submitted(&svc, ALICE).await;
        svc.review(detail.request.id, &Actor::reviewer(REVIEWER), true)
            .await
            .unwrap();

        let history = svc
            .history(detail.request.id, &Actor::creator(ALICE))
            .await
            .unwrap();
        let steps: Vec<_> = history.iter().map(|c| (c.from_status, c.to_status)).collect();
        assert_eq!(
            steps,
            vec![
                (None, RequestStatus::Draft),
                (Some(RequestStatus::Draft), RequestStatus::Formed),
                (Some(RequestStatus::Formed), RequestStatus::Completed),
            ]
        );
    }

    #[test]
    fn approval_refuses_items_without_velocity() {
        let item = |id: DbId, velocity: Option<f64>| CalculationItem {
            id,
            request_id: 10,
            particle_id: id,
            particle_name: format!("particle-{id}"),
            particle_mass: ELECTRON_MASS,
            particle_image: None,
            velocity,
            wavelength: None,
        };

        let results = computed_results(&[item(1, Some(1e6))]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item_id, 1);
        assert!(results[0].wavelength > 0.0);

        let err = computed_results(&[item(1, Some(1e6)), item(2, None)]).unwrap_err();
        assert_matches!(err, CoreError::PreconditionFailed(msg) if msg.contains("particle-2"));
    }
}
