//! Applies request status transitions.
//!
//! [`plan_transition`] is the pure part: authorization, the transition
//! table, the submit preconditions and the side-effect fields.
//! [`TransitionEngine`] loads state, plans, and commits the plan through a
//! conditional store write so concurrent transitions are linearized.

use chrono::Utc;

use crate::calculation_status::{
    required_role, validate_transition, RequestStatus, TransitionRole,
};
use crate::error::CoreError;
use crate::roles::Actor;
use crate::types::{DbId, Timestamp};
use crate::workflow::model::{CalculationItem, CalculationRequest, ComputedResult, StatusUpdate};
use crate::workflow::store::{ItemStore, RequestStore};

/// Check role, table and preconditions, and compute the guarded write.
///
/// `items` is only consulted for `draft -> formed`.
pub fn plan_transition(
    request: &CalculationRequest,
    target: RequestStatus,
    actor: &Actor,
    items: &[CalculationItem],
    now: Timestamp,
) -> Result<StatusUpdate, CoreError> {
    match required_role(target) {
        TransitionRole::Owner if actor.user_id != request.owner_id => {
            return Err(CoreError::Forbidden(format!(
                "Only the owner may move request {} to '{target}'",
                request.id
            )));
        }
        TransitionRole::Reviewer if !actor.is_reviewer => {
            return Err(CoreError::Forbidden(format!(
                "Reviewer role required to move request {} to '{target}'",
                request.id
            )));
        }
        _ => {}
    }

    validate_transition(request.status, target)?;

    if target == RequestStatus::Formed {
        check_ready_to_form(request, items)?;
    }

    let mut update = StatusUpdate {
        request_id: request.id,
        expected: request.status,
        target,
        actor_id: actor.user_id,
        formed_at: None,
        completed_at: None,
        reviewer_id: None,
        item_results: Vec::new(),
    };

    match target {
        RequestStatus::Formed => update.formed_at = Some(now),
        RequestStatus::Completed | RequestStatus::Rejected => {
            update.completed_at = Some(now);
            update.reviewer_id = Some(actor.user_id);
        }
        RequestStatus::Draft | RequestStatus::Deleted => {}
    }

    Ok(update)
}

/// Preconditions for submitting a draft.
pub(crate) fn check_ready_to_form(
    request: &CalculationRequest,
    items: &[CalculationItem],
) -> Result<(), CoreError> {
    let has_name = request
        .name
        .as_deref()
        .is_some_and(|name| !name.trim().is_empty());
    if !has_name {
        return Err(CoreError::PreconditionFailed(
            "Request must have a name before it is submitted".into(),
        ));
    }

    if items.is_empty() {
        return Err(CoreError::PreconditionFailed(
            "Request has no items".into(),
        ));
    }

    if let Some(item) = items.iter().find(|item| item.velocity.is_none()) {
        return Err(CoreError::PreconditionFailed(format!(
            "Item for particle '{}' has no velocity set",
            item.particle_name
        )));
    }

    Ok(())
}

/// Loads, validates and commits status transitions.
pub struct TransitionEngine<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> TransitionEngine<'a, S>
where
    S: RequestStore + ItemStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Move a request to `target` on behalf of `actor`.
    pub async fn transition(
        &self,
        request_id: DbId,
        target: RequestStatus,
        actor: &Actor,
    ) -> Result<CalculationRequest, CoreError> {
        self.transition_with_results(request_id, target, actor, Vec::new())
            .await
    }

    /// Like [`TransitionEngine::transition`], also writing `item_results`
    /// in the same store transaction.
    pub async fn transition_with_results(
        &self,
        request_id: DbId,
        target: RequestStatus,
        actor: &Actor,
        item_results: Vec<ComputedResult>,
    ) -> Result<CalculationRequest, CoreError> {
        let request = self
            .store
            .find_request(request_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "CalculationRequest",
                id: request_id,
            })?;

        let items = if request.status == RequestStatus::Draft && target == RequestStatus::Formed
        {
            self.store.list_items(request_id).await?
        } else {
            Vec::new()
        };

        let mut update = plan_transition(&request, target, actor, &items, Utc::now())?;
        update.item_results = item_results;

        self.commit(&update).await
    }

    async fn commit(&self, update: &StatusUpdate) -> Result<CalculationRequest, CoreError> {
        if let Some(updated) = self.store.apply_transition(update).await? {
            tracing::info!(
                request_id = update.request_id,
                actor_id = update.actor_id,
                from = %update.expected,
                to = %update.target,
                "Calculation request status changed"
            );
            return Ok(updated);
        }

        // Someone else moved or edited the request between our read and our write.
        let current = self.store.find_request(update.request_id).await?;

        if let Some(request) = current
            .as_ref()
            .filter(|r| update.requires_ready_items() && r.status == update.expected)
        {
            let items = self.store.list_items(update.request_id).await?;
            tracing::warn!(
                request_id = update.request_id,
                items = items.len(),
                "Request items changed during submit"
            );
            check_ready_to_form(request, &items)?;
            return Err(CoreError::PreconditionFailed(
                "Request items changed while it was being submitted".into(),
            ));
        }

        let observed = current.map_or(RequestStatus::Deleted, |r| r.status);

        tracing::warn!(
            request_id = update.request_id,
            expected = %update.expected,
            observed = %observed,
            target = %update.target,
            "Lost status transition race"
        );

        Err(CoreError::InvalidTransition {
            from: observed.as_str(),
            to: update.target.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::workflow::memory::MemoryStore;

    fn request(status: RequestStatus, name: Option<&str>) -> CalculationRequest {
        CalculationRequest {
            id: 10,
            name: name.map(str::to_string),
            status,
            owner_id: 1,
            reviewer_id: None,
            created_at: Utc::now(),
            formed_at: None,
            completed_at: None,
        }
    }

    fn item(velocity: Option<f64>) -> CalculationItem {
        CalculationItem {
            id: 100,
            request_id: 10,
            particle_id: 5,
            particle_name: "electron".into(),
            particle_mass: 9.109384e-31,
            particle_image: None,
            velocity,
            wavelength: None,
        }
    }

    #[test]
    fn submit_sets_formed_at_only() {
        let now = Utc::now();
        let update = plan_transition(
            &request(RequestStatus::Draft, Some("run 1")),
            RequestStatus::Formed,
            &Actor::creator(1),
            &[item(Some(1e6))],
            now,
        )
        .unwrap();

        assert_eq!(update.expected, RequestStatus::Draft);
        assert_eq!(update.formed_at, Some(now));
        assert_eq!(update.completed_at, None);
        assert_eq!(update.reviewer_id, None);
    }

    #[test]
    fn review_sets_completed_at_and_reviewer() {
        let now = Utc::now();
        let update = plan_transition(
            &request(RequestStatus::Formed, Some("run 1")),
            RequestStatus::Rejected,
            &Actor::reviewer(9),
            &[],
            now,
        )
        .unwrap();

        assert_eq!(update.completed_at, Some(now));
        assert_eq!(update.reviewer_id, Some(9));
        assert_eq!(update.formed_at, None);
    }

    #[test]
    fn non_owner_cannot_submit() {
        let err = plan_transition(
            &request(RequestStatus::Draft, Some("run 1")),
            RequestStatus::Formed,
            &Actor::creator(2),
            &[item(Some(1e6))],
            Utc::now(),
        )
        .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[test]
    fn creator_cannot_approve() {
        let err = plan_transition(
            &request(RequestStatus::Formed, Some("run 1")),
            RequestStatus::Completed,
            &Actor::creator(1),
            &[],
            Utc::now(),
        )
        .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[test]
    fn forbidden_is_reported_before_invalid_transition() {
        let err = plan_transition(
            &request(RequestStatus::Completed, Some("run 1")),
            RequestStatus::Deleted,
            &Actor::creator(2),
            &[],
            Utc::now(),
        )
        .unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[test]
    fn approving_a_draft_is_invalid() {
        let err = plan_transition(
            &request(RequestStatus::Draft, Some("run 1")),
            RequestStatus::Completed,
            &Actor::reviewer(9),
            &[],
            Utc::now(),
        )
        .unwrap_err();
        assert_matches!(
            err,
            CoreError::InvalidTransition {
                from: "draft",
                to: "completed"
            }
        );
    }

    #[test]
    fn submit_preconditions() {
        let actor = Actor::creator(1);
        let now = Utc::now();

        let unnamed = plan_transition(
            &request(RequestStatus::Draft, None),
            RequestStatus::Formed,
            &actor,
            &[item(Some(1e6))],
            now,
        );
        assert_matches!(unnamed, Err(CoreError::PreconditionFailed(msg)) if msg.contains("name"));

        let blank = plan_transition(
            &request(RequestStatus::Draft, Some("   ")),
            RequestStatus::Formed,
            &actor,
            &[item(Some(1e6))],
            now,
        );
        assert_matches!(blank, Err(CoreError::PreconditionFailed(_)));

        let empty = plan_transition(
            &request(RequestStatus::Draft, Some("run 1")),
            RequestStatus::Formed,
            &actor,
            &[],
            now,
        );
        assert_matches!(empty, Err(CoreError::PreconditionFailed(msg)) if msg.contains("no items"));

        let missing_velocity = plan_transition(
            &request(RequestStatus::Draft, Some("run 1")),
            RequestStatus::Formed,
            &actor,
            &[item(Some(1e6)), item(None)],
            now,
        );
        assert_matches!(
            missing_velocity,
            Err(CoreError::PreconditionFailed(msg)) if msg.contains("electron")
        );
    }

    async fn draft_with_electron(store: &MemoryStore) -> (CalculationRequest, DbId) {
        let electron = store.insert_particle("electron", 9.109384e-31);
        let draft = store.create_draft(1, Some("run 1")).await.unwrap();
        store.add_item(draft.id, electron.id).await.unwrap();
        store.set_velocity(draft.id, electron.id, 1e6).await.unwrap();
        (draft, electron.id)
    }

    #[tokio::test]
    async fn submit_fails_when_last_item_is_removed_before_the_write() {
        let store = MemoryStore::new();
        let (draft, electron) = draft_with_electron(&store).await;

        let items = store.list_items(draft.id).await.unwrap();
        let update = plan_transition(
            &draft,
            RequestStatus::Formed,
            &Actor::creator(1),
            &items,
            Utc::now(),
        )
        .unwrap();

        // A concurrent edit lands between the read and the guarded write.
        assert!(store.remove_item(draft.id, electron).await.unwrap());

        let err = TransitionEngine::new(&store).commit(&update).await.unwrap_err();
        assert_matches!(err, CoreError::PreconditionFailed(msg) if msg.contains("no items"));

        let reloaded = store.find_request(draft.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, RequestStatus::Draft);
        assert_eq!(reloaded.formed_at, None);
        let history = store.status_history(draft.id).await.unwrap();
        assert!(history.iter().all(|c| c.to_status != RequestStatus::Formed));
    }

    #[tokio::test]
    async fn submit_fails_when_an_item_without_velocity_is_added_before_the_write() {
        let store = MemoryStore::new();
        let (draft, _) = draft_with_electron(&store).await;
        let proton = store.insert_particle("proton", 1.672621e-27);

        let items = store.list_items(draft.id).await.unwrap();
        let update = plan_transition(
            &draft,
            RequestStatus::Formed,
            &Actor::creator(1),
            &items,
            Utc::now(),
        )
        .unwrap();

        store.add_item(draft.id, proton.id).await.unwrap();

        let err = TransitionEngine::new(&store).commit(&update).await.unwrap_err();
        assert_matches!(err, CoreError::PreconditionFailed(msg) if msg.contains("proton"));
        let reloaded = store.find_request(draft.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, RequestStatus::Draft);
    }

    #[tokio::test]
    async fn submit_of_a_ready_draft_still_commits() {
        let store = MemoryStore::new();
        let (draft, _) = draft_with_electron(&store).await;

        let formed = TransitionEngine::new(&store)
            .transition(draft.id, RequestStatus::Formed, &Actor::creator(1))
            .await
            .unwrap();
        assert_eq!(formed.status, RequestStatus::Formed);
        assert!(formed.formed_at.is_some());
    }

    #[test]
    fn owner_can_delete_draft_without_side_effects() {
        let update = plan_transition(
            &request(RequestStatus::Draft, None),
            RequestStatus::Deleted,
            &Actor::creator(1),
            &[],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(update.formed_at, None);
        assert_eq!(update.completed_at, None);
        assert_eq!(update.reviewer_id, None);
    }
}
