//! Per-item result protocol.
//!
//! Results arrive one item at a time, possibly duplicated and out of order.
//! After every accepted value the aggregator re-checks whether all items of
//! the request have results and, if so, completes the request. The check is
//! idempotent: whichever writer observes completion first wins the
//! conditional transition and the others become no-ops.

use serde::Serialize;

use crate::calculation_status::RequestStatus;
use crate::error::CoreError;
use crate::roles::Actor;
use crate::types::DbId;
use crate::workflow::model::{CalculationItem, CalculationRequest, ItemResult};
use crate::workflow::store::{ItemStore, RequestStore};
use crate::workflow::transition::TransitionEngine;

/// Result of applying one item result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateOutcome {
    pub item: CalculationItem,
    pub request: CalculationRequest,
    /// True when this call moved the request to a new status.
    pub transitioned: bool,
}

pub struct ComputationAggregator<'a, S: ?Sized> {
    store: &'a S,
    system_reviewer_id: DbId,
}

impl<'a, S> ComputationAggregator<'a, S>
where
    S: RequestStore + ItemStore + ?Sized,
{
    pub fn new(store: &'a S, system_reviewer_id: DbId) -> Self {
        Self {
            store,
            system_reviewer_id,
        }
    }

    /// Apply a result to one item and re-evaluate the owning request.
    ///
    /// `reviewer` is the identity recorded on an automatic transition; the
    /// system reviewer is used when it is `None`.
    pub async fn set_item_result(
        &self,
        item_id: DbId,
        result: ItemResult,
        reviewer: Option<DbId>,
    ) -> Result<AggregateOutcome, CoreError> {
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "CalculationItem",
                id: item_id,
            })?;
        let request = self.load_request(item.request_id).await?;
        let actor = Actor::reviewer(reviewer.unwrap_or(self.system_reviewer_id));

        match result {
            ItemResult::Rejected => self.reject(item, request, &actor).await,
            ItemResult::Wavelength(value) => self.accept(item, request, value, &actor).await,
        }
    }

    async fn reject(
        &self,
        item: CalculationItem,
        request: CalculationRequest,
        actor: &Actor,
    ) -> Result<AggregateOutcome, CoreError> {
        if request.status != RequestStatus::Formed {
            tracing::debug!(
                item_id = item.id,
                request_id = request.id,
                status = %request.status,
                "Ignoring rejection for request that already left formed"
            );
            return Ok(AggregateOutcome {
                item,
                request,
                transitioned: false,
            });
        }

        let engine = TransitionEngine::new(self.store);
        match engine
            .transition(request.id, RequestStatus::Rejected, actor)
            .await
        {
            Ok(rejected) => {
                tracing::info!(
                    item_id = item.id,
                    request_id = rejected.id,
                    reviewer_id = actor.user_id,
                    "Calculation request rejected by computation result"
                );
                Ok(AggregateOutcome {
                    item,
                    request: rejected,
                    transitioned: true,
                })
            }
            Err(CoreError::InvalidTransition { .. }) => {
                let request = self.load_request(request.id).await?;
                Ok(AggregateOutcome {
                    item,
                    request,
                    transitioned: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn accept(
        &self,
        item: CalculationItem,
        request: CalculationRequest,
        value: f64,
        actor: &Actor,
    ) -> Result<AggregateOutcome, CoreError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CoreError::Validation(format!(
                "Wavelength must be a finite non-negative number, got {value}"
            )));
        }

        if request.status != RequestStatus::Formed {
            return self.settled(item, request, value);
        }

        let item = match self.store.record_result(item.id, value).await? {
            Some(item) => item,
            // The request left formed between our read and the guarded write.
            None => {
                let request = self.load_request(request.id).await?;
                let item = self.reload_item(item.id).await?;
                return self.settled(item, request, value);
            }
        };

        tracing::debug!(
            item_id = item.id,
            request_id = request.id,
            wavelength = value,
            "Calculation item result recorded"
        );

        let progress = self.store.item_progress(request.id).await?;
        if !progress.is_complete() {
            return Ok(AggregateOutcome {
                item,
                request,
                transitioned: false,
            });
        }

        let engine = TransitionEngine::new(self.store);
        match engine
            .transition(request.id, RequestStatus::Completed, actor)
            .await
        {
            Ok(completed) => {
                tracing::info!(
                    request_id = completed.id,
                    items = progress.total,
                    reviewer_id = actor.user_id,
                    "Calculation request completed after all results arrived"
                );
                Ok(AggregateOutcome {
                    item,
                    request: completed,
                    transitioned: true,
                })
            }
            Err(CoreError::InvalidTransition { .. }) => {
                let request = self.load_request(request.id).await?;
                Ok(AggregateOutcome {
                    item,
                    request,
                    transitioned: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// A value for a request that is no longer formed: a duplicate of the
    /// stored value is accepted as a no-op, anything else is refused.
    fn settled(
        &self,
        item: CalculationItem,
        request: CalculationRequest,
        value: f64,
    ) -> Result<AggregateOutcome, CoreError> {
        if item.wavelength == Some(value) {
            return Ok(AggregateOutcome {
                item,
                request,
                transitioned: false,
            });
        }
        Err(CoreError::PreconditionFailed(format!(
            "Request {} is '{}'; results are only accepted while formed",
            request.id, request.status
        )))
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

    async fn reload_item(&self, item_id: DbId) -> Result<CalculationItem, CoreError> {
        self.store
            .find_item(item_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "CalculationItem",
                id: item_id,
            })
    }
}
