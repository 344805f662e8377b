//! In-memory store for unit and integration tests.
//!
//! Holds all state behind one mutex, so every trait method is trivially
//! atomic. The lock is never held across an `.await`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::calculation_status::RequestStatus;
use crate::error::CoreError;
use crate::types::DbId;
use crate::workflow::model::{
    CalculationItem, CalculationRequest, ItemProgress, Particle, RequestFilter, StatusChange,
    StatusUpdate,
};
use crate::workflow::store::{ItemStore, ParticleCatalog, RequestStore};
use crate::workflow::transition::check_ready_to_form;

#[derive(Default)]
struct State {
    next_id: DbId,
    requests: BTreeMap<DbId, CalculationRequest>,
    items: BTreeMap<DbId, CalculationItem>,
    particles: BTreeMap<DbId, Particle>,
    history: Vec<StatusChange>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn is_draft(&self, request_id: DbId) -> bool {
        self.requests
            .get(&request_id)
            .is_some_and(|r| r.status == RequestStatus::Draft)
    }

    fn is_ready_to_form(&self, request_id: DbId) -> bool {
        let Some(request) = self.requests.get(&request_id) else {
            return false;
        };
        let items: Vec<CalculationItem> = self
            .items
            .values()
            .filter(|i| i.request_id == request_id)
            .cloned()
            .collect();
        check_ready_to_form(request, &items).is_ok()
    }

    fn record_change(
        &mut self,
        request_id: DbId,
        from: Option<RequestStatus>,
        to: RequestStatus,
        actor_id: DbId,
    ) {
        let id = self.next_id();
        self.history.push(StatusChange {
            id,
            request_id,
            from_status: from,
            to_status: to,
            actor_id,
            changed_at: Utc::now(),
        });
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a particle into the catalog.
    pub fn insert_particle(&self, name: &str, mass: f64) -> Particle {
        let mut state = self.state.lock().expect("memory store lock poisoned");
        let particle = Particle {
            id: state.next_id(),
            name: name.to_string(),
            mass,
            image: None,
            description: None,
        };
        state.particles.insert(particle.id, particle.clone());
        particle
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CoreError> {
        self.state
            .lock()
            .map_err(|_| CoreError::Internal("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn find_request(&self, id: DbId) -> Result<Option<CalculationRequest>, CoreError> {
        let state = self.lock()?;
        Ok(state
            .requests
            .get(&id)
            .filter(|r| r.status != RequestStatus::Deleted)
            .cloned())
    }

    async fn find_draft(&self, owner_id: DbId) -> Result<Option<CalculationRequest>, CoreError> {
        let state = self.lock()?;
        Ok(state
            .requests
            .values()
            .find(|r| r.owner_id == owner_id && r.status == RequestStatus::Draft)
            .cloned())
    }

    async fn create_draft(
        &self,
        owner_id: DbId,
        name: Option<&str>,
    ) -> Result<CalculationRequest, CoreError> {
        let mut state = self.lock()?;
        let exists = state
            .requests
            .values()
            .any(|r| r.owner_id == owner_id && r.status == RequestStatus::Draft);
        if exists {
            return Err(CoreError::Conflict(format!(
                "User {owner_id} already has a draft request"
            )));
        }

        let request = CalculationRequest {
            id: state.next_id(),
            name: name.map(str::to_string),
            status: RequestStatus::Draft,
            owner_id,
            reviewer_id: None,
            created_at: Utc::now(),
            formed_at: None,
            completed_at: None,
        };
        state.requests.insert(request.id, request.clone());
        state.record_change(request.id, None, RequestStatus::Draft, owner_id);
        Ok(request)
    }

    async fn rename_draft(
        &self,
        id: DbId,
        name: &str,
    ) -> Result<Option<CalculationRequest>, CoreError> {
        let mut state = self.lock()?;
        Ok(state
            .requests
            .get_mut(&id)
            .filter(|r| r.status == RequestStatus::Draft)
            .map(|r| {
                r.name = Some(name.to_string());
                r.clone()
            }))
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<CalculationRequest>, CoreError> {
        let state = self.lock()?;
        let mut found: Vec<CalculationRequest> = state
            .requests
            .values()
            .filter(|r| !matches!(r.status, RequestStatus::Draft | RequestStatus::Deleted))
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.owner_id.map_or(true, |o| r.owner_id == o))
            .filter(|r| {
                filter
                    .formed_from
                    .map_or(true, |from| r.formed_at.is_some_and(|f| f >= from))
            })
            .filter(|r| {
                filter
                    .formed_to
                    .map_or(true, |to| r.formed_at.is_some_and(|f| f <= to))
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(found)
    }

    async fn apply_transition(
        &self,
        update: &StatusUpdate,
    ) -> Result<Option<CalculationRequest>, CoreError> {
        let mut state = self.lock()?;
        let current = match state.requests.get(&update.request_id) {
            Some(r) if r.status == update.expected => r.status,
            _ => return Ok(None),
        };

        if update.requires_ready_items() && !state.is_ready_to_form(update.request_id) {
            return Ok(None);
        }

        for result in &update.item_results {
            if let Some(item) = state
                .items
                .get_mut(&result.item_id)
                .filter(|i| i.request_id == update.request_id)
            {
                item.wavelength = Some(result.wavelength);
            }
        }

        let updated = {
            let Some(request) = state.requests.get_mut(&update.request_id) else {
                return Ok(None);
            };
            request.status = update.target;
            if request.formed_at.is_none() {
                request.formed_at = update.formed_at;
            }
            if request.completed_at.is_none() {
                request.completed_at = update.completed_at;
            }
            if update.reviewer_id.is_some() {
                request.reviewer_id = update.reviewer_id;
            }
            request.clone()
        };

        state.record_change(
            update.request_id,
            Some(current),
            update.target,
            update.actor_id,
        );
        Ok(Some(updated))
    }

    async fn status_history(&self, request_id: DbId) -> Result<Vec<StatusChange>, CoreError> {
        let state = self.lock()?;
        Ok(state
            .history
            .iter()
            .filter(|c| c.request_id == request_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn find_item(&self, id: DbId) -> Result<Option<CalculationItem>, CoreError> {
        let state = self.lock()?;
        Ok(state.items.get(&id).cloned())
    }

    async fn list_items(&self, request_id: DbId) -> Result<Vec<CalculationItem>, CoreError> {
        let state = self.lock()?;
        Ok(state
            .items
            .values()
            .filter(|i| i.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn add_item(
        &self,
        request_id: DbId,
        particle_id: DbId,
    ) -> Result<Option<CalculationItem>, CoreError> {
        let mut state = self.lock()?;
        if !state.is_draft(request_id) {
            return Ok(None);
        }
        let particle = state
            .particles
            .get(&particle_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "Particle",
                id: particle_id,
            })?;
        let duplicate = state
            .items
            .values()
            .any(|i| i.request_id == request_id && i.particle_id == particle_id);
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "Particle {particle_id} is already in request {request_id}"
            )));
        }

        let item = CalculationItem {
            id: state.next_id(),
            request_id,
            particle_id,
            particle_name: particle.name,
            particle_mass: particle.mass,
            particle_image: particle.image,
            velocity: None,
            wavelength: None,
        };
        state.items.insert(item.id, item.clone());
        Ok(Some(item))
    }

    async fn remove_item(&self, request_id: DbId, particle_id: DbId) -> Result<bool, CoreError> {
        let mut state = self.lock()?;
        if !state.is_draft(request_id) {
            return Ok(false);
        }
        let found = state
            .items
            .values()
            .find(|i| i.request_id == request_id && i.particle_id == particle_id)
            .map(|i| i.id);
        Ok(found.and_then(|id| state.items.remove(&id)).is_some())
    }

    async fn set_velocity(
        &self,
        request_id: DbId,
        particle_id: DbId,
        velocity: f64,
    ) -> Result<Option<CalculationItem>, CoreError> {
        let mut state = self.lock()?;
        if !state.is_draft(request_id) {
            return Ok(None);
        }
        Ok(state
            .items
            .values_mut()
            .find(|i| i.request_id == request_id && i.particle_id == particle_id)
            .map(|i| {
                i.velocity = Some(velocity);
                i.clone()
            }))
    }

    async fn record_result(
        &self,
        item_id: DbId,
        wavelength: f64,
    ) -> Result<Option<CalculationItem>, CoreError> {
        let mut state = self.lock()?;
        let Some(request_id) = state.items.get(&item_id).map(|i| i.request_id) else {
            return Ok(None);
        };
        let formed = state
            .requests
            .get(&request_id)
            .is_some_and(|r| r.status == RequestStatus::Formed);
        if !formed {
            return Ok(None);
        }
        Ok(state.items.get_mut(&item_id).map(|i| {
            i.wavelength = Some(wavelength);
            i.clone()
        }))
    }

    async fn item_progress(&self, request_id: DbId) -> Result<ItemProgress, CoreError> {
        let state = self.lock()?;
        let items: Vec<&CalculationItem> = state
            .items
            .values()
            .filter(|i| i.request_id == request_id)
            .collect();
        Ok(ItemProgress {
            total: items.len() as i64,
            computed: items.iter().filter(|i| i.has_result()).count() as i64,
        })
    }
}

#[async_trait]
impl ParticleCatalog for MemoryStore {
    async fn find_particle(&self, id: DbId) -> Result<Option<Particle>, CoreError> {
        let state = self.lock()?;
        Ok(state.particles.get(&id).cloned())
    }
}
