//! Repository for `calculation_requests` and its status-change log.
//!
//! Every status write is conditional on the expected current status and
//! writes its audit row in the same transaction.

use debroglie_core::calculation_status::{RequestStatus, StatusId};
use debroglie_core::types::DbId;
use debroglie_core::workflow::model::StatusUpdate;
use sqlx::{PgConnection, PgPool};

use crate::models::calculation_request::{CalculationRequest, RequestListParams};
use crate::models::status_change::StatusChange;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, status_id, owner_id, reviewer_id, created_at, \
                       formed_at, completed_at, updated_at";

const HISTORY_COLUMNS: &str = "id, request_id, from_status_id, to_status_id, actor_id, changed_at";

pub struct CalculationRequestRepo;

impl CalculationRequestRepo {
    /// Find a request by ID. Deleted requests are excluded.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CalculationRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM calculation_requests WHERE id = $1 AND status_id <> $2"
        );
        sqlx::query_as::<_, CalculationRequest>(&query)
            .bind(id)
            .bind(RequestStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Find the owner's draft, if any.
    pub async fn find_draft(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Option<CalculationRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM calculation_requests WHERE owner_id = $1 AND status_id = $2"
        );
        sqlx::query_as::<_, CalculationRequest>(&query)
            .bind(owner_id)
            .bind(RequestStatus::Draft.id())
            .fetch_optional(pool)
            .await
    }

    /// Insert a draft and its creation record.
    ///
    /// A second draft for the same owner violates
    /// `uq_calculation_requests_owner_draft`.
    pub async fn create_draft(
        pool: &PgPool,
        owner_id: DbId,
        name: Option<&str>,
    ) -> Result<CalculationRequest, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO calculation_requests (name, status_id, owner_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, CalculationRequest>(&query)
            .bind(name)
            .bind(RequestStatus::Draft.id())
            .bind(owner_id)
            .fetch_one(&mut *tx)
            .await?;

        insert_status_change(&mut tx, request.id, None, RequestStatus::Draft.id(), owner_id)
            .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Rename a request while it is still a draft.
    pub async fn rename_draft(
        pool: &PgPool,
        id: DbId,
        name: &str,
    ) -> Result<Option<CalculationRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE calculation_requests SET name = $2
             WHERE id = $1 AND status_id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CalculationRequest>(&query)
            .bind(id)
            .bind(name)
            .bind(RequestStatus::Draft.id())
            .fetch_optional(pool)
            .await
    }

    /// List submitted requests, newest first. Drafts and deleted requests
    /// are never included.
    pub async fn list(
        pool: &PgPool,
        params: &RequestListParams,
    ) -> Result<Vec<CalculationRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM calculation_requests
             WHERE status_id NOT IN ($1, $2)
               AND ($3::smallint IS NULL OR status_id = $3)
               AND ($4::bigint IS NULL OR owner_id = $4)
               AND ($5::timestamptz IS NULL OR formed_at >= $5)
               AND ($6::timestamptz IS NULL OR formed_at <= $6)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, CalculationRequest>(&query)
            .bind(RequestStatus::Draft.id())
            .bind(RequestStatus::Deleted.id())
            .bind(params.status_id)
            .bind(params.owner_id)
            .bind(params.formed_from)
            .bind(params.formed_to)
            .fetch_all(pool)
            .await
    }

    /// Apply a guarded status transition.
    ///
    /// Runs in one transaction: the conditional status update, any item
    /// results carried by the update, and the audit row. Returns `None` and
    /// writes nothing when the request is no longer in `update.expected`.
    ///
    /// A submit additionally takes the request row lock first, which waits
    /// out in-flight item writes, and re-checks the name and items under it.
    /// Returns `None` if they no longer pass.
    pub async fn apply_transition(
        pool: &PgPool,
        update: &StatusUpdate,
    ) -> Result<Option<CalculationRequest>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if update.requires_ready_items() && !ready_to_form(&mut tx, update).await? {
            return Ok(None);
        }

        let query = format!(
            "UPDATE calculation_requests SET
                status_id = $3,
                formed_at = COALESCE(formed_at, $4),
                completed_at = COALESCE(completed_at, $5),
                reviewer_id = COALESCE($6, reviewer_id)
             WHERE id = $1 AND status_id = $2
             RETURNING {COLUMNS}"
        );
        let Some(request) = sqlx::query_as::<_, CalculationRequest>(&query)
            .bind(update.request_id)
            .bind(update.expected.id())
            .bind(update.target.id())
            .bind(update.formed_at)
            .bind(update.completed_at)
            .bind(update.reviewer_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if !update.item_results.is_empty() {
            let (item_ids, wavelengths): (Vec<DbId>, Vec<f64>) = update
                .item_results
                .iter()
                .map(|r| (r.item_id, r.wavelength))
                .unzip();
            sqlx::query(
                "UPDATE calculation_items AS ci SET wavelength = r.wavelength
                 FROM UNNEST($2::bigint[], $3::float8[]) AS r(item_id, wavelength)
                 WHERE ci.id = r.item_id AND ci.request_id = $1",
            )
            .bind(update.request_id)
            .bind(&item_ids)
            .bind(&wavelengths)
            .execute(&mut *tx)
            .await?;
        }

        insert_status_change(
            &mut tx,
            update.request_id,
            Some(update.expected.id()),
            update.target.id(),
            update.actor_id,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(request))
    }

    /// Status-change history of a request, oldest first.
    pub async fn list_status_changes(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<StatusChange>, sqlx::Error> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM calculation_request_status_changes
             WHERE request_id = $1
             ORDER BY changed_at ASC, id ASC"
        );
        sqlx::query_as::<_, StatusChange>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    /// Read a request's status under a share lock.
    ///
    /// Held until the surrounding transaction ends, so a concurrent status
    /// transition waits for the caller's item write to commit.
    pub(crate) async fn lock_status(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar::<_, StatusId>(
            "SELECT status_id FROM calculation_requests WHERE id = $1 FOR SHARE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }
}

/// Lock a draft for submit and check its name and items.
///
/// Item writers hold `FOR SHARE` on the request, so the `FOR UPDATE` here
/// returns only after they commit. The item query runs as a separate
/// statement and therefore sees their writes.
async fn ready_to_form(
    conn: &mut PgConnection,
    update: &StatusUpdate,
) -> Result<bool, sqlx::Error> {
    let named: Option<bool> = sqlx::query_scalar(
        "SELECT COALESCE(BTRIM(name), '') <> '' FROM calculation_requests
         WHERE id = $1 AND status_id = $2
         FOR UPDATE",
    )
    .bind(update.request_id)
    .bind(update.expected.id())
    .fetch_optional(&mut *conn)
    .await?;
    if named != Some(true) {
        return Ok(false);
    }

    let (total, missing_velocity): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE velocity IS NULL)
         FROM calculation_items WHERE request_id = $1",
    )
    .bind(update.request_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total > 0 && missing_velocity == 0)
}

async fn insert_status_change(
    conn: &mut PgConnection,
    request_id: DbId,
    from_status_id: Option<StatusId>,
    to_status_id: StatusId,
    actor_id: DbId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO calculation_request_status_changes
            (request_id, from_status_id, to_status_id, actor_id)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(request_id)
    .bind(from_status_id)
    .bind(to_status_id)
    .bind(actor_id)
    .execute(conn)
    .await?;
    Ok(())
}
