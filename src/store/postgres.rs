// PostgreSQL store. Composite mutations (membership writes, promotion) run
// in a transaction with the tenant row locked, mirroring the per-tenant
// serialization the services already impose in-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    DomainApprovalStatus, GlobalRole, MaturityState, Membership, RequestStatus, RoleRequest,
    Tenant, TenantSettings, ThresholdUpdate,
};

use super::{DomainApprovalStore, MembershipStore, RoleRequestStore, StoreError, TenantStore};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn tenant_from_row(row: &PgRow) -> Result<Tenant, StoreError> {
    let maturity: String = row.try_get("maturity")?;
    let auth_method: String = row.try_get("auth_method")?;
    Ok(Tenant {
        id: row.try_get("id")?,
        domain: row.try_get("domain")?,
        maturity: maturity.parse().map_err(StoreError::Corrupt)?,
        age_days_threshold: row.try_get("age_days_threshold")?,
        user_threshold: row.try_get("user_threshold")?,
        admin_threshold: row.try_get("admin_threshold")?,
        admin_count: row.try_get("admin_count")?,
        steward_count: row.try_get("steward_count")?,
        settings: TenantSettings {
            auth_method: auth_method.parse().map_err(StoreError::Corrupt)?,
            self_registration: row.try_get("self_registration")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn membership_from_row(row: &PgRow) -> Result<Membership, StoreError> {
    let role: String = row.try_get("role")?;
    Ok(Membership {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        tenant_id: row.try_get("tenant_id")?,
        role: role.parse().map_err(StoreError::Corrupt)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn role_request_from_row(row: &PgRow) -> Result<RoleRequest, StoreError> {
    let requested_role: String = row.try_get("requested_role")?;
    let status: String = row.try_get("status")?;
    Ok(RoleRequest {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        tenant_id: row.try_get("tenant_id")?,
        requested_role: requested_role.parse().map_err(StoreError::Corrupt)?,
        reason: row.try_get("reason")?,
        status: status.parse().map_err(StoreError::Corrupt)?,
        created_at: row.try_get("created_at")?,
        resolved_by: row.try_get("resolved_by")?,
        resolved_at: row.try_get("resolved_at")?,
    })
}

const TENANT_COLUMNS: &str = "id, domain, maturity, age_days_threshold, user_threshold, \
     admin_threshold, admin_count, steward_count, auth_method, self_registration, \
     created_at, updated_at";

const REQUEST_COLUMNS: &str =
    "id, user_id, tenant_id, requested_role, reason, status, created_at, resolved_by, resolved_at";

/// Refresh the cached counters inside the caller's transaction.
async fn refresh_counters(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    tenant_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE tenants SET
            admin_count = (
                SELECT COUNT(*)::int FROM memberships
                WHERE tenant_id = $1 AND role IN ('admin', 'provisional_admin')
            ),
            steward_count = (
                SELECT COUNT(*)::int FROM memberships
                WHERE tenant_id = $1 AND role = 'steward'
            ),
            updated_at = $2
        WHERE id = $1
        "#,
    )
    .bind(tenant_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn fetch_tenant(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<Tenant, StoreError> {
    let row = sqlx::query(&format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("tenant {}", id)))?;
    tenant_from_row(&row)
}

#[async_trait]
impl TenantStore for PgStore {
    async fn create(&self, tenant: Tenant) -> Result<Tenant, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tenants (
                id, domain, maturity, age_days_threshold, user_threshold, admin_threshold,
                admin_count, steward_count, auth_method, self_registration, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.domain)
        .bind(tenant.maturity.as_str())
        .bind(tenant.age_days_threshold)
        .bind(tenant.user_threshold)
        .bind(tenant.admin_threshold)
        .bind(tenant.admin_count)
        .bind(tenant.steward_count)
        .bind(tenant.settings.auth_method.as_str())
        .bind(tenant.settings.self_registration)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(tenant),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Duplicate(format!("tenant {}", tenant.domain)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn by_domain(&self, domain: &str) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tenants WHERE domain = $1",
            TENANT_COLUMNS
        ))
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Tenant>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tenants ORDER BY created_at",
            TENANT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(tenant_from_row).collect()
    }

    async fn update_thresholds(
        &self,
        id: Uuid,
        update: &ThresholdUpdate,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE tenants SET
                age_days_threshold = COALESCE($2, age_days_threshold),
                user_threshold = COALESCE($3, user_threshold),
                admin_threshold = COALESCE($4, admin_threshold),
                updated_at = $5
            WHERE id = $1
            RETURNING {}
            "#,
            TENANT_COLUMNS
        ))
        .bind(id)
        .bind(update.age_days_threshold)
        .bind(update.user_threshold)
        .bind(update.admin_threshold)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("tenant {}", id)))?;
        tenant_from_row(&row)
    }

    async fn update_settings(
        &self,
        id: Uuid,
        settings: TenantSettings,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE tenants SET auth_method = $2, self_registration = $3, updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            TENANT_COLUMNS
        ))
        .bind(id)
        .bind(settings.auth_method.as_str())
        .bind(settings.self_registration)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("tenant {}", id)))?;
        tenant_from_row(&row)
    }

    async fn promote(&self, id: Uuid, now: DateTime<Utc>) -> Result<Tenant, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT maturity FROM tenants WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {}", id)))?;
        let maturity: String = row.try_get("maturity")?;
        let maturity: MaturityState = maturity.parse().map_err(StoreError::Corrupt)?;

        if maturity == MaturityState::Mature {
            let tenant = fetch_tenant(&mut tx, id).await?;
            tx.commit().await?;
            return Ok(tenant);
        }

        sqlx::query(
            "UPDATE memberships SET role = 'admin', updated_at = $2 \
             WHERE tenant_id = $1 AND role = 'provisional_admin'",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE tenants SET maturity = 'mature', updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        refresh_counters(&mut tx, id, now).await?;
        let tenant = fetch_tenant(&mut tx, id).await?;
        tx.commit().await?;
        Ok(tenant)
    }

    async fn set_maturity(
        &self,
        id: Uuid,
        maturity: MaturityState,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE tenants SET maturity = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            TENANT_COLUMNS
        ))
        .bind(id)
        .bind(maturity.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("tenant {}", id)))?;
        tenant_from_row(&row)
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn insert(&self, membership: Membership) -> Result<Membership, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO memberships (id, user_id, tenant_id, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(membership.id)
        .bind(membership.user_id)
        .bind(membership.tenant_id)
        .bind(membership.role.as_str())
        .bind(membership.created_at)
        .bind(membership.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = result {
            return if is_unique_violation(&e) {
                Err(StoreError::Duplicate(format!(
                    "membership for user {} in tenant {}",
                    membership.user_id, membership.tenant_id
                )))
            } else {
                Err(e.into())
            };
        }

        refresh_counters(&mut tx, membership.tenant_id, membership.updated_at).await?;
        tx.commit().await?;
        Ok(membership)
    }

    async fn find(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, tenant_id, role, created_at, updated_at \
             FROM memberships WHERE user_id = $1 AND tenant_id = $2",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(membership_from_row).transpose()
    }

    async fn set_role(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        role: GlobalRole,
        now: DateTime<Utc>,
    ) -> Result<Membership, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE memberships SET role = $3, updated_at = $4
            WHERE user_id = $1 AND tenant_id = $2
            RETURNING id, user_id, tenant_id, role, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(role.as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            StoreError::NotFound(format!("membership for user {} in tenant {}", user_id, tenant_id))
        })?;
        let membership = membership_from_row(&row)?;

        refresh_counters(&mut tx, tenant_id, now).await?;
        tx.commit().await?;
        Ok(membership)
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, tenant_id, role, created_at, updated_at \
             FROM memberships WHERE tenant_id = $1 ORDER BY created_at",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(membership_from_row).collect()
    }
}

#[async_trait]
impl RoleRequestStore for PgStore {
    async fn create(&self, request: RoleRequest) -> Result<RoleRequest, StoreError> {
        // The partial unique index on (user_id, tenant_id) WHERE pending
        // enforces the single-pending invariant.
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO role_requests ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request.id)
        .bind(request.user_id)
        .bind(request.tenant_id)
        .bind(request.requested_role.as_str())
        .bind(&request.reason)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.resolved_by)
        .bind(request.resolved_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(request),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate(format!(
                "pending role request for user {} in tenant {}",
                request.user_id, request.tenant_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<RoleRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM role_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(role_request_from_row).transpose()
    }

    async fn pending_for(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<RoleRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM role_requests \
             WHERE user_id = $1 AND tenant_id = $2 AND status = 'pending'",
            REQUEST_COLUMNS
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(role_request_from_row).transpose()
    }

    async fn list_pending(&self, tenant_id: Uuid) -> Result<Vec<RoleRequest>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM role_requests \
             WHERE tenant_id = $1 AND status = 'pending' ORDER BY created_at",
            REQUEST_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(role_request_from_row).collect()
    }

    async fn resolve(
        &self,
        id: Uuid,
        status: RequestStatus,
        resolved_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RoleRequest, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE role_requests SET status = $2, resolved_by = $3, resolved_at = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(resolved_by)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("pending role request {}", id)))?;
        role_request_from_row(&row)
    }
}

#[async_trait]
impl DomainApprovalStore for PgStore {
    async fn status(&self, domain: &str) -> Result<DomainApprovalStatus, StoreError> {
        let row = sqlx::query("SELECT status FROM domain_approvals WHERE domain = $1")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let status: String = row.try_get("status")?;
                status.parse().map_err(StoreError::Corrupt)
            }
            None => Ok(DomainApprovalStatus::Unknown),
        }
    }

    async fn set_status(
        &self,
        domain: &str,
        status: DomainApprovalStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO domain_approvals (domain, status, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (domain) DO UPDATE SET status = $2, updated_at = $3
            "#,
        )
        .bind(domain)
        .bind(status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
