//! Organization ("Circle") repository implementation
//!
//! Membership roles are the authorization policy for managing an
//! organization's event registrations.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::event::{Organization, OrganizationRole};
use crate::utils::errors::Result;

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Find organization by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>>;

    /// Role of a user inside an organization, if any
    async fn member_role(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<OrganizationRole>>;
}

#[derive(Clone, Debug)]
pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let row: Option<(Uuid, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
            "SELECT id, name, created_at FROM organizations WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, created_at)| Organization { id, name, created_at }))
    }

    async fn member_role(&self, organization_id: Uuid, user_id: Uuid) -> Result<Option<OrganizationRole>> {
        let role: Option<(String,)> = sqlx::query_as(
            "SELECT role FROM organization_members WHERE organization_id = $1 AND user_id = $2"
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role.and_then(|(role,)| match role.as_str() {
            "owner" => Some(OrganizationRole::Owner),
            "admin" => Some(OrganizationRole::Admin),
            "member" => Some(OrganizationRole::Member),
            _ => None,
        }))
    }
}
