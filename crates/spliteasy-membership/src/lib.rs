//! Finds the household a user belongs to.
//!
//! The backend has no "households for user" query. Until it does, the only
//! way to answer is to walk every household and read its member list, which
//! is what [`MembershipResolver::find_household_for_user`] does. Nothing else
//! in the client scans memberships, so that method is the single place to
//! replace once the endpoint exists.

use spliteasy_core::{ApiError, ApiResult, Household, SplitBackend, UserId};
use spliteasy_platform::Session;
use tracing::{debug, info};

pub struct MembershipResolver<'a, B>
where
    B: SplitBackend + ?Sized,
{
    backend: &'a B,
}

impl<'a, B> MembershipResolver<'a, B>
where
    B: SplitBackend + ?Sized,
{
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Households are scanned in list order and the scan stops at the first
    /// household whose member list contains `user_id`. Any failed call ends
    /// the scan with that error; nothing is cached between calls.
    pub async fn find_household_for_user(&self, user_id: UserId) -> ApiResult<Option<Household>> {
        let households = self.backend.list_households().await?;
        if households.is_empty() {
            debug!(%user_id, "no households to scan");
            return Ok(None);
        }

        for household in households {
            let members = self.backend.list_household_members(household.id).await?;
            if members.iter().any(|member| member.user_id == Some(user_id)) {
                info!(%user_id, household_id = %household.id, "household resolved");
                return Ok(Some(household));
            }
        }

        debug!(%user_id, "user belongs to no household");
        Ok(None)
    }

    /// Resolves the signed-in user's household and records it on the session.
    pub async fn resolve_active_household(
        &self,
        session: &mut Session,
    ) -> ApiResult<Option<Household>> {
        let user_id = session.user_id.ok_or(ApiError::Unauthenticated)?;
        let household = self.find_household_for_user(user_id).await?;
        session.active_household_id = household.as_ref().map(|household| household.id);
        Ok(household)
    }
}
