use async_trait::async_trait;

use crate::error::ApiResult;
use crate::models::{
    Bill, BillId, Contribution, ContributionId, Household, HouseholdId, HouseholdMember,
    MemberContribution, MemberContributionFilter, MemberContributionId, NewBill, NewContribution,
    NewHousehold, PaymentReceipt, ReceiptId, ReceiptUpload,
};

/// Remote operations the client core depends on. Implemented over HTTP by
/// `spliteasy-platform` and in memory by `spliteasy-memstore`.
#[async_trait]
pub trait SplitBackend: Send + Sync {
    async fn list_households(&self) -> ApiResult<Vec<Household>>;
    async fn get_household(&self, id: HouseholdId) -> ApiResult<Household>;
    async fn create_household(&self, household: NewHousehold) -> ApiResult<Household>;

    async fn list_household_members(
        &self,
        household_id: HouseholdId,
    ) -> ApiResult<Vec<HouseholdMember>>;
    async fn add_member(&self, household_id: HouseholdId, email: &str)
    -> ApiResult<HouseholdMember>;

    async fn list_bills(&self, household_id: Option<HouseholdId>) -> ApiResult<Vec<Bill>>;
    async fn get_bill(&self, id: BillId) -> ApiResult<Bill>;
    async fn create_bill(&self, bill: NewBill) -> ApiResult<Bill>;

    async fn list_contributions(
        &self,
        household_id: Option<HouseholdId>,
    ) -> ApiResult<Vec<Contribution>>;
    async fn get_contribution(&self, id: ContributionId) -> ApiResult<Contribution>;
    async fn create_contribution(&self, contribution: NewContribution)
    -> ApiResult<Contribution>;

    async fn list_member_contributions(
        &self,
        filter: &MemberContributionFilter,
    ) -> ApiResult<Vec<MemberContribution>>;
    async fn get_member_contribution(
        &self,
        id: MemberContributionId,
    ) -> ApiResult<MemberContribution>;

    async fn list_receipts(
        &self,
        member_contribution_id: MemberContributionId,
    ) -> ApiResult<Vec<PaymentReceipt>>;
    async fn upload_receipt(
        &self,
        member_contribution_id: MemberContributionId,
        upload: ReceiptUpload,
    ) -> ApiResult<PaymentReceipt>;
    async fn approve_receipt(&self, receipt_id: ReceiptId) -> ApiResult<PaymentReceipt>;
    async fn reject_receipt(
        &self,
        receipt_id: ReceiptId,
        notes: Option<String>,
    ) -> ApiResult<PaymentReceipt>;
}
