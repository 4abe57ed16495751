use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use spliteasy_core::{
    ApiError, ApiResult, Bill, BillId, Contribution, ContributionId, Household, HouseholdId,
    HouseholdMember, MemberContribution, MemberContributionFilter, MemberContributionId, NewBill,
    NewContribution, NewHousehold, PaymentReceipt, ReceiptId, ReceiptStatus, ReceiptUpload,
    SplitBackend,
};
use tokio::sync::RwLock;

/// A remote call as seen by [`InMemoryBackend`], recorded in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    ListHouseholds,
    GetHousehold(HouseholdId),
    CreateHousehold,
    ListMembers(HouseholdId),
    AddMember(HouseholdId),
    ListBills,
    GetBill(BillId),
    CreateBill,
    ListContributions,
    GetContribution(ContributionId),
    CreateContribution,
    ListMemberContributions,
    GetMemberContribution(MemberContributionId),
    ListReceipts(MemberContributionId),
    UploadReceipt(MemberContributionId),
    ApproveReceipt(ReceiptId),
    RejectReceipt(ReceiptId),
}

#[derive(Default)]
struct State {
    households: Vec<Household>,
    members: HashMap<HouseholdId, Vec<HouseholdMember>>,
    bills: BTreeMap<BillId, Bill>,
    contributions: BTreeMap<ContributionId, Contribution>,
    member_contributions: Vec<MemberContribution>,
    receipts: Vec<PaymentReceipt>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn household_of(&self, row: &MemberContribution) -> Option<HouseholdId> {
        self.contributions
            .get(&row.contribution_id)
            .and_then(|contribution| contribution.household_id)
    }
}

/// Backend double holding everything in memory. Records every call and can
/// be told to fail specific ones.
#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<State>,
    calls: RwLock<Vec<Call>>,
    failures: RwLock<HashMap<Call, ApiError>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_household(mut self, household: Household, members: Vec<HouseholdMember>) -> Self {
        let state = self.state.get_mut();
        state.members.insert(household.id, members);
        state.households.push(household);
        self
    }

    #[must_use]
    pub fn with_bill(mut self, bill: Bill) -> Self {
        self.state.get_mut().bills.insert(bill.id, bill);
        self
    }

    #[must_use]
    pub fn with_contribution(mut self, contribution: Contribution) -> Self {
        self.state
            .get_mut()
            .contributions
            .insert(contribution.id, contribution);
        self
    }

    #[must_use]
    pub fn with_member_contribution(mut self, row: MemberContribution) -> Self {
        self.state.get_mut().member_contributions.push(row);
        self
    }

    #[must_use]
    pub fn with_receipt(mut self, receipt: PaymentReceipt) -> Self {
        self.state.get_mut().receipts.push(receipt);
        self
    }

    /// Makes every later `call` fail with `error`.
    #[must_use]
    pub fn failing(mut self, call: Call, error: ApiError) -> Self {
        self.failures.get_mut().insert(call, error);
        self
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.read().await.iter().filter(|call| predicate(call)).count()
    }

    async fn enter(&self, call: Call) -> ApiResult<()> {
        self.calls.write().await.push(call.clone());
        match self.failures.read().await.get(&call) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

fn missing(what: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::NotFound(format!("{what} {id}"))
}

#[async_trait]
impl SplitBackend for InMemoryBackend {
    async fn list_households(&self) -> ApiResult<Vec<Household>> {
        self.enter(Call::ListHouseholds).await?;
        Ok(self.state.read().await.households.clone())
    }

    async fn get_household(&self, id: HouseholdId) -> ApiResult<Household> {
        self.enter(Call::GetHousehold(id)).await?;
        let state = self.state.read().await;
        state
            .households
            .iter()
            .find(|household| household.id == id)
            .cloned()
            .ok_or_else(|| missing("household", id))
    }

    async fn create_household(&self, household: NewHousehold) -> ApiResult<Household> {
        self.enter(Call::CreateHousehold).await?;
        let mut state = self.state.write().await;
        let created = Household {
            id: HouseholdId(state.next_id()),
            name: household.name,
            description: household.description,
            currency: household.currency,
            representative_id: None,
        };
        state.members.insert(created.id, Vec::new());
        state.households.push(created.clone());
        Ok(created)
    }

    async fn list_household_members(
        &self,
        household_id: HouseholdId,
    ) -> ApiResult<Vec<HouseholdMember>> {
        self.enter(Call::ListMembers(household_id)).await?;
        let state = self.state.read().await;
        state
            .members
            .get(&household_id)
            .cloned()
            .ok_or_else(|| missing("household", household_id))
    }

    async fn add_member(
        &self,
        household_id: HouseholdId,
        email: &str,
    ) -> ApiResult<HouseholdMember> {
        self.enter(Call::AddMember(household_id)).await?;
        let mut state = self.state.write().await;
        let membership_id = state.next_id();
        let member = HouseholdMember {
            membership_id: Some(membership_id),
            user_id: None,
            household_id: Some(household_id),
            name: None,
            email: Some(email.to_string()),
            income: None,
        };
        state
            .members
            .get_mut(&household_id)
            .ok_or_else(|| missing("household", household_id))?
            .push(member.clone());
        Ok(member)
    }

    async fn list_bills(&self, household_id: Option<HouseholdId>) -> ApiResult<Vec<Bill>> {
        self.enter(Call::ListBills).await?;
        let state = self.state.read().await;
        Ok(state
            .bills
            .values()
            .filter(|bill| household_id.is_none() || bill.household_id == household_id)
            .cloned()
            .collect())
    }

    async fn get_bill(&self, id: BillId) -> ApiResult<Bill> {
        self.enter(Call::GetBill(id)).await?;
        let state = self.state.read().await;
        state.bills.get(&id).cloned().ok_or_else(|| missing("bill", id))
    }

    async fn create_bill(&self, bill: NewBill) -> ApiResult<Bill> {
        self.enter(Call::CreateBill).await?;
        let mut state = self.state.write().await;
        let created = Bill {
            id: BillId(state.next_id()),
            description: bill.description,
            amount: bill.amount,
            date: Some(bill.date),
            household_id: Some(bill.household_id),
        };
        state.bills.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_contributions(
        &self,
        household_id: Option<HouseholdId>,
    ) -> ApiResult<Vec<Contribution>> {
        self.enter(Call::ListContributions).await?;
        let state = self.state.read().await;
        Ok(state
            .contributions
            .values()
            .filter(|row| household_id.is_none() || row.household_id == household_id)
            .cloned()
            .collect())
    }

    async fn get_contribution(&self, id: ContributionId) -> ApiResult<Contribution> {
        self.enter(Call::GetContribution(id)).await?;
        let state = self.state.read().await;
        state
            .contributions
            .get(&id)
            .cloned()
            .ok_or_else(|| missing("contribution", id))
    }

    async fn create_contribution(
        &self,
        contribution: NewContribution,
    ) -> ApiResult<Contribution> {
        self.enter(Call::CreateContribution).await?;
        let mut state = self.state.write().await;
        let created = Contribution {
            id: ContributionId(state.next_id()),
            bill_id: contribution.bill_id,
            household_id: Some(contribution.household_id),
            description: Some(contribution.description),
            strategy: Some(contribution.strategy),
            due_date: Some(contribution.due_date),
        };
        state.contributions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_member_contributions(
        &self,
        filter: &MemberContributionFilter,
    ) -> ApiResult<Vec<MemberContribution>> {
        self.enter(Call::ListMemberContributions).await?;
        let state = self.state.read().await;
        Ok(state
            .member_contributions
            .iter()
            .filter(|row| filter.matches(row, state.household_of(row)))
            .cloned()
            .collect())
    }

    async fn get_member_contribution(
        &self,
        id: MemberContributionId,
    ) -> ApiResult<MemberContribution> {
        self.enter(Call::GetMemberContribution(id)).await?;
        let state = self.state.read().await;
        state
            .member_contributions
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or_else(|| missing("member contribution", id))
    }

    async fn list_receipts(
        &self,
        member_contribution_id: MemberContributionId,
    ) -> ApiResult<Vec<PaymentReceipt>> {
        self.enter(Call::ListReceipts(member_contribution_id)).await?;
        let state = self.state.read().await;
        Ok(state
            .receipts
            .iter()
            .filter(|receipt| receipt.member_contribution_id == member_contribution_id)
            .cloned()
            .collect())
    }

    async fn upload_receipt(
        &self,
        member_contribution_id: MemberContributionId,
        upload: ReceiptUpload,
    ) -> ApiResult<PaymentReceipt> {
        self.enter(Call::UploadReceipt(member_contribution_id)).await?;
        let mut state = self.state.write().await;
        if !state
            .member_contributions
            .iter()
            .any(|row| row.id == member_contribution_id)
        {
            return Err(missing("member contribution", member_contribution_id));
        }
        let id = ReceiptId(state.next_id());
        let receipt = PaymentReceipt {
            id,
            member_contribution_id,
            url: Some(format!("memory://receipts/{id}/{}", upload.filename)),
            filename: upload.filename,
            status: ReceiptStatus::Pending,
            uploaded_at: Some(Utc::now()),
            reviewed_by: None,
            notes: None,
        };
        state.receipts.push(receipt.clone());
        Ok(receipt)
    }

    async fn approve_receipt(&self, receipt_id: ReceiptId) -> ApiResult<PaymentReceipt> {
        self.enter(Call::ApproveReceipt(receipt_id)).await?;
        let mut state = self.state.write().await;
        let receipt = state
            .receipts
            .iter_mut()
            .find(|receipt| receipt.id == receipt_id)
            .ok_or_else(|| missing("receipt", receipt_id))?;
        receipt.status = ReceiptStatus::Approved;
        let approved = receipt.clone();
        if let Some(row) = state
            .member_contributions
            .iter_mut()
            .find(|row| row.id == approved.member_contribution_id)
        {
            row.status = Some("PAID".to_string());
            row.paid_at = Some(Utc::now());
        }
        Ok(approved)
    }

    async fn reject_receipt(
        &self,
        receipt_id: ReceiptId,
        notes: Option<String>,
    ) -> ApiResult<PaymentReceipt> {
        self.enter(Call::RejectReceipt(receipt_id)).await?;
        let mut state = self.state.write().await;
        let receipt = state
            .receipts
            .iter_mut()
            .find(|receipt| receipt.id == receipt_id)
            .ok_or_else(|| missing("receipt", receipt_id))?;
        receipt.status = ReceiptStatus::Rejected;
        receipt.notes = notes;
        let rejected = receipt.clone();
        if let Some(row) = state
            .member_contributions
            .iter_mut()
            .find(|row| row.id == rejected.member_contribution_id)
        {
            row.status = Some("REJECTED".to_string());
        }
        Ok(rejected)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use spliteasy_core::UserId;

    use super::*;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_contribution(Contribution {
                id: ContributionId(1),
                bill_id: None,
                household_id: Some(HouseholdId(7)),
                description: Some("Agua".to_string()),
                strategy: None,
                due_date: None,
            })
            .with_member_contribution(MemberContribution {
                id: MemberContributionId(10),
                contribution_id: ContributionId(1),
                member_id: UserId(3),
                amount: Decimal::new(1500, 2),
                status: Some("PENDING".to_string()),
                paid_at: None,
            })
    }

    #[tokio::test]
    async fn records_calls_in_order() {
        let backend = backend();
        backend.list_households().await.unwrap();
        backend.get_contribution(ContributionId(1)).await.unwrap();
        assert_eq!(
            backend.calls().await,
            vec![Call::ListHouseholds, Call::GetContribution(ContributionId(1))]
        );
    }

    #[tokio::test]
    async fn injected_failure_is_returned_and_still_recorded() {
        let backend = backend().failing(Call::ListHouseholds, ApiError::http(502, None));
        let err = backend.list_households().await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(backend.call_count(|call| *call == Call::ListHouseholds).await, 1);
    }

    #[tokio::test]
    async fn member_contributions_filter_by_household_through_contribution() {
        let backend = backend();
        let filter = MemberContributionFilter::for_member(UserId(3));
        let inside = filter.clone().in_household(Some(HouseholdId(7)));
        let outside = filter.in_household(Some(HouseholdId(8)));
        assert_eq!(backend.list_member_contributions(&inside).await.unwrap().len(), 1);
        assert!(backend.list_member_contributions(&outside).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approving_a_receipt_marks_the_row_paid() {
        let backend = backend();
        let receipt = backend
            .upload_receipt(
                MemberContributionId(10),
                ReceiptUpload {
                    filename: "voucher.pdf".to_string(),
                    content_type: "application/pdf".to_string(),
                    bytes: vec![1, 2, 3],
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Pending);

        backend.approve_receipt(receipt.id).await.unwrap();
        let row = backend
            .get_member_contribution(MemberContributionId(10))
            .await
            .unwrap();
        assert_eq!(row.status.as_deref(), Some("PAID"));
        assert!(row.paid_at.is_some());
    }

    #[tokio::test]
    async fn created_records_are_listed_by_household() {
        let backend = InMemoryBackend::new();
        let household = backend
            .create_household(NewHousehold {
                name: "Casa".to_string(),
                description: None,
                currency: "GTQ".to_string(),
            })
            .await
            .unwrap();
        let member = backend.add_member(household.id, "ana@example.com").await.unwrap();
        assert_eq!(member.household_id, Some(household.id));
        assert_eq!(
            backend.list_household_members(household.id).await.unwrap(),
            vec![member]
        );

        let bill = backend
            .create_bill(NewBill {
                household_id: household.id,
                description: "Luz".to_string(),
                amount: Decimal::new(9000, 2),
                date: chrono::NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            })
            .await
            .unwrap();
        let charge = backend
            .create_contribution(NewContribution {
                household_id: household.id,
                bill_id: Some(bill.id),
                description: "Luz abril".to_string(),
                strategy: spliteasy_core::SplitStrategy::Equal,
                due_date: chrono::NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(backend.list_bills(Some(household.id)).await.unwrap(), vec![bill]);
        assert!(backend.list_bills(Some(HouseholdId(1))).await.unwrap().is_empty());
        assert_eq!(
            backend.list_contributions(Some(household.id)).await.unwrap(),
            vec![charge]
        );
        assert_eq!(backend.get_household(household.id).await.unwrap(), household);
    }

    #[tokio::test]
    async fn adding_to_an_unknown_household_fails() {
        let err = InMemoryBackend::new()
            .add_member(HouseholdId(5), "x@example.com")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let err = backend().get_bill(BillId(99)).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
