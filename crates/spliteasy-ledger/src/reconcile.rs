use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use spliteasy_core::status::derive_status_from;
use spliteasy_core::{
    ApiResult, Bill, BillId, Contribution, ContributionId, ContributionStatus, HouseholdId,
    MemberContribution, MemberContributionFilter, MemberContributionId, ReceiptStatus,
    SplitBackend, SplitStrategy, UserId, normalize_status,
};
use tracing::{debug, warn};

/// A member contribution joined with its contribution, bill and receipts.
/// Fields from a lookup that failed are `None`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContributionRow {
    pub member_contribution_id: MemberContributionId,
    pub contribution_id: ContributionId,
    pub member_id: UserId,
    pub amount: Decimal,
    pub raw_status: Option<String>,
    pub status: ContributionStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub has_pending_receipt: bool,
    pub receipt_count: usize,
    pub description: Option<String>,
    pub strategy: Option<SplitStrategy>,
    pub due_date: Option<NaiveDate>,
    pub bill_id: Option<BillId>,
    pub bill_description: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub bill_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    /// Everything still owed: the home and contributions lists.
    Outstanding,
    /// Paid rows only: the payment history.
    History,
    All,
}

impl RowFilter {
    pub fn matches(self, row: &ContributionRow) -> bool {
        match self {
            Self::Outstanding => !row.status.is_paid(),
            Self::History => row.status.is_paid(),
            Self::All => true,
        }
    }
}

pub struct ContributionReconciler<'a, B>
where
    B: SplitBackend + ?Sized,
{
    backend: &'a B,
}

impl<'a, B> ContributionReconciler<'a, B>
where
    B: SplitBackend + ?Sized,
{
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    pub async fn list_my_contributions(
        &self,
        user_id: UserId,
        household_id: Option<HouseholdId>,
        filter: RowFilter,
    ) -> ApiResult<Vec<ContributionRow>> {
        self.list_my_contributions_where(user_id, household_id, |row| filter.matches(row))
            .await
    }

    /// Fails only if the member contributions themselves cannot be listed.
    /// Rows keep the order the backend returned them in.
    pub async fn list_my_contributions_where<F>(
        &self,
        user_id: UserId,
        household_id: Option<HouseholdId>,
        keep: F,
    ) -> ApiResult<Vec<ContributionRow>>
    where
        F: Fn(&ContributionRow) -> bool,
    {
        let filter = MemberContributionFilter::for_member(user_id).in_household(household_id);
        let owed = self.backend.list_member_contributions(&filter).await?;
        debug!(%user_id, rows = owed.len(), "reconciling member contributions");

        let rows = join_all(owed.into_iter().map(|row| self.enrich(row))).await;
        Ok(rows.into_iter().filter(|row| keep(row)).collect())
    }

    async fn enrich(&self, owed: MemberContribution) -> ContributionRow {
        let parent = async {
            let contribution = match self.backend.get_contribution(owed.contribution_id).await {
                Ok(contribution) => contribution,
                Err(err) => {
                    warn!(contribution_id = %owed.contribution_id, "contribution lookup failed: {err}");
                    return (None, None);
                }
            };
            let bill = match contribution.bill_id {
                Some(bill_id) => match self.backend.get_bill(bill_id).await {
                    Ok(bill) => Some(bill),
                    Err(err) => {
                        warn!(%bill_id, "bill lookup failed: {err}");
                        None
                    }
                },
                None => None,
            };
            (Some(contribution), bill)
        };
        let receipts = async {
            match self.backend.list_receipts(owed.id).await {
                Ok(receipts) => receipts,
                Err(err) => {
                    warn!(member_contribution_id = %owed.id, "receipt lookup failed: {err}");
                    Vec::new()
                }
            }
        };
        let ((contribution, bill), receipts) = futures_util::join!(parent, receipts);

        let has_pending_receipt = receipts
            .iter()
            .any(|receipt| receipt.status == ReceiptStatus::Pending);
        let status = derive_status_from(normalize_status(owed.status.as_deref()), has_pending_receipt);

        assemble(owed, contribution, bill, has_pending_receipt, receipts.len(), status)
    }
}

fn assemble(
    owed: MemberContribution,
    contribution: Option<Contribution>,
    bill: Option<Bill>,
    has_pending_receipt: bool,
    receipt_count: usize,
    status: ContributionStatus,
) -> ContributionRow {
    let (description, strategy, due_date, bill_id) = match contribution {
        Some(contribution) => (
            contribution.description,
            contribution.strategy,
            contribution.due_date,
            contribution.bill_id,
        ),
        None => (None, None, None, None),
    };

    ContributionRow {
        member_contribution_id: owed.id,
        contribution_id: owed.contribution_id,
        member_id: owed.member_id,
        amount: owed.amount,
        raw_status: owed.status,
        status,
        paid_at: owed.paid_at,
        has_pending_receipt,
        receipt_count,
        description,
        strategy,
        due_date,
        bill_id,
        bill_description: bill.as_ref().map(|bill| bill.description.clone()),
        bill_date: bill.as_ref().and_then(|bill| bill.date),
        bill_amount: bill.map(|bill| bill.amount),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusTotal {
    pub status: ContributionStatus,
    pub count: usize,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContributionSummary {
    pub totals: Vec<StatusTotal>,
    pub outstanding: Decimal,
}

/// Count and amount per status, in display order, plus what is still owed.
pub fn summarize(rows: &[ContributionRow]) -> ContributionSummary {
    let totals: Vec<StatusTotal> = [
        ContributionStatus::Pending,
        ContributionStatus::InReview,
        ContributionStatus::Rejected,
        ContributionStatus::Paid,
    ]
    .into_iter()
    .map(|status| {
        let matching = rows.iter().filter(|row| row.status == status);
        StatusTotal {
            status,
            count: matching.clone().count(),
            amount: matching.map(|row| row.amount).sum(),
        }
    })
    .collect();
    let outstanding = totals
        .iter()
        .filter(|total| !total.status.is_paid())
        .map(|total| total.amount)
        .sum();

    ContributionSummary {
        totals,
        outstanding,
    }
}
