use serde::Serialize;
use spliteasy_core::{
    Bill, Contribution, Household, HouseholdId, HouseholdMember, PaymentReceipt, UserId,
};
use spliteasy_ledger::{ContributionRow, ContributionSummary, PendingReceipt, Share};
use spliteasy_platform::Session;

/// What `whoami` shows; the token itself is never printed.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub signed_in: bool,
    pub user_id: Option<UserId>,
    pub role: Option<&'static str>,
    pub household_id: Option<HouseholdId>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            signed_in: session.is_signed_in(),
            user_id: session.user_id,
            role: session.role.map(|role| role.as_str()),
            household_id: session.active_household_id,
        }
    }
}

pub fn describe_session(view: &SessionView) -> String {
    match (view.signed_in, view.user_id) {
        (true, Some(user_id)) => {
            let household = view
                .household_id
                .map(|id| format!("household {id}"))
                .unwrap_or_else(|| "no household".to_string());
            format!("user {user_id} ({}), {household}", view.role.unwrap_or("MEMBER"))
        }
        _ => "not signed in".to_string(),
    }
}

pub fn describe_household(household: &Household) -> String {
    let mut text = format!("{} [{}] ({})", household.name, household.id, household.currency);
    if let Some(description) = &household.description {
        text.push_str("\n  ");
        text.push_str(description);
    }
    text
}

pub fn describe_members(members: &[HouseholdMember]) -> String {
    members
        .iter()
        .map(|member| {
            let user = member
                .user_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "?".to_string());
            let name = member
                .name
                .as_deref()
                .or(member.email.as_deref())
                .unwrap_or("(unnamed)");
            format!("{user:>6}  {name}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn describe_bills(bills: &[Bill]) -> String {
    bills
        .iter()
        .map(|bill| {
            let date = bill.date.map(|date| date.to_string()).unwrap_or_default();
            format!(
                "#{:<5} {:<10} {:>10}  {}",
                bill.id,
                date,
                bill.amount.round_dp(2),
                bill.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn describe_charges(charges: &[Contribution]) -> String {
    charges
        .iter()
        .map(|charge| {
            let strategy = charge.strategy.map(|strategy| strategy.as_str()).unwrap_or("-");
            let due = charge
                .due_date
                .map(|date| format!(" due {date}"))
                .unwrap_or_default();
            let bill = charge
                .bill_id
                .map(|id| format!(" (bill {id})"))
                .unwrap_or_default();
            format!(
                "#{:<5} {:<12} {}{bill}{due}",
                charge.id,
                strategy,
                charge.description.as_deref().unwrap_or("(no description)")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn describe_rows(rows: &[ContributionRow]) -> String {
    if rows.is_empty() {
        return "nothing here".to_string();
    }
    rows.iter()
        .map(|row| {
            let label = row
                .description
                .as_deref()
                .or(row.bill_description.as_deref())
                .unwrap_or("(unknown contribution)");
            let due = row
                .due_date
                .map(|date| format!(" due {date}"))
                .unwrap_or_default();
            format!(
                "#{:<5} {:<10} {:>10}  {label}{due}",
                row.member_contribution_id,
                row.status.as_str(),
                row.amount.round_dp(2)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn describe_summary(summary: &ContributionSummary) -> String {
    let mut lines: Vec<String> = summary
        .totals
        .iter()
        .map(|total| {
            format!(
                "{:<10} {:>3}  {:>10}",
                total.status.as_str(),
                total.count,
                total.amount.round_dp(2)
            )
        })
        .collect();
    lines.push(format!("outstanding {:>14}", summary.outstanding.round_dp(2)));
    lines.join("\n")
}

pub fn describe_receipts(receipts: &[PaymentReceipt]) -> String {
    receipts
        .iter()
        .map(|receipt| {
            let notes = receipt
                .notes
                .as_deref()
                .map(|notes| format!("  ({notes})"))
                .unwrap_or_default();
            format!(
                "#{:<5} {:<9} {}{notes}",
                receipt.id,
                receipt.status.as_str(),
                receipt.filename
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn describe_queue(queue: &[PendingReceipt]) -> String {
    if queue.is_empty() {
        return "no receipts waiting for review".to_string();
    }
    queue
        .iter()
        .map(|item| {
            format!(
                "#{:<5} member {:<5} owes {:>10}  {}",
                item.receipt.id,
                item.owed.member_id,
                item.owed.amount.round_dp(2),
                item.receipt.filename
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn describe_shares(shares: &[Share]) -> String {
    shares
        .iter()
        .map(|share| format!("member {:<6} {:>10}", share.user_id, share.amount))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
