use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::status::ReceiptStatus;

macro_rules! id_type {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl From<i64> for $name {
                fn from(value: i64) -> Self {
                    Self(value)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

id_type!(
    UserId,
    HouseholdId,
    BillId,
    ContributionId,
    MemberContributionId,
    ReceiptId,
);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Representative,
    Member,
}

impl Role {
    /// Accepts the role tokens both backends emit ("REPRESENTANTE", "rep", "ADMIN", ...).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "REPRESENTATIVE" | "REPRESENTANTE" | "REP" | "ADMIN" | "OWNER" => Self::Representative,
            _ => Self::Member,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Representative => "REPRESENTATIVE",
            Self::Member => "MEMBER",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitStrategy {
    Equal,
    IncomeBased,
}

impl SplitStrategy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "EQUAL" | "EQUITATIVO" | "IGUAL" => Some(Self::Equal),
            "INCOME_BASED" | "INCOME" | "PROPORCIONAL" | "POR_INGRESOS" => Some(Self::IncomeBased),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::IncomeBased => "INCOME_BASED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
    pub representative_id: Option<UserId>,
}

/// Link between a user and the household they belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HouseholdMember {
    pub membership_id: Option<i64>,
    pub user_id: Option<UserId>,
    pub household_id: Option<HouseholdId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub income: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    pub id: BillId,
    pub description: String,
    pub amount: Decimal,
    pub date: Option<NaiveDate>,
    pub household_id: Option<HouseholdId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contribution {
    pub id: ContributionId,
    pub bill_id: Option<BillId>,
    pub household_id: Option<HouseholdId>,
    pub description: Option<String>,
    pub strategy: Option<SplitStrategy>,
    pub due_date: Option<NaiveDate>,
}

/// One member's share of a contribution. `status` is kept exactly as the
/// backend sent it; the displayed status is derived in [`crate::status`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberContribution {
    pub id: MemberContributionId,
    pub contribution_id: ContributionId,
    pub member_id: UserId,
    pub amount: Decimal,
    pub status: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    pub id: ReceiptId,
    pub member_contribution_id: MemberContributionId,
    pub filename: String,
    pub url: Option<String>,
    pub status: ReceiptStatus,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub role: Role,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHousehold {
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBill {
    pub household_id: HouseholdId,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContribution {
    pub household_id: HouseholdId,
    pub bill_id: Option<BillId>,
    pub description: String,
    pub strategy: SplitStrategy,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ReceiptUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberContributionFilter {
    pub member_id: Option<UserId>,
    pub household_id: Option<HouseholdId>,
    pub contribution_id: Option<ContributionId>,
}

impl MemberContributionFilter {
    pub fn for_member(member_id: UserId) -> Self {
        Self {
            member_id: Some(member_id),
            ..Self::default()
        }
    }

    pub fn in_household(mut self, household_id: Option<HouseholdId>) -> Self {
        self.household_id = household_id;
        self
    }

    pub fn matches(&self, row: &MemberContribution, household_of: Option<HouseholdId>) -> bool {
        self.member_id.is_none_or(|member| row.member_id == member)
            && self.contribution_id.is_none_or(|id| row.contribution_id == id)
            && self
                .household_id
                .is_none_or(|household| household_of == Some(household))
    }
}
