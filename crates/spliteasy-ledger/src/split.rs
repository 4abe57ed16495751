use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use spliteasy_core::{HouseholdMember, SplitStrategy, UserId};
use tracing::warn;

fn cent() -> Decimal {
    Decimal::new(1, 2)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitMember {
    pub user_id: UserId,
    pub income: Option<Decimal>,
}

impl SplitMember {
    pub fn from_member(member: &HouseholdMember) -> Option<Self> {
        Some(Self {
            user_id: member.user_id?,
            income: member.income,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Share {
    pub user_id: UserId,
    pub amount: Decimal,
}

/// What each member would owe if `amount` were split with `strategy`.
///
/// Shares are in cents and always add up to `amount` rounded to cents. When
/// the incomes are all zero, or too large to add up, the split is equal.
pub fn preview_split(
    amount: Decimal,
    members: &[SplitMember],
    strategy: SplitStrategy,
) -> Vec<Share> {
    if members.is_empty() {
        return Vec::new();
    }
    let amount = amount.round_dp(2);

    match strategy {
        SplitStrategy::IncomeBased => {
            let incomes: Vec<Decimal> = members
                .iter()
                .map(|member| member.income.unwrap_or_default().max(Decimal::ZERO))
                .collect();
            let total_income = incomes
                .iter()
                .try_fold(Decimal::ZERO, |total, income| total.checked_add(*income));
            let Some(total_income) = total_income.filter(|total| !total.is_zero()) else {
                return equal_split(amount, members);
            };

            let base: Option<Vec<Decimal>> = incomes
                .iter()
                .map(|income| {
                    let ratio = income.checked_div(total_income)?;
                    amount.checked_mul(ratio).map(truncate_cents)
                })
                .collect();
            let Some(base) = base else {
                warn!(%amount, "income split out of range, splitting equally");
                return equal_split(amount, members);
            };
            let mut order: Vec<usize> = (0..members.len()).collect();
            order.sort_by(|left, right| incomes[*right].cmp(&incomes[*left]));
            distribute(amount, members, base, &order)
        }
        SplitStrategy::Equal => equal_split(amount, members),
    }
}

fn equal_split(amount: Decimal, members: &[SplitMember]) -> Vec<Share> {
    let count = Decimal::from(members.len());
    let base = vec![truncate_cents(amount / count); members.len()];
    let order: Vec<usize> = (0..members.len()).collect();
    distribute(amount, members, base, &order)
}

fn truncate_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Hands the rounding remainder out one cent at a time, following `order`.
fn distribute(
    amount: Decimal,
    members: &[SplitMember],
    mut shares: Vec<Decimal>,
    order: &[usize],
) -> Vec<Share> {
    let mut remainder = amount - shares.iter().sum::<Decimal>();
    let step = if remainder.is_sign_negative() { -cent() } else { cent() };
    for index in order.iter().cycle() {
        if remainder.is_zero() {
            break;
        }
        shares[*index] += step;
        remainder -= step;
    }

    members
        .iter()
        .zip(shares)
        .map(|(member, amount)| Share {
            user_id: member.user_id,
            amount,
        })
        .collect()
}
