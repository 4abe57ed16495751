//! Wire shapes of the SplitEasy REST API.
//!
//! Two backend generations are live and they name the same things
//! differently, and some payloads carry several spellings of the same field
//! at once. Each spelling is its own optional field here, the first present
//! one wins, and the DTO is converted once into a `spliteasy_core` model;
//! nothing past this module looks at raw keys.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use spliteasy_core::{
    ApiError, AuthSession, Bill, BillId, Contribution, ContributionId, Household, HouseholdId,
    HouseholdMember, MemberContribution, MemberContributionId, NewBill, NewContribution,
    NewHousehold, PaymentReceipt, ReceiptId, ReceiptStatus, Role, SplitStrategy, UserId,
};

/// Identifier that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireId(pub i64);

impl<'de> Deserialize<'de> for WireId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Self(value)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| de::Error::custom(format!("invalid id {text:?}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdRef {
    #[serde(default)]
    pub id: Option<WireId>,
}

/// The three ways an owning household is referenced: flat `householdId`,
/// nested `household.id`, legacy `household_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HouseholdKeys {
    #[serde(rename = "householdId", default)]
    pub flat: Option<WireId>,
    #[serde(rename = "household", default)]
    pub nested: Option<IdRef>,
    #[serde(rename = "household_id", default)]
    pub legacy: Option<WireId>,
}

impl HouseholdKeys {
    pub fn normalized_household_id(&self) -> Option<HouseholdId> {
        self.flat
            .or_else(|| self.nested.as_ref().and_then(|household| household.id))
            .or(self.legacy)
            .map(|id| HouseholdId(id.0))
    }
}

/// List payloads come bare or wrapped, depending on the backend.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Bare(Vec<T>),
    Data { data: Vec<T> },
    Items { items: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Data { data: items } | Self::Items { items } => items,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

/// First spelling that carried a value, in the order given.
fn first<T>(spellings: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    spellings.into_iter().flatten().next()
}

fn no_amount(what: &str, id: WireId) -> ApiError {
    ApiError::Decode(format!("{what} {} has no amount", id.0))
}

#[derive(Debug, Clone, Deserialize)]
pub struct HouseholdDto {
    pub id: WireId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "currencyCode")]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub moneda: Option<String>,
    #[serde(default, rename = "representativeId")]
    pub representative_id: Option<WireId>,
    #[serde(default, rename = "representative_id")]
    pub representative_id_legacy: Option<WireId>,
    #[serde(default, rename = "ownerId")]
    pub owner_id: Option<WireId>,
}

impl HouseholdDto {
    pub fn into_model(self) -> Household {
        Household {
            id: HouseholdId(self.id.0),
            name: first([self.name, self.nombre]).unwrap_or_default(),
            description: first([self.description, self.descripcion]),
            currency: first([self.currency, self.currency_code, self.moneda])
                .unwrap_or_else(|| "USD".to_string()),
            representative_id: first([
                self.representative_id,
                self.representative_id_legacy,
                self.owner_id,
            ])
            .map(|id| UserId(id.0)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One entry of a member listing. The endpoint does not fix where the user id
/// lives, see [`MemberEntry::resolved_user_id`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberEntry {
    #[serde(default, rename = "userId")]
    pub user_id: Option<WireId>,
    #[serde(default, rename = "user_id")]
    pub user_id_legacy: Option<WireId>,
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(flatten)]
    pub household: HouseholdKeys,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub income: Option<Decimal>,
    #[serde(default, rename = "monthlyIncome")]
    pub monthly_income: Option<Decimal>,
    #[serde(default)]
    pub ingreso: Option<Decimal>,
}

impl MemberEntry {
    fn direct_user_id(&self) -> Option<WireId> {
        self.user_id.or(self.user_id_legacy)
    }

    /// Direct user id, then the generic `id`, then `user.id`.
    pub fn resolved_user_id(&self) -> Option<UserId> {
        self.direct_user_id()
            .or(self.id)
            .or_else(|| self.user.as_ref().and_then(|user| user.id))
            .map(|id| UserId(id.0))
    }

    pub fn into_model(self) -> HouseholdMember {
        let user_id = self.resolved_user_id();
        // `id` names the membership link only when the user id came from elsewhere.
        let membership_id = match (self.direct_user_id(), &self.user) {
            (None, None) => None,
            _ => self.id.map(|id| id.0),
        };
        let household_id = self.household.normalized_household_id();
        let (user_name, user_email) = self
            .user
            .map(|user| (user.name, user.email))
            .unwrap_or_default();

        HouseholdMember {
            membership_id,
            user_id,
            household_id,
            name: first([self.name, self.nombre, user_name]),
            email: self.email.or(user_email),
            income: first([self.income, self.monthly_income, self.ingreso]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillDto {
    pub id: WireId,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub monto: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "billDate")]
    pub bill_date: Option<String>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(flatten)]
    pub household: HouseholdKeys,
}

impl BillDto {
    pub fn into_model(self) -> Result<Bill, ApiError> {
        let amount =
            first([self.amount, self.monto, self.total]).ok_or_else(|| no_amount("bill", self.id))?;
        let date = first([self.date, self.bill_date, self.fecha]);
        Ok(Bill {
            id: BillId(self.id.0),
            description: first([self.description, self.descripcion]).unwrap_or_default(),
            amount,
            date: date.as_deref().and_then(parse_date),
            household_id: self.household.normalized_household_id(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContributionDto {
    pub id: WireId,
    #[serde(default, rename = "billId")]
    pub bill_id: Option<WireId>,
    #[serde(default, rename = "bill_id")]
    pub bill_id_legacy: Option<WireId>,
    #[serde(default)]
    pub bill: Option<IdRef>,
    #[serde(flatten)]
    pub household: HouseholdKeys,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default, rename = "splitStrategy")]
    pub split_strategy: Option<String>,
    #[serde(default, rename = "split_strategy")]
    pub split_strategy_legacy: Option<String>,
    #[serde(default, rename = "tipoDivision")]
    pub tipo_division: Option<String>,
    #[serde(default, rename = "dueDate")]
    pub due_date: Option<String>,
    #[serde(default, rename = "due_date")]
    pub due_date_legacy: Option<String>,
    #[serde(default, rename = "fechaLimite")]
    pub fecha_limite: Option<String>,
}

impl ContributionDto {
    pub fn into_model(self) -> Contribution {
        let bill_id = first([
            self.bill_id,
            self.bill_id_legacy,
            self.bill.as_ref().and_then(|bill| bill.id),
        ])
        .map(|id| BillId(id.0));
        let strategy = first([
            self.strategy,
            self.split_strategy,
            self.split_strategy_legacy,
            self.tipo_division,
        ]);
        let due_date = first([self.due_date, self.due_date_legacy, self.fecha_limite]);
        Contribution {
            id: ContributionId(self.id.0),
            bill_id,
            household_id: self.household.normalized_household_id(),
            description: first([self.description, self.descripcion]),
            strategy: strategy.as_deref().and_then(SplitStrategy::parse),
            due_date: due_date.as_deref().and_then(parse_date),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberContributionDto {
    pub id: WireId,
    #[serde(default, rename = "contributionId")]
    pub contribution_id: Option<WireId>,
    #[serde(default, rename = "contribution_id")]
    pub contribution_id_legacy: Option<WireId>,
    #[serde(default)]
    pub contribution: Option<IdRef>,
    #[serde(default, rename = "memberId")]
    pub member_id: Option<WireId>,
    #[serde(default, rename = "member_id")]
    pub member_id_legacy: Option<WireId>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<WireId>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default, rename = "amountOwed")]
    pub amount_owed: Option<Decimal>,
    #[serde(default)]
    pub monto: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default, rename = "paidAt")]
    pub paid_at: Option<String>,
    #[serde(default, rename = "paid_at")]
    pub paid_at_legacy: Option<String>,
    #[serde(default, rename = "fechaPago")]
    pub fecha_pago: Option<String>,
}

impl MemberContributionDto {
    pub fn into_model(self) -> Result<MemberContribution, ApiError> {
        let id = self.id;
        let contribution_id = first([
            self.contribution_id,
            self.contribution_id_legacy,
            self.contribution.as_ref().and_then(|contribution| contribution.id),
        ])
        .ok_or_else(|| {
            ApiError::Decode(format!("member contribution {} has no contribution id", id.0))
        })?;
        let member_id = first([self.member_id, self.member_id_legacy, self.user_id])
            .ok_or_else(|| {
                ApiError::Decode(format!("member contribution {} has no member id", id.0))
            })?;
        let amount = first([self.amount, self.amount_owed, self.monto])
            .ok_or_else(|| no_amount("member contribution", id))?;
        let paid_at = first([self.paid_at, self.paid_at_legacy, self.fecha_pago]);

        Ok(MemberContribution {
            id: MemberContributionId(id.0),
            contribution_id: ContributionId(contribution_id.0),
            member_id: UserId(member_id.0),
            amount,
            status: first([self.status, self.estado]),
            paid_at: paid_at.as_deref().and_then(parse_timestamp),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptDto {
    pub id: WireId,
    #[serde(default, rename = "memberContributionId")]
    pub member_contribution_id: Option<WireId>,
    #[serde(default, rename = "member_contribution_id")]
    pub member_contribution_id_legacy: Option<WireId>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(default, rename = "file_name")]
    pub file_name_legacy: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "fileUrl")]
    pub file_url: Option<String>,
    #[serde(default, rename = "storageUrl")]
    pub storage_url: Option<String>,
    #[serde(default, rename = "file_url")]
    pub file_url_legacy: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default, rename = "uploadedAt")]
    pub uploaded_at: Option<String>,
    #[serde(default, rename = "uploaded_at")]
    pub uploaded_at_legacy: Option<String>,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, rename = "reviewedBy")]
    pub reviewed_by: Option<WireId>,
    #[serde(default, rename = "reviewed_by")]
    pub reviewed_by_legacy: Option<WireId>,
    #[serde(default, rename = "reviewerId")]
    pub reviewer_id: Option<WireId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub notas: Option<String>,
}

impl ReceiptDto {
    /// `parent` fills in the member contribution when the listing omits it.
    pub fn into_model(
        self,
        parent: Option<MemberContributionId>,
    ) -> Result<PaymentReceipt, ApiError> {
        let member_contribution_id =
            first([self.member_contribution_id, self.member_contribution_id_legacy])
                .map(|id| MemberContributionId(id.0))
                .or(parent)
                .ok_or_else(|| {
                    ApiError::Decode(format!(
                        "receipt {} has no member contribution id",
                        self.id.0
                    ))
                })?;
        let status = first([self.status, self.estado]);
        let uploaded_at = first([self.uploaded_at, self.uploaded_at_legacy, self.created_at]);

        Ok(PaymentReceipt {
            id: ReceiptId(self.id.0),
            member_contribution_id,
            filename: first([self.filename, self.file_name, self.file_name_legacy])
                .unwrap_or_default(),
            url: first([self.url, self.file_url, self.storage_url, self.file_url_legacy]),
            status: ReceiptStatus::parse(status.as_deref()),
            uploaded_at: uploaded_at.as_deref().and_then(parse_timestamp),
            reviewed_by: first([self.reviewed_by, self.reviewed_by_legacy, self.reviewer_id])
                .map(|id| UserId(id.0)),
            notes: first([self.notes, self.notas]),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponseDto {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default, rename = "access_token")]
    pub access_token_legacy: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<WireId>,
    #[serde(default, rename = "user_id")]
    pub user_id_legacy: Option<WireId>,
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl AuthResponseDto {
    pub fn into_model(self) -> Result<AuthSession, ApiError> {
        let token = first([self.token, self.access_token, self.access_token_legacy])
            .ok_or_else(|| ApiError::Decode("login response has no token".to_string()))?;
        let user_id = first([
            self.user_id,
            self.user_id_legacy,
            self.id,
            self.user.as_ref().and_then(|user| user.id),
        ])
        .ok_or_else(|| ApiError::Decode("login response has no user id".to_string()))?;
        let role = first([self.role, self.rol]);
        Ok(AuthSession {
            token,
            role: role.as_deref().map(Role::parse).unwrap_or(Role::Member),
            user_id: UserId(user_id.0),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHouseholdRequest {
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
}

impl From<NewHousehold> for CreateHouseholdRequest {
    fn from(household: NewHousehold) -> Self {
        Self {
            name: household.name,
            description: household.description,
            currency: household.currency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddMemberRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub household_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
}

impl From<NewBill> for CreateBillRequest {
    fn from(bill: NewBill) -> Self {
        Self {
            household_id: bill.household_id.0,
            description: bill.description,
            amount: bill.amount,
            date: bill.date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContributionRequest {
    pub household_id: i64,
    pub bill_id: Option<i64>,
    pub description: String,
    pub split_strategy: &'static str,
    pub due_date: NaiveDate,
}

impl From<NewContribution> for CreateContributionRequest {
    fn from(contribution: NewContribution) -> Self {
        Self {
            household_id: contribution.household_id.0,
            bill_id: contribution.bill_id.map(|id| id.0),
            description: contribution.description,
            split_strategy: contribution.strategy.as_str(),
            due_date: contribution.due_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectReceiptRequest {
    pub notes: Option<String>,
}

/// Accepts `2024-03-01` as well as full timestamps, keeping the date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

/// RFC 3339 first; naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn legacy_household_key_is_used_when_alone() {
        let keys: HouseholdKeys = serde_json::from_value(json!({ "household_id": 12 })).unwrap();
        assert_eq!(keys.normalized_household_id(), Some(HouseholdId(12)));
    }

    #[test]
    fn flat_household_key_wins_over_legacy() {
        let keys: HouseholdKeys =
            serde_json::from_value(json!({ "householdId": 4, "household_id": 12 })).unwrap();
        assert_eq!(keys.normalized_household_id(), Some(HouseholdId(4)));
    }

    #[test]
    fn nested_household_wins_over_legacy() {
        let keys: HouseholdKeys = serde_json::from_value(
            json!({ "household": { "id": "8", "name": "Casa" }, "household_id": 12 }),
        )
        .unwrap();
        assert_eq!(keys.normalized_household_id(), Some(HouseholdId(8)));
    }

    #[test]
    fn bill_resolves_household_through_flattened_keys() {
        let bill: BillDto = serde_json::from_value(json!({
            "id": 3,
            "descripcion": "Luz",
            "monto": "120.50",
            "fecha": "2024-05-02T10:00:00",
            "household": { "id": 9 }
        }))
        .unwrap();
        let bill = bill.into_model().unwrap();
        assert_eq!(bill.household_id, Some(HouseholdId(9)));
        assert_eq!(bill.amount, Decimal::new(12050, 2));
        assert_eq!(bill.date, NaiveDate::from_ymd_opt(2024, 5, 2));
    }

    #[test]
    fn member_user_id_prefers_direct_field() {
        let entry: MemberEntry =
            serde_json::from_value(json!({ "userId": 5, "id": 40, "user": { "id": 6 } })).unwrap();
        assert_eq!(entry.resolved_user_id(), Some(UserId(5)));
        let member = entry.into_model();
        assert_eq!(member.membership_id, Some(40));
    }

    #[test]
    fn member_user_id_falls_back_to_generic_id() {
        let entry: MemberEntry =
            serde_json::from_value(json!({ "id": 7, "name": "Ana" })).unwrap();
        let member = entry.into_model();
        assert_eq!(member.user_id, Some(UserId(7)));
        assert_eq!(member.membership_id, None);
    }

    #[test]
    fn member_user_id_falls_back_to_nested_user() {
        let entry: MemberEntry = serde_json::from_value(json!({
            "user": { "id": 11, "name": "Luis", "email": "luis@example.com" },
            "household_id": 2
        }))
        .unwrap();
        let member = entry.into_model();
        assert_eq!(member.user_id, Some(UserId(11)));
        assert_eq!(member.household_id, Some(HouseholdId(2)));
        assert_eq!(member.email.as_deref(), Some("luis@example.com"));
    }

    #[test]
    fn list_envelope_accepts_all_wrappers() {
        for body in [json!([1, 2]), json!({ "data": [1, 2] }), json!({ "items": [1, 2] })] {
            let list: ListEnvelope<i64> = serde_json::from_value(body).unwrap();
            assert_eq!(list.into_vec(), vec![1, 2]);
        }
    }

    #[test]
    fn member_contribution_requires_parent_ids() {
        let dto: MemberContributionDto =
            serde_json::from_value(json!({ "id": 1, "amount": 10, "memberId": 2 })).unwrap();
        assert!(matches!(dto.into_model(), Err(ApiError::Decode(_))));
    }

    #[test]
    fn member_contribution_keeps_raw_status() {
        let dto: MemberContributionDto = serde_json::from_value(json!({
            "id": 1,
            "contribution": { "id": 30 },
            "member_id": 2,
            "monto": 25.5,
            "estado": "PAGADO",
            "paidAt": "2024-06-01T12:00:00Z"
        }))
        .unwrap();
        let row = dto.into_model().unwrap();
        assert_eq!(row.contribution_id, ContributionId(30));
        assert_eq!(row.status.as_deref(), Some("PAGADO"));
        assert!(row.paid_at.is_some());
    }

    #[test]
    fn receipt_inherits_parent_when_missing() {
        let dto: ReceiptDto = serde_json::from_value(
            json!({ "id": 1, "fileName": "voucher.png", "status": "pending" }),
        )
        .unwrap();
        let receipt = dto.into_model(Some(MemberContributionId(77))).unwrap();
        assert_eq!(receipt.member_contribution_id, MemberContributionId(77));
        assert_eq!(receipt.status, ReceiptStatus::Pending);
    }

    #[test]
    fn auth_response_reads_nested_user() {
        let dto: AuthResponseDto = serde_json::from_value(json!({
            "accessToken": "abc",
            "rol": "REPRESENTANTE",
            "user": { "id": 3 }
        }))
        .unwrap();
        let auth = dto.into_model().unwrap();
        assert_eq!(auth.user_id, UserId(3));
        assert_eq!(auth.role, Role::Representative);
    }

    #[test]
    fn receipt_with_both_timestamps_keeps_uploaded_at() {
        let dto: ReceiptDto = serde_json::from_value(json!({
            "id": 1,
            "status": "PENDING",
            "uploadedAt": "2024-03-05T09:00:00Z",
            "createdAt": "2024-03-01T09:00:00Z",
            "fileName": "voucher.jpg",
            "file_name": "old.jpg",
            "estado": "APROBADO"
        }))
        .unwrap();
        let receipt = dto.into_model(Some(MemberContributionId(2))).unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Pending);
        assert_eq!(receipt.filename, "voucher.jpg");
        assert_eq!(
            receipt.uploaded_at.map(|at| at.to_rfc3339()),
            Some("2024-03-05T09:00:00+00:00".to_string())
        );
    }

    #[test]
    fn receipt_falls_back_to_created_at() {
        let dto: ReceiptDto = serde_json::from_value(json!({
            "id": 1,
            "member_contribution_id": 4,
            "createdAt": "2024-03-01T09:00:00Z"
        }))
        .unwrap();
        let receipt = dto.into_model(None).unwrap();
        assert_eq!(receipt.member_contribution_id, MemberContributionId(4));
        assert!(receipt.uploaded_at.is_some());
    }

    #[test]
    fn member_contribution_with_member_and_user_ids_prefers_member() {
        let dto: MemberContributionDto = serde_json::from_value(json!({
            "id": 1,
            "contributionId": 30,
            "contribution_id": 31,
            "memberId": 2,
            "userId": 9,
            "amount": "12.00",
            "monto": "99.00",
            "status": "PENDING",
            "estado": "PAGADO"
        }))
        .unwrap();
        let row = dto.into_model().unwrap();
        assert_eq!(row.member_id, UserId(2));
        assert_eq!(row.contribution_id, ContributionId(30));
        assert_eq!(row.amount, Decimal::new(1200, 2));
        assert_eq!(row.status.as_deref(), Some("PENDING"));
    }

    #[test]
    fn member_contribution_without_amount_is_a_decode_error() {
        let dto: MemberContributionDto = serde_json::from_value(
            json!({ "id": 1, "contributionId": 30, "memberId": 2 }),
        )
        .unwrap();
        assert!(matches!(dto.into_model(), Err(ApiError::Decode(_))));
    }

    #[test]
    fn auth_response_with_id_and_user_id_prefers_user_id() {
        let dto: AuthResponseDto = serde_json::from_value(json!({
            "token": "abc",
            "accessToken": "ignored",
            "id": 40,
            "userId": 3,
            "role": "MEMBER",
            "rol": "REPRESENTANTE"
        }))
        .unwrap();
        let auth = dto.into_model().unwrap();
        assert_eq!(auth.token, "abc");
        assert_eq!(auth.user_id, UserId(3));
        assert_eq!(auth.role, Role::Member);
    }

    #[test]
    fn contribution_with_every_strategy_spelling_uses_the_first() {
        let dto: ContributionDto = serde_json::from_value(json!({
            "id": 5,
            "strategy": "INCOME_BASED",
            "splitStrategy": "EQUAL",
            "tipoDivision": "EQUAL",
            "dueDate": "2024-07-01",
            "fechaLimite": "2024-08-01",
            "billId": 3,
            "bill": { "id": 4 }
        }))
        .unwrap();
        let contribution = dto.into_model();
        assert_eq!(contribution.strategy, Some(SplitStrategy::IncomeBased));
        assert_eq!(contribution.due_date, NaiveDate::from_ymd_opt(2024, 7, 1));
        assert_eq!(contribution.bill_id, Some(BillId(3)));
    }

    #[test]
    fn household_with_both_names_prefers_name() {
        let dto: HouseholdDto = serde_json::from_value(json!({
            "id": 2,
            "name": "Casa",
            "nombre": "Hogar",
            "currencyCode": "GTQ",
            "moneda": "USD"
        }))
        .unwrap();
        let household = dto.into_model();
        assert_eq!(household.name, "Casa");
        assert_eq!(household.currency, "GTQ");
    }

    #[test]
    fn timestamps_without_offset_are_utc() {
        let parsed = parse_timestamp("2024-01-02 03:04:05").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }
}
