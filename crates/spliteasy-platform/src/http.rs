use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use spliteasy_core::{
    ApiError, ApiResult, AuthSession, Bill, BillId, Contribution, ContributionId, Household,
    HouseholdId, HouseholdMember, MemberContribution, MemberContributionFilter,
    MemberContributionId, NewBill, NewContribution, NewHousehold, PaymentReceipt, ReceiptId,
    ReceiptUpload, Role, SplitBackend,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::contracts::{
    AddMemberRequest, AuthResponseDto, BillDto, ContributionDto, CreateBillRequest,
    CreateContributionRequest, CreateHouseholdRequest, ErrorBody, HouseholdDto, ListEnvelope,
    LoginRequest, MemberContributionDto, MemberEntry, ReceiptDto, RegisterRequest,
    RejectReceiptRequest,
};

/// REST client for the SplitEasy backend.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let request = self
            .request(Method::POST, "/auth/login", false)?
            .json(&LoginRequest { email, password });
        let response: AuthResponseDto = self.execute(request, "/auth/login").await?;
        let auth = response.into_model()?;
        info!(user_id = %auth.user_id, role = auth.role.as_str(), "signed in");
        Ok(auth)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> ApiResult<AuthSession> {
        let body = RegisterRequest {
            name,
            email,
            password,
            role: role.as_str(),
        };
        let request = self
            .request(Method::POST, "/auth/register", false)?
            .json(&body);
        let response: AuthResponseDto = self.execute(request, "/auth/register").await?;
        response.into_model()
    }

    fn request(&self, method: Method, path: &str, authenticated: bool) -> ApiResult<RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, url)
            .header("X-Request-Id", Uuid::new_v4().to_string());
        if authenticated {
            let token = self.bearer_token.as_ref().ok_or(ApiError::Unauthenticated)?;
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> ApiResult<T> {
        let response = self.send(request, path).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::Decode(format!("{path}: {err}")))
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> ApiResult<Response> {
        let request = request
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        let method = request.method().clone();
        let request_id = request
            .headers()
            .get("X-Request-Id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        debug!(%method, path, request_id, "sending request");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Option<ErrorBody> = response.json().await.ok();
        warn!(%method, path, request_id, status = status.as_u16(), "request failed");
        Err(ApiError::http(
            status.as_u16(),
            body.and_then(ErrorBody::into_message),
        ))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let request = self.request(Method::GET, path, true)?;
        self.execute(request, path).await
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Vec<T>> {
        let request = self.request(Method::GET, path, true)?.query(query);
        let list: ListEnvelope<T> = self.execute(request, path).await?;
        Ok(list.into_vec())
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.request(method, path, true)?.json(body);
        self.execute(request, path).await
    }

    /// Flat member listing, used when the per-household route is missing.
    async fn list_all_members(&self, household_id: HouseholdId) -> ApiResult<Vec<HouseholdMember>> {
        let entries: Vec<MemberEntry> = self.get_list("/members", &[]).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.household.normalized_household_id() == Some(household_id))
            .map(MemberEntry::into_model)
            .collect())
    }
}

fn household_query(household_id: Option<HouseholdId>) -> Vec<(&'static str, String)> {
    household_id
        .map(|id| vec![("householdId", id.to_string())])
        .unwrap_or_default()
}

#[async_trait]
impl SplitBackend for ApiClient {
    async fn list_households(&self) -> ApiResult<Vec<Household>> {
        let households: Vec<HouseholdDto> = self.get_list("/households", &[]).await?;
        Ok(households.into_iter().map(HouseholdDto::into_model).collect())
    }

    async fn get_household(&self, id: HouseholdId) -> ApiResult<Household> {
        let household: HouseholdDto = self.get(&format!("/households/{id}")).await?;
        Ok(household.into_model())
    }

    async fn create_household(&self, household: NewHousehold) -> ApiResult<Household> {
        let body = CreateHouseholdRequest::from(household);
        let created: HouseholdDto = self.send_json(Method::POST, "/households", &body).await?;
        info!(household_id = created.id.0, "household created");
        Ok(created.into_model())
    }

    async fn list_household_members(
        &self,
        household_id: HouseholdId,
    ) -> ApiResult<Vec<HouseholdMember>> {
        let path = format!("/households/{household_id}/members");
        match self.get_list::<MemberEntry>(&path, &[]).await {
            Ok(entries) => Ok(entries
                .into_iter()
                .map(|entry| {
                    let mut member = entry.into_model();
                    member.household_id.get_or_insert(household_id);
                    member
                })
                .collect()),
            Err(err) if err.is_not_found() => {
                debug!(%household_id, "member route missing, filtering flat member list");
                self.list_all_members(household_id).await
            }
            Err(err) => Err(err),
        }
    }

    async fn add_member(
        &self,
        household_id: HouseholdId,
        email: &str,
    ) -> ApiResult<HouseholdMember> {
        let path = format!("/households/{household_id}/members");
        let entry: MemberEntry = self
            .send_json(Method::POST, &path, &AddMemberRequest { email })
            .await?;
        let mut member = entry.into_model();
        member.household_id.get_or_insert(household_id);
        Ok(member)
    }

    async fn list_bills(&self, household_id: Option<HouseholdId>) -> ApiResult<Vec<Bill>> {
        let bills: Vec<BillDto> = self.get_list("/bills", &household_query(household_id)).await?;
        bills.into_iter().map(BillDto::into_model).collect()
    }

    async fn get_bill(&self, id: BillId) -> ApiResult<Bill> {
        let bill: BillDto = self.get(&format!("/bills/{id}")).await?;
        bill.into_model()
    }

    async fn create_bill(&self, bill: NewBill) -> ApiResult<Bill> {
        let body = CreateBillRequest::from(bill);
        let created: BillDto = self.send_json(Method::POST, "/bills", &body).await?;
        created.into_model()
    }

    async fn list_contributions(
        &self,
        household_id: Option<HouseholdId>,
    ) -> ApiResult<Vec<Contribution>> {
        let contributions: Vec<ContributionDto> = self
            .get_list("/contributions", &household_query(household_id))
            .await?;
        Ok(contributions
            .into_iter()
            .map(ContributionDto::into_model)
            .collect())
    }

    async fn get_contribution(&self, id: ContributionId) -> ApiResult<Contribution> {
        let contribution: ContributionDto = self.get(&format!("/contributions/{id}")).await?;
        Ok(contribution.into_model())
    }

    async fn create_contribution(
        &self,
        contribution: NewContribution,
    ) -> ApiResult<Contribution> {
        let body = CreateContributionRequest::from(contribution);
        let created: ContributionDto = self.send_json(Method::POST, "/contributions", &body).await?;
        Ok(created.into_model())
    }

    async fn list_member_contributions(
        &self,
        filter: &MemberContributionFilter,
    ) -> ApiResult<Vec<MemberContribution>> {
        let mut query = household_query(filter.household_id);
        if let Some(member_id) = filter.member_id {
            query.push(("memberId", member_id.to_string()));
        }
        if let Some(contribution_id) = filter.contribution_id {
            query.push(("contributionId", contribution_id.to_string()));
        }
        let rows: Vec<MemberContributionDto> =
            self.get_list("/member-contributions", &query).await?;
        rows.into_iter()
            .map(MemberContributionDto::into_model)
            .collect()
    }

    async fn get_member_contribution(
        &self,
        id: MemberContributionId,
    ) -> ApiResult<MemberContribution> {
        let row: MemberContributionDto = self.get(&format!("/member-contributions/{id}")).await?;
        row.into_model()
    }

    async fn list_receipts(
        &self,
        member_contribution_id: MemberContributionId,
    ) -> ApiResult<Vec<PaymentReceipt>> {
        let path = format!("/member-contributions/{member_contribution_id}/receipts");
        let receipts: Vec<ReceiptDto> = self.get_list(&path, &[]).await?;
        receipts
            .into_iter()
            .map(|receipt| receipt.into_model(Some(member_contribution_id)))
            .collect()
    }

    async fn upload_receipt(
        &self,
        member_contribution_id: MemberContributionId,
        upload: ReceiptUpload,
    ) -> ApiResult<PaymentReceipt> {
        let path = format!("/member-contributions/{member_contribution_id}/receipts");
        let size = upload.bytes.len();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.filename)
            .mime_str(&upload.content_type)
            .map_err(|err| ApiError::Invalid(format!("bad content type: {err}")))?;
        let request = self
            .request(Method::POST, &path, true)?
            .multipart(Form::new().part("file", part));
        let receipt: ReceiptDto = self.execute(request, &path).await?;
        info!(%member_contribution_id, size, "receipt uploaded");
        receipt.into_model(Some(member_contribution_id))
    }

    async fn approve_receipt(&self, receipt_id: ReceiptId) -> ApiResult<PaymentReceipt> {
        let path = format!("/receipts/{receipt_id}/approve");
        let request = self.request(Method::PUT, &path, true)?;
        let receipt: ReceiptDto = self.execute(request, &path).await?;
        info!(%receipt_id, "receipt approved");
        receipt.into_model(None)
    }

    async fn reject_receipt(
        &self,
        receipt_id: ReceiptId,
        notes: Option<String>,
    ) -> ApiResult<PaymentReceipt> {
        let path = format!("/receipts/{receipt_id}/reject");
        let receipt: ReceiptDto = self
            .send_json(Method::PUT, &path, &RejectReceiptRequest { notes })
            .await?;
        info!(%receipt_id, "receipt rejected");
        receipt.into_model(None)
    }
}
