use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    commands::{
        enroll::{EnrollRequest, EnrollmentResponse, MemberInput},
        preview_enrollment::PreviewEnrollmentRequest,
        DomainLogic, EnrollmentTerms, Error,
    },
    domain::{enrollment::EnrollmentPreview, plan::ContractTerm, voucher::Discount, NewMember},
    ports::{
        database::DatabasePort, member::MemberPort, notification::NotificationPort,
        plan::PlanCatalogPort, voucher::VoucherPort,
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPreviewRequest {
    pub plan_id: Uuid,
    #[serde(default)]
    pub contract_term: ContractTerm,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub existing_member_id: Option<Uuid>,
}

/// Enrollment of either a known member (`memberId`) or a new one (`member`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub plan_id: Uuid,
    #[serde(default)]
    pub contract_term: ContractTerm,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub member_id: Option<Uuid>,
    #[serde(default)]
    pub member: Option<NewMember>,
    /// Defaults to the server's current date
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
    #[serde(default = "enabled")]
    pub create_contract: bool,
    #[serde(default = "enabled")]
    pub create_invoice: bool,
    #[serde(default)]
    pub expected_total: Option<Decimal>,
    #[serde(default)]
    pub staff_notes: Option<String>,
}

fn enabled() -> bool {
    true
}

impl TryFrom<EnrollmentRequest> for EnrollRequest {
    type Error = Error;

    fn try_from(body: EnrollmentRequest) -> Result<Self, Self::Error> {
        let member = match (body.member_id, body.member) {
            (Some(member_id), None) => MemberInput::Existing(member_id),
            (None, Some(member)) => MemberInput::New(member),
            (Some(_), Some(_)) => {
                return Err(Error::Validation(
                    "provide either memberId or member, not both".into(),
                ))
            }
            (None, None) => {
                return Err(Error::Validation("memberId or member is required".into()))
            }
        };

        Ok(Self {
            terms: EnrollmentTerms {
                plan_id: body.plan_id,
                contract_term: body.contract_term,
                voucher_code: body.voucher_code,
                discount: body.discount,
            },
            member,
            start_date: body.start_date,
            auto_renew: body.auto_renew,
            paid_amount: body.paid_amount,
            create_contract: body.create_contract,
            create_invoice: body.create_invoice,
            expected_total: body.expected_total,
            staff_notes: body.staff_notes,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Command(#[from] Error),
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::Command(Error::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Command(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Command(Error::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Command(Error::EnrollmentFailed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Command(Error::Adapter(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Command(err) => err.code(),
            ApiError::InvalidBody(_) => "VALIDATION_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Router exposing enrollment preview and commit
pub fn router<C, V, M, D, N>(logic: DomainLogic<C, V, M, D, N>) -> Router
where
    C: PlanCatalogPort + Send + Sync + 'static,
    V: VoucherPort + Send + Sync + 'static,
    M: MemberPort + Send + Sync + 'static,
    D: DatabasePort + Send + Sync + 'static,
    N: NotificationPort + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/enrollments/preview", post(preview_handler::<C, V, M, D, N>))
        .route("/enrollments", post(enroll_handler::<C, V, M, D, N>))
        .with_state(logic)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn preview_handler<C, V, M, D, N>(
    State(logic): State<DomainLogic<C, V, M, D, N>>,
    payload: Result<Json<EnrollmentPreviewRequest>, JsonRejection>,
) -> Result<Json<EnrollmentPreview>, ApiError>
where
    C: PlanCatalogPort + Send + Sync + 'static,
    V: VoucherPort + Send + Sync + 'static,
    M: MemberPort + Send + Sync + 'static,
    D: DatabasePort + Send + Sync + 'static,
    N: NotificationPort + Send + Sync + 'static,
{
    let Json(body) = payload?;
    let req = PreviewEnrollmentRequest {
        terms: EnrollmentTerms {
            plan_id: body.plan_id,
            contract_term: body.contract_term,
            voucher_code: body.voucher_code,
            discount: body.discount,
        },
        existing_member_id: body.existing_member_id,
    };

    let preview = logic.oneshot(req).await?;
    Ok(Json(preview))
}

async fn enroll_handler<C, V, M, D, N>(
    State(logic): State<DomainLogic<C, V, M, D, N>>,
    payload: Result<Json<EnrollmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError>
where
    C: PlanCatalogPort + Send + Sync + 'static,
    V: VoucherPort + Send + Sync + 'static,
    M: MemberPort + Send + Sync + 'static,
    D: DatabasePort + Send + Sync + 'static,
    N: NotificationPort + Send + Sync + 'static,
{
    let Json(body) = payload?;
    let req = EnrollRequest::try_from(body)?;

    let enrollment = logic.oneshot(req).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}
