use crate::errors::OrchestratorResult;
use crate::models::{ApiResponse, CreatePaymentRequest, Payment};
use crate::repository::PaymentStore;
use crate::saga::SagaService;
use axum::{extract::State, http::StatusCode, Json};
use saga_common::bus::Publisher;
use std::sync::Arc;

pub type AppSaga = SagaService<PaymentStore, Publisher>;

#[derive(Clone)]
pub struct AppState {
    pub saga: Arc<AppSaga>,
}

/// `POST /payments` — validates, persists, and publishes `payments.created`.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> OrchestratorResult<(StatusCode, Json<ApiResponse<Payment>>)> {
    tracing::info!(customer_id = %payload.customer_id, amount = %payload.amount, "Creating payment");

    let payment = state
        .saga
        .create_payment(
            payload.amount,
            &payload.currency,
            &payload.method,
            &payload.customer_id,
        )
        .await?;

    tracing::info!(payment_id = %payment.id, "Payment created successfully");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(payment))))
}

/// `GET /payments/:id`
pub async fn get_payment(
    State(state): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> OrchestratorResult<Json<ApiResponse<Payment>>> {
    let payment = state.saga.get_payment(&id).await?;

    Ok(Json(ApiResponse::success(payment)))
}

pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
