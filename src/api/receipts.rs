//! Receipt and report routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::{ApiResult, AppJson, AppPath, AppQuery, AppState, ListParams, PaginatedResponse};
use crate::domain::aggregates::{DateRange, NewReceipt, Receipt, SalesReport};
use crate::storage::Record;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recibos", get(list_receipts).post(create_receipt))
        .route("/recibos/:id", get(get_receipt).delete(delete_receipt))
        .route("/reportes/ventas", get(sales_report))
}

async fn create_receipt(State(s): State<AppState>, AppJson(r): AppJson<NewReceipt>) -> ApiResult<(StatusCode, Json<Record<Receipt>>)> {
    Ok((StatusCode::CREATED, Json(s.receipts.record(r).await?)))
}

async fn list_receipts(State(s): State<AppState>, AppQuery(p): AppQuery<ListParams>) -> ApiResult<Json<PaginatedResponse<Record<Receipt>>>> {
    Ok(Json(p.paginate(s.receipts.list().await?)))
}

async fn get_receipt(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<Record<Receipt>>> {
    Ok(Json(s.receipts.get(&id).await?))
}

async fn delete_receipt(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<StatusCode> {
    s.receipts.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn sales_report(State(s): State<AppState>, AppQuery(range): AppQuery<DateRange>) -> ApiResult<Json<SalesReport>> {
    Ok(Json(s.receipts.sales_report(range).await?))
}
