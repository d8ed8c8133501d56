//! Back-office CRUD routes.
//!
//! Every resource gets the same five handlers, mounted under its collection
//! name: `GET /{collection}` (paginated), `POST /{collection}`,
//! `GET|PUT|DELETE /{collection}/:id`. Bodies are validated before any write.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;
use validator::Validate;

use crate::api::{ApiResult, AppJson, AppPath, AppQuery, AppState, ListParams, PaginatedResponse};
use crate::domain::aggregates::{Company, Coupon, Offer, Product, User};
use crate::storage::{Document, Record, Repository};
use crate::StorefrontError;

pub trait AdminEntity: Document + Validate {
    /// Canonical form stored and looked up; applied before validation.
    fn normalize(&mut self) {}

    /// Field that must be unique within the collection, with this entity's value.
    fn unique_key(&self) -> Option<(&'static str, String)> { None }
}

impl AdminEntity for Product {}
impl AdminEntity for Offer {}
impl AdminEntity for Company {}

impl AdminEntity for Coupon {
    fn normalize(&mut self) { self.code = self.code.trim().to_string(); }

    fn unique_key(&self) -> Option<(&'static str, String)> { Some(("codigo", self.code.clone())) }
}

impl AdminEntity for User {
    fn normalize(&mut self) { self.email = self.email.trim().to_string(); }

    fn unique_key(&self) -> Option<(&'static str, String)> { Some(("email", self.email.clone())) }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(resource::<Product>())
        .merge(resource::<Coupon>())
        .merge(resource::<Offer>())
        .merge(resource::<Company>())
        .merge(resource::<User>())
}

fn resource<T: AdminEntity>() -> Router<AppState> {
    let base = format!("/{}", T::COLLECTION);
    Router::new()
        .route(&base, get(list::<T>).post(create::<T>))
        .route(&format!("{base}/:id"), get(fetch::<T>).put(update::<T>).delete(remove::<T>))
}

fn repo<T: AdminEntity>(s: &AppState) -> Repository<T> { Repository::new(s.store.clone()) }

fn not_found<T: Document>(id: &str) -> StorefrontError { StorefrontError::NotFound(format!("{} {id}", T::COLLECTION)) }

async fn ensure_unique<T: AdminEntity>(repo: &Repository<T>, body: &T, id: Option<&str>) -> ApiResult<()> {
    let Some((field, value)) = body.unique_key() else { return Ok(()) };
    match repo.find_by(field, &value).await? {
        Some(existing) if Some(existing.id.as_str()) != id => {
            Err(StorefrontError::Conflict(format!("{field} '{value}' already exists in {}", T::COLLECTION)).into())
        }
        _ => Ok(()),
    }
}

async fn list<T: AdminEntity>(State(s): State<AppState>, AppQuery(p): AppQuery<ListParams>) -> ApiResult<Json<PaginatedResponse<Record<T>>>> {
    Ok(Json(p.paginate(repo::<T>(&s).list().await?)))
}

async fn fetch<T: AdminEntity>(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<Json<Record<T>>> {
    let data = repo::<T>(&s).get(&id).await?.ok_or_else(|| not_found::<T>(&id))?;
    Ok(Json(Record { id, data }))
}

async fn create<T: AdminEntity>(State(s): State<AppState>, AppJson(mut body): AppJson<T>) -> ApiResult<(StatusCode, Json<Record<T>>)> {
    body.normalize();
    body.validate()?;
    let repo = repo::<T>(&s);
    ensure_unique(&repo, &body, None).await?;
    let record = repo.insert(body).await?;
    info!(collection = T::COLLECTION, id = %record.id, "created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update<T: AdminEntity>(State(s): State<AppState>, AppPath(id): AppPath<String>, AppJson(mut body): AppJson<T>) -> ApiResult<Json<Record<T>>> {
    body.normalize();
    body.validate()?;
    let repo = repo::<T>(&s);
    if repo.get(&id).await?.is_none() {
        return Err(not_found::<T>(&id).into());
    }
    ensure_unique(&repo, &body, Some(&id)).await?;
    repo.put(&id, &body).await?;
    info!(collection = T::COLLECTION, %id, "updated");
    Ok(Json(Record { id, data: body }))
}

async fn remove<T: AdminEntity>(State(s): State<AppState>, AppPath(id): AppPath<String>) -> ApiResult<StatusCode> {
    if !repo::<T>(&s).delete(&id).await? {
        return Err(not_found::<T>(&id).into());
    }
    info!(collection = T::COLLECTION, %id, "deleted");
    Ok(StatusCode::NO_CONTENT)
}
