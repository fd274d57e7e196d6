// handlers/protected/sites.rs - /api/sites

use axum::{
    extract::{Path, State},
    Extension,
};

use super::super::parse_id;
use crate::app::AppState;
use crate::database::models::{Paginated, Site, SiteDetail};
use crate::dto::{CreateSiteRequest, PageRequest, UpdateSiteRequest};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::validation::{ValidatedJson, ValidatedQuery};

/// GET /api/sites
pub async fn sites_list(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<PageRequest>,
) -> ApiResult<Paginated<Site>> {
    let window = query.window();
    let (sites, total) = state.store.list_sites(None, window).await?;
    Ok(ApiResponse::success(window.paginate(sites, total)))
}

/// GET /api/sites/manager/:managerId
pub async fn sites_by_manager(
    State(state): State<AppState>,
    Path(manager_id): Path<String>,
    ValidatedQuery(query): ValidatedQuery<PageRequest>,
) -> ApiResult<Paginated<Site>> {
    let manager_id = parse_id(&manager_id, "Manager")?;
    let window = query.window();
    let (sites, total) = state.store.list_sites(Some(manager_id), window).await?;
    Ok(ApiResponse::success(window.paginate(sites, total)))
}

/// GET /api/sites/:id with the site's manager, operations, documents and checklists
pub async fn site_get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SiteDetail> {
    let id = parse_id(&id, "Site")?;
    let site = state
        .store
        .find_site(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    let manager = state.store.find_by_id(site.manager_id).await?;
    let operations = state.store.operations_for_site(id).await?;
    let documents = state.store.documents_for_site(id).await?;
    let checklists = state.store.checklists_for_site(id).await?;

    Ok(ApiResponse::success(SiteDetail {
        site,
        manager,
        operations,
        documents,
        checklists,
    }))
}

/// POST /api/sites (ADMIN, MANAGER)
pub async fn site_create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateSiteRequest>,
) -> ApiResult<Site> {
    let site = state.store.create_site(body.into_new_site()?).await?;
    tracing::info!(site_id = %site.id, user_id = %auth_user.id, "Created site");
    Ok(ApiResponse::created(site))
}

/// PUT /api/sites/:id (ADMIN, MANAGER)
pub async fn site_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateSiteRequest>,
) -> ApiResult<Site> {
    let id = parse_id(&id, "Site")?;
    let patch = body.into_patch()?;
    let site = state
        .store
        .update_site(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;
    Ok(ApiResponse::success(site))
}

/// DELETE /api/sites/:id (ADMIN). Removes the site's operations and
/// documents, including the stored files.
pub async fn site_delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id, "Site")?;
    let keys = state
        .store
        .delete_site(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    for key in &keys {
        // Rows are gone already; an orphaned file is logged, not surfaced
        if let Err(e) = state.objects.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete stored document");
        }
    }

    tracing::info!(site_id = %id, user_id = %auth_user.id, documents = keys.len(), "Deleted site");
    Ok(ApiResponse::<()>::no_content())
}
