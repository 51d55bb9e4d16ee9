use axum::{Extension, Json, Router, response::IntoResponse, routing::get};

use std::sync::Arc;

use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

/// Tenant-scoped endpoints; the tenant comes from `X-Business-Id`.
pub fn router() -> Router {
    Router::new().route("/business/whoami", get(whoami))
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    let business = services.directory.tenant(tenant.tenant_id());
    Json(serde_json::json!({
        "tenant_id": tenant.tenant_id().to_string(),
        "business_name": business.map(|b| b.name),
        "principal_id": principal.principal().id.to_string(),
        "role": principal.principal().role.as_str(),
    }))
}
