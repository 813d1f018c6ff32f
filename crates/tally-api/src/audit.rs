//! Builders for the audit entries written alongside admin mutations. The
//! storage layer appends them inside the mutation's transaction, after the
//! mutation itself, so a failed mutation never leaves an entry behind.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde_json::json;
use uuid::Uuid;

use tally_db::models::{NewAuditEntry, ProfileRow, SubmissionRow};
use tally_types::api::AuditLogQuery;
use tally_types::models::{AuditLogEntry, Role, SubmissionStatus};

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiResult;
use crate::middleware::AdminProfile;

pub fn status_update(admin_id: Uuid, before: &SubmissionRow, to: SubmissionStatus) -> NewAuditEntry {
    NewAuditEntry {
        admin_id,
        action: format!("status_update_{to}"),
        target_type: "submission",
        target_id: before.id.to_string(),
        old_values: json!({ "status": before.status }),
        new_values: json!({ "status": to }),
    }
}

pub fn role_update(admin_id: Uuid, before: &ProfileRow, to: Role) -> NewAuditEntry {
    NewAuditEntry {
        admin_id,
        action: "role_update".into(),
        target_type: "user",
        target_id: before.id.to_string(),
        old_values: json!({ "role": before.role }),
        new_values: json!({ "role": to }),
    }
}

pub fn submission_delete(admin_id: Uuid, row: &SubmissionRow) -> NewAuditEntry {
    NewAuditEntry {
        admin_id,
        action: "submission_delete".into(),
        target_type: "submission",
        target_id: row.id.to_string(),
        old_values: json!({
            "user_id": row.user_id,
            "title": row.title,
            "status": row.status,
        }),
        new_values: serde_json::Value::Null,
    }
}

const DEFAULT_AUDIT_LIMIT: u32 = 50;
const MAX_AUDIT_LIMIT: u32 = 200;

/// GET /admin/audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    AdminProfile(_admin): AdminProfile,
    query: Result<Query<AuditLogQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AuditLogEntry>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(MAX_AUDIT_LIMIT);
    let rows = db_call(&state, move |db| db.list_audit_logs(limit)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
