//! Audit trail writes.

use diesel::prelude::*;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::{AuditEntry, NewAuditEntry};
use crate::schema::audit_log;

#[derive(Debug, Clone)]
pub struct AuditService;

impl AuditService {
    /// Records one audit row for a state-changing operation.
    ///
    /// On the inbox completion path this write sits between the backing
    /// entity update and the work-item update and its failure aborts the
    /// completion; on best-effort creation paths callers log and continue.
    #[instrument(skip(conn, details), fields(action = %action, entity_id = %entity_id))]
    pub fn record(
        conn: &mut PgConnection,
        company_id: Option<Uuid>,
        actor_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        details: serde_json::Value,
    ) -> Result<AuditEntry, diesel::result::Error> {
        let entry = NewAuditEntry {
            company_id,
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details,
        };

        let result = diesel::insert_into(audit_log::table)
            .values(&entry)
            .returning(AuditEntry::as_returning())
            .get_result(conn)?;

        debug!(audit_id = %result.id, "Audit entry written");
        Ok(result)
    }
}
