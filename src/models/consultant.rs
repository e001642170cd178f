use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::text_enum;

text_enum! {
    pub enum ConsultantStatus {
        Active => "active",
        Inactive => "inactive",
        OnLeave => "on_leave",
        Suspended => "suspended",
    }
}

/// Workload share above which a consultant stops taking new assignments.
pub const WORKLOAD_CAPACITY_PERCENT: f64 = 80.0;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConsultantProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ConsultantStatus,
    pub years_of_experience: i32,
    pub specializations: Vec<String>,
    pub total_placements: i32,
    pub successful_placements: i32,
    pub this_month_placements: i32,
    pub total_revenue_generated: Decimal,
    pub this_quarter_revenue: Decimal,
    pub commission_rate: Decimal,
    pub max_concurrent_assignments: i32,
    pub manager_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    pub active_candidates: i64,
    pub active_clients: i64,
    pub max_concurrent_assignments: i32,
    pub workload_percentage: f64,
    pub can_accept_more: bool,
}

impl Workload {
    /// Clients weigh twice as much as candidates against the assignment cap.
    pub fn compute(active_candidates: i64, active_clients: i64, max_assignments: i32) -> Self {
        let load = active_candidates + 2 * active_clients;
        let capacity = max_assignments.max(1) as f64;
        let workload_percentage = (load as f64 / capacity * 100.0).min(100.0);
        Self {
            active_candidates,
            active_clients,
            max_concurrent_assignments: max_assignments,
            workload_percentage,
            can_accept_more: workload_percentage < WORKLOAD_CAPACITY_PERCENT,
        }
    }
}

/// True if `manager_chain` (the proposed manager followed by its own managers)
/// already contains `consultant_id`.
pub fn creates_management_cycle(consultant_id: Uuid, manager_chain: &[Uuid]) -> bool {
    manager_chain.contains(&consultant_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workload_caps_and_flags_capacity() {
        let light = Workload::compute(3, 1, 10);
        assert_eq!(light.workload_percentage, 50.0);
        assert!(light.can_accept_more);

        let heavy = Workload::compute(6, 4, 10);
        assert_eq!(heavy.workload_percentage, 100.0);
        assert!(!heavy.can_accept_more);
    }

    #[test]
    fn manager_chain_containing_self_is_a_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert!(creates_management_cycle(a, &[b, c, a]));
        assert!(!creates_management_cycle(a, &[b, c]));
        assert!(creates_management_cycle(a, &[a]));
    }
}
