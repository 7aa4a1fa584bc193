//! Authorization gate and guard pipeline.
//!
//! Guards are pure predicates over already-loaded data. Each one yields
//! either `Continue` or a terminal error; a single runner walks the ordered
//! list and the first rejection wins. No guard performs a write.

use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Outcome of a single guard predicate.
#[derive(Debug)]
pub enum GuardOutcome {
    Continue,
    Reject(AppError),
}

/// Requester must be the entity's owner. Evaluated after the entity is
/// loaded; stands on its own even when the requester's role is privileged.
pub fn owner_guard(requester_id: Uuid, owner_id: Uuid) -> GuardOutcome {
    if requester_id == owner_id {
        GuardOutcome::Continue
    } else {
        GuardOutcome::Reject(AppError::OwnershipDenied)
    }
}

/// Requester's role name must be in the fixed allow-set. The caller loads
/// the role fresh from storage so a role change takes effect immediately.
pub fn role_guard(role_name: &str, allowed: &'static [&'static str]) -> GuardOutcome {
    if allowed.contains(&role_name) {
        GuardOutcome::Continue
    } else {
        GuardOutcome::Reject(AppError::RoleDenied {
            actual: role_name.to_string(),
            allowed,
        })
    }
}

/// Run guards in order; the first rejection is the result.
pub fn run_guards(guards: impl IntoIterator<Item = GuardOutcome>) -> AppResult<()> {
    for guard in guards {
        if let GuardOutcome::Reject(err) = guard {
            return Err(err);
        }
    }
    Ok(())
}
