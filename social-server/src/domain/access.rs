use uuid::Uuid;

use crate::domain::error::DomainError;

/// Allows a mutation only when the acting user owns the resource.
pub fn authorize(owner_id: Uuid, actor_id: Uuid) -> Result<(), DomainError> {
    if owner_id == actor_id {
        Ok(())
    } else {
        Err(DomainError::AccessDenied)
    }
}
