pub mod comment_repository;
pub mod like_repository;
pub mod post_repository;
pub mod user_repository;

/// Constraint name of a uniqueness violation reported by the store.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    let db = err.as_database_error()?;
    db.is_unique_violation()
        .then(|| db.constraint().unwrap_or_default().to_string())
}

/// Constraint name of a foreign-key violation reported by the store.
pub(crate) fn foreign_key_violation(err: &sqlx::Error) -> Option<String> {
    let db = err.as_database_error()?;
    db.is_foreign_key_violation()
        .then(|| db.constraint().unwrap_or_default().to_string())
}
