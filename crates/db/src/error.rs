use navette_core::store::StoreError;

/// Map a sqlx error onto the store port's error vocabulary.
///
/// Unique violations become [`StoreError::Conflict`] so a lost race for a
/// claim cell reads like any other conflict upstream.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            let constraint = db_err.constraint().unwrap_or("unique constraint");
            StoreError::Conflict(format!("Slot already claimed ({constraint})"))
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => StoreError::Corrupt(err.to_string()),
        _ => StoreError::Unavailable(err.to_string()),
    }
}
