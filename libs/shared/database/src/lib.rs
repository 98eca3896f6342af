pub mod error;
pub mod supabase;

pub use error::DatabaseError;
pub use supabase::SupabaseClient;

/// Decodes the first row of a PostgREST array response, if any.
pub fn first_row<T>(rows: Vec<serde_json::Value>) -> Result<Option<T>, DatabaseError>
where
    T: serde::de::DeserializeOwned,
{
    match rows.into_iter().next() {
        Some(row) => Ok(Some(serde_json::from_value(row)?)),
        None => Ok(None),
    }
}

/// Decodes every row of a PostgREST array response.
pub fn all_rows<T>(rows: Vec<serde_json::Value>) -> Result<Vec<T>, DatabaseError>
where
    T: serde::de::DeserializeOwned,
{
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(DatabaseError::from))
        .collect()
}
