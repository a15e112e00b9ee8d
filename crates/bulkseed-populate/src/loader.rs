//! Bulk loading of staging files.

use crate::error::LoadError;
use crate::staging::StagingFile;
use crate::store::StoreTransaction;
use tracing::debug;

/// Stream `staging` into `table` inside `tx`, then delete the file.
///
/// The file is consumed: it is removed when this function returns, whether
/// the copy succeeded or not. Nothing is retried.
pub async fn load_staging_file(
    staging: StagingFile,
    table: &str,
    columns: &[&str],
    tx: &mut dyn StoreTransaction,
) -> Result<u64, LoadError> {
    let file = tokio::fs::File::open(staging.path()).await?;
    let copied = tx.copy_in(table, columns, Box::new(file)).await?;

    if copied != staging.rows() {
        return Err(LoadError::Rejected {
            table: table.to_string(),
            reason: format!(
                "store accepted {} rows, {} were staged",
                copied,
                staging.rows()
            ),
        });
    }

    debug!(
        "Loaded {} rows into '{}' from {}",
        copied,
        table,
        staging.path().display()
    );
    Ok(copied)
}
