use super::row::Row;
use crate::error::ReporterError;
use crate::store::{Batch, Session, Target};

/// Persist one flush cycle's rows as a single unit.
///
/// Rows are staged in order; the first rejected row abandons the batch
/// before anything is sent. Returns the number of rows committed. An empty
/// slice commits an empty batch, which succeeds.
pub async fn write_batch<S: Session>(
    session: &mut S,
    target: &Target,
    rows: &[Row],
) -> Result<usize, ReporterError> {
    let mut batch = session.prepare(target).map_err(ReporterError::Prepare)?;

    for (index, row) in rows.iter().enumerate() {
        batch
            .append(row)
            .map_err(|source| ReporterError::RowRejected { index, source })?;
    }

    let staged = batch.len();
    session
        .commit(batch)
        .await
        .map_err(|source| ReporterError::Commit { rows: staged, source })?;
    Ok(staged)
}
