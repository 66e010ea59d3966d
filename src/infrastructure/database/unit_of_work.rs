//! Transaction boundaries for repository writes.
//!
//! Every write that checks a reservation rule runs inside one of these, so
//! the row locks taken at the start are held until the insert commits.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::shared::error::AppError;

/// Transaction context that wraps a SQLx transaction.
pub struct TransactionContext {
    tx: Transaction<'static, Postgres>,
}

impl TransactionContext {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    /// Connection to execute queries on inside the transaction.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await.map_err(AppError::Database)
    }
}

/// Execute a closure within a transaction.
///
/// The closure hands the context back with its result; the transaction is
/// committed on `Ok` and rolled back on drop otherwise.
///
/// # Example
/// ```ignore
/// let booking = with_transaction(&pool, |mut ctx| async move {
///     lock_rooms(ctx.conn(), &room_ids).await?;
///     let booking = insert_booking(ctx.conn(), &new_booking).await?;
///     Ok((booking, ctx))
/// }).await?;
/// ```
pub async fn with_transaction<F, Fut, T>(pool: &PgPool, f: F) -> Result<T, AppError>
where
    F: FnOnce(TransactionContext) -> Fut,
    Fut: std::future::Future<Output = Result<(T, TransactionContext), AppError>>,
{
    let tx = pool.begin().await.map_err(AppError::Database)?;
    let ctx = TransactionContext::new(tx);

    let (result, ctx) = f(ctx).await?;
    ctx.commit().await?;
    Ok(result)
}
