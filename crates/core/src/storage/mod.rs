pub mod lock;
pub mod results;

use anyhow::Context;

pub use lock::{try_acquire_symbol_lock, SymbolLock};
pub use results::{append_result, list_symbols, load_history, StoredHistory, SymbolSummary};

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
