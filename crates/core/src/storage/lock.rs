use anyhow::Context;
use sqlx::Connection;

// Advisory locks are scoped to the Postgres session. Used to keep two worker runs from
// appending to the same symbol's history concurrently.
const LOCK_NAMESPACE: i64 = 0x4C45_5645_524D; // "LEVERM"

const TRY_LOCK_SQL: &str = "SELECT pg_try_advisory_lock($1 # hashtext($2)::bigint)";
const UNLOCK_SQL: &str = "SELECT pg_advisory_unlock($1 # hashtext($2)::bigint)";

fn lock_name(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Session-scoped lock on a connection detached from the pool. The session ends with the
/// guard, so a lock that failed to unlock never goes back into the pool.
pub struct SymbolLock {
    conn: sqlx::PgConnection,
    name: String,
}

/// `Ok(None)` when another session holds the lock for `symbol`.
pub async fn try_acquire_symbol_lock(
    pool: &sqlx::PgPool,
    symbol: &str,
) -> anyhow::Result<Option<SymbolLock>> {
    let name = lock_name(symbol);
    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection for advisory lock")?
        .detach();
    let acquired: (bool,) = sqlx::query_as(TRY_LOCK_SQL)
        .persistent(false)
        .bind(LOCK_NAMESPACE)
        .bind(&name)
        .fetch_one(&mut conn)
        .await
        .with_context(|| format!("failed to acquire advisory lock for {name}"))?;
    if !acquired.0 {
        conn.close().await.ok();
        return Ok(None);
    }
    Ok(Some(SymbolLock { conn, name }))
}

impl SymbolLock {
    pub fn symbol(&self) -> &str {
        &self.name
    }

    /// Unlocks and closes the session. The session is closed even when the unlock fails.
    pub async fn release(self) -> anyhow::Result<()> {
        let Self { mut conn, name } = self;
        let unlocked = sqlx::query_as::<_, (bool,)>(UNLOCK_SQL)
            .persistent(false)
            .bind(LOCK_NAMESPACE)
            .bind(&name)
            .fetch_one(&mut conn)
            .await;
        let closed = conn.close().await;

        let (unlocked,) =
            unlocked.with_context(|| format!("failed to release advisory lock for {name}"))?;
        closed.with_context(|| format!("failed to close lock session for {name}"))?;
        anyhow::ensure!(unlocked, "advisory lock for {name} was not held");
        Ok(())
    }
}
