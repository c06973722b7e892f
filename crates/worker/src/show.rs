use levermann_core::domain::recommendation::recommendation;
use levermann_core::domain::report;
use levermann_core::storage;
use sqlx::PgPool;

pub async fn run(pool: &PgPool, symbols: &[String], verbose: bool) -> anyhow::Result<()> {
    let symbols = if symbols.is_empty() {
        storage::list_symbols(pool)
            .await?
            .into_iter()
            .map(|s| s.symbol)
            .collect()
    } else {
        symbols.to_vec()
    };

    for symbol in &symbols {
        let stored = storage::load_history(pool, symbol).await?;
        let (Some(header), Some(latest)) = (&stored.header, stored.history.latest()) else {
            println!("{symbol}: no evaluation stored");
            continue;
        };

        if verbose {
            print!("{}", report::render(header, latest));
            println!(
                "{:<35} {:<25}",
                "Recommendation:",
                recommendation(&stored.history, header.tier).to_string()
            );
        } else {
            println!("{symbol}: Levermann Score: {}", latest.score());
        }
        println!("{}", "-".repeat(80));
    }
    Ok(())
}
