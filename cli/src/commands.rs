use crate::SellArgs;
use crate::error::CliError;
use crate::error::Result;
use kmarket_core::MarketError;
use kmarket_core::Marketplace;
use kmarket_core::PackageListing;
use kmarket_core::SearchResult;
use std::fmt::Write as _;
use tracing::warn;

/// Hybrid search. If the embedding provider fails mid-query the command
/// still answers, from the keyword leg alone.
pub async fn search(market: &Marketplace, query: &str, limit: usize, json: bool) -> Result<()> {
    if query.trim().is_empty() {
        return Err(CliError::InvalidArgument(
            "search query must not be empty".to_string(),
        ));
    }

    let results = match market.search(query, limit).await {
        Ok(results) => results,
        Err(MarketError::Embedding(err)) => {
            warn!("Semantic search failed, showing keyword matches only: {err}");
            market.keyword_search(query, limit).await?
        }
        Err(err) => return Err(err.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", render_results(query, &results));
    }
    Ok(())
}

pub async fn sell(market: &mut Marketplace, args: SellArgs) -> Result<()> {
    if args.id.trim().is_empty() {
        return Err(CliError::InvalidArgument("--id must not be empty".to_string()));
    }
    if !args.price.is_finite() || args.price < 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "--price must be a non-negative number, got {}",
            args.price
        )));
    }

    let summary = args.summary.unwrap_or_else(|| args.description.clone());
    let listing = PackageListing::new(args.id, args.name, args.description)
        .with_tags(args.tags.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
        .with_price(args.price)
        .with_seller(args.seller);
    let id = listing.id.clone();

    let outcome = market.list_package(listing, &summary).await?;
    if outcome.semantically_indexed {
        println!("Listed {id}");
    } else {
        println!("Listed {id} (keyword search only)");
    }
    Ok(())
}

pub async fn delist(market: &mut Marketplace, id: &str) -> Result<()> {
    if !market.delist_package(id).await? {
        return Err(CliError::PackageNotFound(id.to_string()));
    }
    println!("Delisted {id}");
    Ok(())
}

pub async fn show(market: &Marketplace, id: &str, json: bool) -> Result<()> {
    let listing = market
        .get(id)
        .await?
        .ok_or_else(|| CliError::PackageNotFound(id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print!("{}", render_listing(&listing));
    }
    Ok(())
}

pub async fn record_sale(market: &Marketplace, id: &str) -> Result<()> {
    if !market.record_sale(id).await? {
        return Err(CliError::PackageNotFound(id.to_string()));
    }
    println!("Recorded sale of {id}");
    Ok(())
}

pub fn render_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No packages matched {query:?}\n");
    }

    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        let listing = &result.listing;
        let _ = writeln!(
            out,
            "{:>2}. {} [{}]  {:.3} {}",
            rank + 1,
            listing.name,
            listing.id,
            result.score,
            result.match_type
        );
        if !listing.description.is_empty() {
            let _ = writeln!(out, "    {}", listing.description);
        }
        let _ = writeln!(out, "    {}", summary_line(listing));
    }
    out
}

pub fn render_listing(listing: &PackageListing) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", listing.name, listing.id);
    if !listing.description.is_empty() {
        let _ = writeln!(out, "{}", listing.description);
    }
    let _ = writeln!(out, "{}", summary_line(listing));
    if !listing.seller.is_empty() {
        let _ = writeln!(out, "seller: {}", listing.seller);
    }
    let _ = writeln!(
        out,
        "listed: {}  updated: {}",
        listing.created_at.format("%Y-%m-%d %H:%M UTC"),
        listing.updated_at.format("%Y-%m-%d %H:%M UTC")
    );
    out
}

fn summary_line(listing: &PackageListing) -> String {
    let tags = if listing.tags.is_empty() {
        "-".to_string()
    } else {
        listing.tags.join(", ")
    };
    format!(
        "tags: {tags} | price: {} | sold: {}",
        listing.price, listing.sold_count
    )
}
