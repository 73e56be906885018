use std::str::FromStr;
use todaytoon::{
    ClientBuilder,
    browse::Browse,
    meta::{Filter, Genre, Order},
    session::{MemoryStorage, View},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let genre = match std::env::args().nth(1) {
        Some(genre) => Genre::from_str(&genre)?,
        None => Genre::All,
    };

    let client = ClientBuilder::from_env().build()?;
    let storage = MemoryStorage::new();

    let browse = Browse::new(client.clone(), View::Genre);
    browse.select_genre(genre);
    browse.select_order(Order::Savings);
    browse.toggle_filter(Filter::Updating);

    browse.load().await;
    browse.fetch_next().await;

    if let Some(error) = browse.error() {
        anyhow::bail!("failed to browse {genre}: {error}");
    }

    println!("{} ({}개)", genre.label(), browse.total_count());
    for webtoon in browse.webtoons() {
        println!("  {} / {}", webtoon.title(), webtoon.credits());
    }

    browse.save(&storage, 0)?;

    let returned = Browse::new(client, View::Genre);
    let scroll = returned.restore(&storage);
    println!(
        "restored {} webtoons at scroll {scroll:?} without refetching",
        returned.webtoons().len()
    );

    Ok(())
}
