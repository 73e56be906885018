use todaytoon::{ClientBuilder, home::Home};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = ClientBuilder::from_env().build()?;
    let home = Home::new(client);

    let (to_be_paid, _) = home.load().await;
    if let Some(error) = to_be_paid.error() {
        anyhow::bail!("failed to load the calendar: {error}");
    }

    let today = chrono::Local::now().date_naive();

    for group in home.calendar(today) {
        println!("{}", group.heading());

        for entry in group.entries() {
            let [year, month, day] = entry.paid_date_parts();
            println!(
                "  {year}.{month}.{day}  {} ({}) {}원",
                entry.webtoon().title(),
                entry.webtoon().platform().as_slug(),
                entry.cookie_price()
            );
        }
    }

    println!();
    println!("recently paid:");
    for webtoon in home.recently_paid() {
        println!("  {}", webtoon.title());
    }

    Ok(())
}
