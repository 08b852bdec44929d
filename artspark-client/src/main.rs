//! artspark-sync - inspect the data layer from a terminal
//!
//! Uses the same configuration as the site (`ARTSPARK_*`, `.env`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use artspark_client::logger::init_logger_with_file;
use artspark_client::{ClientConfig, DataLayer, Identity, ThemeMode};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "artspark-sync", version, about = "ArtSpark data layer tool")]
struct Cli {
    /// On-device data directory (overrides ARTSPARK_DATA_DIR)
    #[arg(long, env = "ARTSPARK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Sign in as this user id
    #[arg(long, env = "ARTSPARK_USER_ID", requires = "email")]
    user_id: Option<String>,

    /// Email reported by the identity provider
    #[arg(long, env = "ARTSPARK_USER_EMAIL")]
    email: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Also write rotated log files here
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Backend, session and collection sizes
    Summary,
    /// Galleries derived from the artworks
    Galleries,
    /// Reviews and rating of one artwork
    Reviews {
        artwork_id: String,
    },
    /// Show the theme, or set it to light, dark or auto
    Theme {
        mode: Option<ThemeMode>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger_with_file(&cli.log_level, cli.json_logs, cli.log_dir.as_deref())?;

    let mut config = ClientConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let identity = cli.user_id.zip(cli.email).map(|(id, email)| Identity::new(id, email));

    let layer = DataLayer::connect(config, identity)
        .await
        .context("failed to start data layer")?;

    match cli.command {
        Command::Summary => summary(&layer).await,
        Command::Galleries => galleries(&layer).await,
        Command::Reviews { artwork_id } => reviews(&layer, &artwork_id).await,
        Command::Theme { mode } => {
            let state = match mode {
                Some(mode) => layer.theme().set_mode(mode),
                None => layer.theme().state(),
            };
            println!("mode: {}  resolved: {}", state.mode, state.resolved.as_str());
            Ok(())
        }
    }
}

async fn summary(layer: &DataLayer) -> Result<()> {
    if let Err(e) = layer.load_all().await {
        tracing::warn!(error = %e, "Some collections could not be loaded");
    }

    println!("backend:   {}", layer.backend());
    println!("session:   {:?}", layer.session().outcome());
    println!("artworks:  {}", layer.artworks().cache().len());
    println!("available: {}", layer.artworks().available().len());
    println!("galleries: {}", layer.galleries().galleries().len());
    println!("reviews:   {}", layer.reviews().cache().len());
    println!("ratings:   {}", layer.ratings().cache().len());
    if layer.session().is_admin() {
        println!("pending reviews: {}", layer.reviews().pending_reviews()?.len());
        println!("unread messages: {}", layer.contact().unread_count());
    }
    Ok(())
}

async fn galleries(layer: &DataLayer) -> Result<()> {
    layer
        .artworks()
        .load()
        .await
        .context("failed to load artworks")?;

    for gallery in layer.galleries().galleries() {
        println!(
            "{:<24} {:>3} works ({} available)  {}  /{}",
            gallery.name, gallery.artwork_count, gallery.available_count, gallery.year, gallery.slug
        );
    }
    Ok(())
}

async fn reviews(layer: &DataLayer, artwork_id: &str) -> Result<()> {
    layer
        .reviews()
        .load()
        .await
        .context("failed to load reviews")?;

    let rating = layer.reviews().artwork_rating(artwork_id);
    println!(
        "{} reviews, average {:.1}, distribution {:?}",
        rating.count, rating.average, rating.distribution
    );
    for review in layer.reviews().artwork_reviews(artwork_id) {
        let marker = if review.approved { ' ' } else { '*' };
        println!(
            "{}{} ({}/5, {} helpful): {}",
            marker, review.user_name, review.rating, review.helpful_count, review.comment
        );
    }
    Ok(())
}
