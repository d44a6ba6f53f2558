use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use followfeed::config::Config;
use followfeed::favorites::{FavoriteStore, FavoritesList};
use followfeed::feed::{FeedController, FilterView, FollowerBrowser};
use followfeed::model::FavoriteKey;
use followfeed::profile::ProfileController;
use followfeed::remote::{GithubClient, RemoteCollection};
use followfeed::storage::{Database, DatabaseError};
use followfeed::util::is_valid_username;

/// Get the config directory path (~/.config/followfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("followfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "followfeed", about = "Browse GitHub followers and keep a list of favorites")]
struct Args {
    /// Config file (default: ~/.config/followfeed/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a user's followers
    Followers {
        user: String,

        /// Only show followers whose login contains this text
        #[arg(long, value_name = "QUERY")]
        filter: Option<String>,

        /// Maximum number of pages to load
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
    },
    /// Show a user's profile
    Profile { user: String },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
}

#[derive(Subcommand, Debug)]
enum FavoritesAction {
    /// List saved favorites
    List,
    /// Add a user to favorites
    Add { user: String },
    /// Remove a user from favorites
    Remove { user: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // User-only access to the directory holding the database
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(?config, "Effective configuration");

    let store = Arc::new(FavoriteStore::new(Arc::new(
        open_database(&config, &config_dir).await?,
    )));

    match args.command {
        Command::Followers {
            user,
            filter,
            pages,
        } => {
            let remote = build_remote(&config)?;
            show_followers(&config, remote, &store, &validated(&user)?, filter, pages).await
        }
        Command::Profile { user } => {
            let remote = build_remote(&config)?;
            show_profile(remote, &store, &validated(&user)?).await
        }
        Command::Favorites { action } => match action {
            FavoritesAction::List => list_favorites(store).await,
            FavoritesAction::Add { user } => {
                let remote = build_remote(&config)?;
                add_favorite(remote, store, &validated(&user)?).await
            }
            FavoritesAction::Remove { user } => {
                let key = FavoriteKey::Login(validated(&user)?);
                if store.remove(key).await? {
                    println!("Removed {user} from favorites.");
                } else {
                    println!("{user} is not a favorite.");
                }
                Ok(())
            }
        },
    }
}

fn validated(user: &str) -> Result<String> {
    if !is_valid_username(user) {
        anyhow::bail!("Invalid username: {user:?}");
    }
    Ok(user.to_string())
}

async fn open_database(config: &Config, config_dir: &std::path::Path) -> Result<Database> {
    let db_path = config.database_path(config_dir);
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(db_path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of followfeed appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

fn build_remote(config: &Config) -> Result<Arc<dyn RemoteCollection>> {
    let base_url = Url::parse(&config.api_base_url)
        .with_context(|| format!("Invalid api_base_url: {}", config.api_base_url))?;
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;
    Ok(Arc::new(GithubClient::new(
        client,
        base_url,
        config.resolve_token(),
        config.request_timeout(),
    )))
}

async fn show_followers(
    config: &Config,
    remote: Arc<dyn RemoteCollection>,
    store: &FavoriteStore,
    user: &str,
    filter: Option<String>,
    pages: u32,
) -> Result<()> {
    let feed = FeedController::new(user, remote).with_prefetch_threshold(config.prefetch_threshold);
    let mut browser = FollowerBrowser::new(feed, FilterView::new(config.debounce()));
    if let Some(query) = filter {
        browser.set_query(query);
    }
    browser.run_until_idle().await;

    // Walk to the end of the list the way a scrolling reader would, which
    // pulls in the next page each time.
    let mut loaded = u32::from(browser.feed().state().fetched);
    while loaded < pages && browser.feed().state().error.is_none() {
        let Some(last) = browser.feed().items().last().cloned() else {
            break;
        };
        if !browser.load_more_if_needed(&last) {
            break;
        }
        browser.run_until_idle().await;
        if browser.feed().state().error.is_some() {
            break;
        }
        loaded += 1;
    }
    tracing::debug!(user, pages = loaded, "Follower pages loaded");

    if let Some(message) = browser.feed().state().message() {
        if browser.feed().state().error.is_some() && browser.feed().items().is_empty() {
            anyhow::bail!(message);
        }
        eprintln!("{message}");
    }

    let favorite_ids: HashSet<u64> = match store.list().await {
        Ok(favorites) => favorites.iter().map(|f| f.id).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read favorites; listing without markers");
            HashSet::new()
        }
    };

    for follower in browser.visible_items().iter() {
        let marker = if favorite_ids.contains(&follower.id) { "*" } else { " " };
        println!("{marker} {:<39} {}", follower.login, follower.id);
    }

    let state = browser.feed().state();
    eprintln!(
        "{} shown, {} loaded{}",
        browser.visible_items().len(),
        state.items.len(),
        if state.exhausted { "" } else { " (more available, raise --pages)" }
    );
    Ok(())
}

async fn show_profile(
    remote: Arc<dyn RemoteCollection>,
    store: &FavoriteStore,
    user: &str,
) -> Result<()> {
    let mut controller = ProfileController::new(user, remote);
    controller.settle().await;
    if let Some(e) = controller.error() {
        anyhow::bail!("{e}");
    }
    let Some(profile) = controller.profile() else {
        anyhow::bail!("No profile loaded for {user}");
    };

    println!("{} ({})", profile.login, profile.name.as_deref().unwrap_or("-"));
    if let Some(location) = &profile.location {
        println!("Location:     {location}");
    }
    if let Some(bio) = &profile.bio {
        println!("Bio:          {bio}");
    }
    println!("Repos:        {}", profile.public_repos);
    println!("Gists:        {}", profile.public_gists);
    println!("Followers:    {}", profile.followers);
    println!("Following:    {}", profile.following);
    println!("Joined:       {}", profile.created_at.format("%b %Y"));
    println!("Profile:      {}", profile.html_url);
    println!(
        "Favorite:     {}",
        if store.contains(profile.id).await { "yes" } else { "no" }
    );
    Ok(())
}

async fn add_favorite(
    remote: Arc<dyn RemoteCollection>,
    store: Arc<FavoriteStore>,
    user: &str,
) -> Result<()> {
    let mut controller = ProfileController::new(user, remote);
    controller.settle().await;
    if let Some(e) = controller.error() {
        anyhow::bail!("{e}");
    }
    let Some(mut toggle) = controller.favorite_toggle(store) else {
        anyhow::bail!("No profile loaded for {user}");
    };

    toggle.wait().await?;
    if toggle.is_favorite() {
        println!("{user} is already a favorite.");
        return Ok(());
    }
    toggle.toggle_on()?;
    toggle.wait().await?;
    println!("Added {user} to favorites.");
    Ok(())
}

async fn list_favorites(store: Arc<FavoriteStore>) -> Result<()> {
    let mut list = FavoritesList::new(store);
    list.reload().await?;
    if let Some(message) = list.message() {
        println!("{message}");
    }
    for favorite in list.favorites() {
        println!("{:<39} {:>10}  {}", favorite.login, favorite.id, favorite.url);
    }
    Ok(())
}
