use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qmdl::playlist::{self, playlist_folder};
use qmdl::{
    BatchProgress, Catalog, Config, Credential, HttpClient, Outcome, PlaylistSummary,
    QualityStrategy, QualityTier, Track, download_many,
};

const GIT_VERSION: &str = git_version::git_version!(args = ["--always", "--tags"], fallback = "unknown");
const VERSION: &str = const_str::concat!(env!("CARGO_PKG_VERSION"), " (", GIT_VERSION, ")");

#[derive(Parser)]
#[command(
    name = "qmdl",
    version = VERSION,
    about = "Download QQ Music songs and playlists",
    long_about = "Search QQ Music or walk a user's playlists and download each song at the\n\
    best available quality, falling back tier by tier, then embed title, artist,\n\
    album, cover art and lyrics into the file.\n\n\
    Examples:\n\
      qmdl search 晴天                          # List results and download the first\n\
      qmdl search 晴天 -p 2 --lossless          # Download result 2, FLAC first\n\
      qmdl -q flac,320 search 晴天 --all        # Custom fallback chain\n\
      qmdl playlists 123456                     # List a user's playlists\n\
      qmdl playlist 123456 2 -i                 # List the songs of playlist 2\n\
      qmdl -d ./music playlist 123456 2         # Download playlist 2\n\
      qmdl credential status                    # Show the saved credential"
)]
struct Args {
    /// JSON config file
    #[arg(short = 'c', long = "config", help = "JSON config file")]
    config: Option<PathBuf>,

    /// Download to specified directory
    #[arg(short = 'd', long = "dir", help = "Download to specified directory")]
    music_dir: Option<PathBuf>,

    /// Fallback chain, best first
    #[arg(
        short = 'q',
        long = "quality",
        value_delimiter = ',',
        help = "Fallback chain, best first (master, atmos2, atmos51, flac, ogg640, ogg320, ogg192, ogg96, 320, 128, aac192, aac96, aac48)"
    )]
    quality: Vec<QualityTier>,

    /// FLAC -> 320kbps -> 128kbps instead of 320kbps -> 128kbps
    #[arg(long = "lossless", conflicts_with = "quality", help = "Prefer FLAC (FLAC -> 320kbps -> 128kbps)")]
    lossless: bool,

    #[arg(long = "no-tags", help = "Do not embed tags, cover or lyrics")]
    no_tags: bool,

    #[arg(long = "batch-size", help = "Songs downloaded together in one batch")]
    batch_size: Option<usize>,

    #[arg(long = "delay", help = "Seconds to wait between batches")]
    delay: Option<u64>,

    #[arg(long = "cover-size", help = "Cover size in pixels: 150, 300, 500 or 800")]
    cover_size: Option<u32>,

    #[arg(long = "credential", help = "Credential file")]
    credential_file: Option<PathBuf>,

    #[arg(long = "credential-endpoint", help = "Base URL serving GET /api/credential")]
    credential_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search songs and download the picked results
    Search {
        keyword: String,

        #[arg(short = 'n', long = "limit", default_value_t = 5, help = "Number of results")]
        limit: usize,

        #[arg(short = 'p', long = "pick", help = "1-based result to download, repeatable (default: 1)")]
        pick: Vec<usize>,

        #[arg(long = "all", conflicts_with = "pick", help = "Download every result")]
        all: bool,

        #[arg(short = 'i', long = "info-only", help = "List results without downloading")]
        info_only: bool,
    },
    /// List a user's playlists
    Playlists { user_id: String },
    /// List or download one of a user's playlists
    Playlist {
        user_id: String,

        /// Position in `qmdl playlists` output, or the playlist id
        selector: String,

        #[arg(long = "no-user-prefix", help = "Do not prefix the folder name with the user id")]
        no_user_prefix: bool,

        #[arg(short = 'i', long = "info-only", help = "List the playlist's songs without downloading")]
        info_only: bool,
    },
    /// Inspect or fetch the session credential
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },
}

#[derive(Subcommand)]
enum CredentialAction {
    /// Show whether a credential is loaded and still valid
    Status,
    /// Fetch a credential from a remote provider and save it
    Fetch { endpoint: String },
}

impl Args {
    async fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .await
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(dir) = &self.music_dir {
            config.music_dir = dir.clone();
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(delay) = self.delay {
            config.batch_delay_secs = delay;
        }
        if let Some(size) = self.cover_size {
            config.cover_size = size;
        }
        if let Some(file) = &self.credential_file {
            config.credential_file = file.clone();
        }
        if let Some(endpoint) = &self.credential_endpoint {
            config.credential_endpoint = Some(endpoint.clone());
        }
        if self.no_tags {
            config.write_metadata = false;
        }
        config.validate()?;
        Ok(config)
    }

    fn strategy(&self) -> Result<QualityStrategy> {
        if self.lossless {
            return Ok(QualityStrategy::lossless());
        }
        if self.quality.is_empty() {
            return Ok(QualityStrategy::standard());
        }
        Ok(QualityStrategy::new(self.quality.clone())?)
    }
}

fn vip_label(track: &Track) -> &'static str {
    if track.vip { " [VIP]" } else { "" }
}

fn list_tracks(tracks: &[Track]) {
    for (index, track) in tracks.iter().enumerate() {
        print!("[{}] {} - {}{}", index + 1, track.name, track.singer, vip_label(track));
        if let Some(album) = &track.album_name {
            print!("  ({album})");
        }
        println!();
    }
}

fn list_playlists(playlists: &[PlaylistSummary]) {
    for (index, list) in playlists.iter().enumerate() {
        println!(
            "[{}] {} ({} songs){}",
            index + 1,
            list.title,
            list.song_count,
            if list.is_favorites() { " [private]" } else { "" }
        );
    }
}

fn print_progress(progress: &BatchProgress) {
    println!(
        "Progress: {}/{} ({}%) - succeeded: {}, failed: {}",
        progress.done,
        progress.total,
        progress.percent(),
        progress.succeeded,
        progress.failed
    );
}

fn print_outcome(track: &Track, outcome: &Outcome) {
    match outcome {
        Outcome::Skipped { path } => println!("= Already exists: {}", path.display()),
        Outcome::Succeeded { tier, path } => {
            println!("✓ {} ({}): {}", track.display_name(), tier.label(), path.display())
        }
        Outcome::Failed => eprintln!("✗ All qualities failed: {}", track.display_name()),
    }
}

async fn load_credential(config: &Config, http: &HttpClient) -> Option<Credential> {
    let credential = config.credential_provider().resolve(http).await;
    if credential.is_none() {
        println!("No valid credential, downloading anonymously (free tiers only)");
    }
    credential
}

async fn search(
    args: &Args,
    config: &Config,
    keyword: &str,
    limit: usize,
    pick: &[usize],
    all: bool,
    info_only: bool,
) -> Result<()> {
    let strategy = args.strategy()?;
    let downloader = qmdl::downloader(config)?;
    let tracks = downloader.catalog().search(keyword, limit).await?;
    if tracks.is_empty() {
        println!("No songs found for: {keyword}");
        return Ok(());
    }

    println!("Found {} song(s):", tracks.len());
    list_tracks(&tracks);
    println!();
    if info_only {
        return Ok(());
    }

    let selected: Vec<Track> = if all {
        tracks
    } else {
        let picks = if pick.is_empty() { vec![1] } else { pick.to_vec() };
        let mut selected = Vec::with_capacity(picks.len());
        for p in picks {
            let Some(track) = p.checked_sub(1).and_then(|i| tracks.get(i)) else {
                bail!("no result #{p}, choose between 1 and {}", tracks.len());
            };
            selected.push(track.clone());
        }
        selected
    };

    let credential = load_credential(config, downloader.fetch()).await;
    println!("Quality: {}", strategy.describe());

    let summary = download_many(
        &downloader,
        &selected,
        &strategy,
        credential.as_ref(),
        &config.music_dir,
        config.batch_options(),
        print_progress,
    )
    .await?;
    for (track, outcome) in selected.iter().zip(&summary.outcomes) {
        print_outcome(track, outcome);
    }
    finish(summary.succeeded, summary.failed, &config.music_dir)
}

async fn playlists(config: &Config, user_id: &str) -> Result<()> {
    let downloader = qmdl::downloader(config)?;
    let Some(credential) = load_credential(config, downloader.fetch()).await else {
        bail!("listing playlists requires a credential");
    };
    let lists = downloader
        .catalog()
        .user_playlists(user_id, &credential)
        .await?;
    if lists.is_empty() {
        println!("User {user_id} has no playlists");
        return Ok(());
    }
    println!("User {user_id} has {} playlist(s):", lists.len());
    list_playlists(&lists);
    Ok(())
}

async fn download_playlist(
    args: &Args,
    config: &Config,
    user_id: &str,
    selector: &str,
    no_user_prefix: bool,
    info_only: bool,
) -> Result<()> {
    let strategy = args.strategy()?;
    let downloader = qmdl::downloader(config)?;
    let Some(credential) = load_credential(config, downloader.fetch()).await else {
        bail!("downloading playlists requires a credential");
    };

    let lists = downloader
        .catalog()
        .user_playlists(user_id, &credential)
        .await?;
    let list = playlist::select(&lists, selector)?;
    let tracks = playlist::tracks(downloader.catalog(), list, user_id, Some(&credential)).await?;
    if tracks.is_empty() {
        println!("Playlist '{}' is empty", list.title);
        return Ok(());
    }

    println!("Playlist '{}' ({} songs):", list.title, tracks.len());
    list_tracks(&tracks);
    println!();
    if info_only {
        return Ok(());
    }

    let owner = (!no_user_prefix).then_some(user_id);
    let folder = playlist_folder(&config.music_dir, list, owner);
    println!("Downloading playlist '{}' ({} songs)", list.title, tracks.len());
    println!("Quality: {}", strategy.describe());

    let summary = download_many(
        &downloader,
        &tracks,
        &strategy,
        Some(&credential),
        &folder,
        config.batch_options(),
        print_progress,
    )
    .await?;
    for (track, outcome) in tracks.iter().zip(&summary.outcomes) {
        if matches!(outcome, Outcome::Failed) {
            print_outcome(track, outcome);
        }
    }
    finish(summary.succeeded, summary.failed, &folder)
}

fn finish(succeeded: usize, failed: usize, folder: &Path) -> Result<()> {
    println!();
    println!(
        "Total: {}, succeeded: {succeeded}, failed: {failed}",
        succeeded + failed
    );
    println!("Saved to: {}", folder.display());
    Ok(())
}

async fn credential(config: &Config, action: &CredentialAction) -> Result<()> {
    match action {
        CredentialAction::Status => {
            let Some(cred) = Credential::load(&config.credential_file).await? else {
                println!("No credential at {}", config.credential_file.display());
                return Ok(());
            };
            for (key, value) in cred.masked() {
                println!("{key}: {value}");
            }
            println!("expired: {}", cred.is_expired(chrono::Utc::now()));
            println!("refreshable: {}", cred.can_refresh());
        }
        CredentialAction::Fetch { endpoint } => {
            let http = HttpClient::new(config.timeout());
            let cred = Credential::fetch_remote(&http, endpoint).await?;
            cred.save(&config.credential_file).await?;
            println!(
                "Saved credential for {} to {}",
                cred.musicid,
                config.credential_file.display()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qmdl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.config().await?;

    match &args.command {
        Command::Search {
            keyword,
            limit,
            pick,
            all,
            info_only,
        } => search(&args, &config, keyword, *limit, pick, *all, *info_only).await,
        Command::Playlists { user_id } => playlists(&config, user_id).await,
        Command::Playlist {
            user_id,
            selector,
            no_user_prefix,
            info_only,
        } => {
            download_playlist(&args, &config, user_id, selector, *no_user_prefix, *info_only).await
        }
        Command::Credential { action } => credential(&config, action).await,
    }
}
