//! vidlearn - video learning platform in your terminal
//!
//! Browse the catalog, keep timestamped notes, and drive a player session
//! that survives switching between the theater and the floating player.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vidlearn::core::api::ApiClient;
use vidlearn::core::engine::EngineFactory;
use vidlearn::core::engine::headless::{HeadlessEmbeds, HeadlessMedia};
use vidlearn::core::session::{EngineStatus, PlaybackSessionStore, SessionVideo};
use vidlearn::core::source::{self, VideoSource};
use vidlearn::storage::cache::CatalogCache;
use vidlearn::storage::kv::JsonFileStore;
use vidlearn::storage::notes::NotesStore;
use vidlearn::storage::progress::ProgressStore;
use vidlearn::storage::config;
use vidlearn::types::{Config, CreateCommentPayload, CreateVideoPayload, PlayerMode, Rect, Video};
use vidlearn::ui::PlayerContext;
use vidlearn::ui::navigation::{App, Route};
use vidlearn::ui::selector;
use vidlearn::ui::slot::SlotElement;
use vidlearn::ui::viewport::{Key, KeyPress, Viewport, ViewportEvent};
use vidlearn::utils::display::{format_time, initials};
use vidlearn::utils::paths::{ensure_app_dirs, get_data_dir};

/// Video learning in your terminal.
#[derive(Parser, Debug)]
#[command(name = "vidlearn")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Edit the configuration file
    #[arg(short, long)]
    edit: bool,

    /// Remove cached catalog listings
    #[arg(long)]
    clear_cache: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List your videos
    Videos {
        /// Pick one and watch it
        #[arg(long)]
        pick: bool,
    },
    /// Pick a video from the catalog and watch it
    Browse,
    /// Show one video
    Video { id: String },
    /// Add a video to the catalog
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List comments on a video
    Comments { video: String },
    /// Comment on a video
    Comment { video: String, text: String },
    /// List notes on a video
    Notes { video: String },
    /// Add, edit or remove a note
    #[command(subcommand)]
    Note(NoteCommand),
    /// Show watch progress
    Progress { video: Option<String> },
    /// Classify a video URL
    Resolve { url: String },
    /// Play a video in a headless session
    Watch {
        video: String,
        /// Simulated length in seconds
        #[arg(long, default_value = "300")]
        duration: f64,
    },
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    Add {
        video: String,
        /// Seconds into the video
        timestamp: f64,
        text: String,
    },
    Edit {
        video: String,
        id: String,
        text: String,
    },
    Rm {
        video: String,
        id: String,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("VIDLEARN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(format!("vidlearn={}", default_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Run an API call behind a spinner
async fn with_spinner<T>(message: &str, call: impl Future<Output = T>) -> T {
    let spinner = spinner(message);
    let result = call.await;
    spinner.finish_and_clear();
    result
}

fn print_video(video: &Video) {
    println!("{}", video.title.bold());
    println!("  {} {}", "id:".dimmed(), video.id);
    println!(
        "  {} {} ({})",
        "url:".dimmed(),
        video.video_url,
        source::resolve(&video.video_url).label().cyan()
    );
    if !video.description.is_empty() {
        println!("  {}", video.description);
    }
}

struct Services {
    config: Config,
    api: ApiClient,
    cache: CatalogCache,
    notes: NotesStore,
    progress: ProgressStore,
}

impl Services {
    fn new(config: Config) -> Self {
        let kv = Arc::new(JsonFileStore::new(get_data_dir()));
        Self {
            api: ApiClient::new(&config.api_base_url),
            cache: CatalogCache::default(),
            notes: NotesStore::new(kv.clone()),
            progress: ProgressStore::new(kv),
            config,
        }
    }

    /// Live listing, or the cached one when the backend is down
    async fn videos(&self) -> anyhow::Result<Vec<Video>> {
        let user_id = &self.config.user_id;
        let fetched = with_spinner("Loading videos...", self.api.get_videos(user_id)).await;
        match fetched {
            Ok(videos) => {
                if let Err(e) = self
                    .cache
                    .store_videos(self.api.base_url(), user_id, &videos)
                    .await
                {
                    warn!(error = %e, "could not cache catalog");
                }
                Ok(videos)
            }
            Err(e) if e.is_retryable() => {
                match self.cache.videos(self.api.base_url(), user_id).await {
                    Some(videos) => {
                        eprintln!("{} {} (showing cached list)", "Warning:".yellow(), e);
                        Ok(videos)
                    }
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn pick_and_watch(&self) -> anyhow::Result<()> {
        let videos = self.videos().await?;
        if videos.is_empty() {
            println!("{}", "No videos yet.".yellow());
            return Ok(());
        }
        let Some(video) = selector::select(&selector::video_menu(videos), "Select Video") else {
            return Ok(());
        };
        watch(self, video, 300.0).await
    }
}

/// The terminal stands in for the page's player area
struct TerminalSlot;

impl SlotElement for TerminalSlot {
    fn bounding_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, 960.0, 540.0)
    }
}

fn print_status(store: &PlaybackSessionStore, duration: f64) {
    let session = store.snapshot();
    let icon = if session.is_playing { "▶" } else { "⏸" };
    let mode = match session.mode {
        PlayerMode::Theater => "theater".green(),
        PlayerMode::Floating => "floating".cyan(),
        PlayerMode::Hidden => "closed".dimmed(),
    };
    println!(
        "{} {} / {} [{}]",
        icon,
        format_time(session.current_time),
        format_time(duration),
        mode
    );
}

/// Drive a headless session from stdin until `q` or end of input.
///
/// Commands: `p` play/pause, `<`/`>` skip, `f` float, `e` expand, `c` close.
async fn watch(services: &Services, video: Video, duration: f64) -> anyhow::Result<()> {
    let engines = EngineFactory::new(
        Arc::new(HeadlessMedia::new(duration)),
        Arc::new(HeadlessEmbeds::new(duration)),
    )
    .with_poll_interval(Duration::from_millis(services.config.poll_interval_ms));
    let ctx = PlayerContext {
        store: PlaybackSessionStore::new(),
        engines,
        viewport: Viewport::new(1280.0, 720.0),
        progress: services.progress.clone(),
        notes: services.notes.clone(),
        controls: (&services.config).into(),
    };
    let mut app = App::new(ctx.clone());

    let session_video = SessionVideo::from(&video);
    app.open_video(session_video, Arc::new(TerminalSlot)).await;
    println!("{} {}", "Playing:".dimmed(), video.title);
    if let EngineStatus::Unavailable(reason) = ctx.store.engine_status() {
        println!("{} {}", "Unavailable:".red(), reason);
        return Ok(());
    }
    if let Some(message) = app.page().and_then(|p| p.unavailable()) {
        println!("{} {}", "Unavailable:".red(), message);
        return Ok(());
    }
    print_status(&ctx.store, duration);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session = ctx.store.watch();
    let mut last_second = -1;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let key = |k| ctx.viewport.dispatch(ViewportEvent::KeyDown(KeyPress::new(k)));
                match line.trim() {
                    "q" => break,
                    "p" => key(Key::Char('k')),
                    ">" => key(Key::ArrowRight),
                    "<" => key(Key::ArrowLeft),
                    "f" => app.navigate(Route::Catalog),
                    "e" => {
                        app.expand(Arc::new(TerminalSlot)).await;
                    }
                    "c" => app.close_floating(),
                    other => debug!(input = other, "ignored"),
                }
                print_status(&ctx.store, duration);
                if ctx.store.mode() == PlayerMode::Hidden {
                    break;
                }
            }
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                let second = session.borrow_and_update().current_time as i64;
                if second != last_second {
                    last_second = second;
                    print_status(&ctx.store, duration);
                }
            }
        }
    }

    app.navigate(Route::Catalog);
    app.close_floating();
    Ok(())
}

async fn run(cli: Cli, services: Services) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        return services.pick_and_watch().await;
    };

    match command {
        Command::Videos { pick: true } | Command::Browse => services.pick_and_watch().await?,
        Command::Videos { pick: false } => {
            let videos = services.videos().await?;
            if videos.is_empty() {
                println!("{}", "No videos yet.".yellow());
            }
            for video in videos {
                println!("{}  {}", video.id.dimmed(), selector::video_label(&video));
            }
        }
        Command::Video { id } => {
            let video = with_spinner("Loading video...", services.api.get_video(&id)).await?;
            print_video(&video);
            if let Some(progress) = services.progress.progress(&video.id) {
                println!("  {} {:.0}%", "watched:".dimmed(), progress.watched_percent());
            }
        }
        Command::Create {
            title,
            url,
            description,
        } => {
            let payload = CreateVideoPayload {
                user_id: services.config.user_id.clone(),
                title,
                description,
                video_url: url,
            };
            let video =
                with_spinner("Creating video...", services.api.create_video(&payload)).await?;
            println!("{} {}", "Created:".green(), video.id);
        }
        Command::Comments { video } => {
            let comments =
                with_spinner("Loading comments...", services.api.get_comments(&video)).await?;
            if comments.is_empty() {
                println!("{}", "No comments yet.".yellow());
            }
            for comment in comments {
                println!(
                    "{} {}",
                    format!("[{}]", initials(&comment.user_id, 2)).cyan(),
                    comment.content
                );
            }
        }
        Command::Comment { video, text } => {
            let payload = CreateCommentPayload {
                video_id: video,
                user_id: services.config.user_id.clone(),
                content: text,
            };
            with_spinner("Posting comment...", services.api.create_comment(&payload)).await?;
            println!("{}", "Comment posted.".green());
        }
        Command::Notes { video } => {
            let notes = services.notes.notes(&video);
            if notes.is_empty() {
                println!("{}", "No notes yet.".yellow());
            }
            for note in notes {
                println!(
                    "{} {} {}",
                    format_time(note.timestamp).green(),
                    note.content,
                    note.id.dimmed()
                );
            }
        }
        Command::Note(NoteCommand::Add {
            video,
            timestamp,
            text,
        }) => {
            let note = services.notes.add_note(&video, &text, timestamp)?;
            println!("{} {}", "Added:".green(), note.id);
        }
        Command::Note(NoteCommand::Edit { video, id, text }) => {
            services.notes.update_note(&video, &id, &text)?;
            println!("{}", "Note updated.".green());
        }
        Command::Note(NoteCommand::Rm { video, id }) => {
            services.notes.delete_note(&video, &id);
            println!("{}", "Note removed.".green());
        }
        Command::Progress { video: Some(video) } => match services.progress.progress(&video) {
            Some(p) => println!(
                "{} / {} ({:.0}%{})",
                format_time(p.current_time),
                format_time(p.duration),
                p.watched_percent(),
                if p.completed { ", completed" } else { "" }
            ),
            None => println!("{}", "Not started.".yellow()),
        },
        Command::Progress { video: None } => {
            for (id, p) in services.progress.all_progress() {
                println!("{}  {:.0}%", id.dimmed(), p.watched_percent());
            }
        }
        Command::Resolve { url } => match source::resolve(&url) {
            VideoSource::Embedded { id, embed_url } => {
                println!("{} {} {}", "YouTube".cyan(), id, embed_url.dimmed())
            }
            VideoSource::Direct { url } => println!("{} {}", "Direct Link".cyan(), url),
            VideoSource::Invalid { reason } => println!("{} {}", "Invalid:".red(), reason),
        },
        Command::Watch { video, duration } => {
            let video = with_spinner("Loading video...", services.api.get_video(&video)).await?;
            watch(&services, video, duration).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Ensure app directories exist
    ensure_app_dirs().await?;

    // Handle --edit flag
    if cli.edit {
        let cfg = config::load_config().await?;
        config::edit_config(&cfg.editor).await?;
        return Ok(());
    }

    let cfg = config::load_config().await?;
    init_tracing(&cfg.log_level);

    if cli.clear_cache {
        CatalogCache::default().clear().await?;
        println!("{}", "Cache cleared.".green());
        return Ok(());
    }

    if let Err(e) = run(cli, Services::new(cfg)).await {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }
    Ok(())
}
