mod config;
mod draft;
mod edits;

use std::{io::BufRead, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    verification::{excerpt, page_slice, EXCERPT_CHARS, ITEMS_PER_PAGE},
    FileTokenStore, HttpAuthClient, HttpPostsClient, PostsApi, ReviewSession, SaveOutcome,
    Session, SourceLookup, VerificationQueue,
};
use shared::{domain::PostId, protocol::PostRecord};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "annotator", about = "Annotate and review social media sentiment")]
struct Args {
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Overrides the configured auth base URL.
    #[arg(long, global = true)]
    auth_url: Option<String>,
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the access token.
    Login {
        username: String,
        /// Falls back to ANNOTATOR_PASSWORD, then a line on stdin.
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    /// Dashboard counters.
    Stats,
    /// One page of the verification queue.
    List {
        #[arg(value_enum, default_value_t = ListKind::All)]
        kind: ListKind,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Suggest known sources for a prefix.
    Sources { prefix: String },
    Export {
        #[arg(long, default_value = "posts_export.csv")]
        out: PathBuf,
    },
    /// Create a post from a JSON draft.
    Submit { draft: PathBuf },
    /// Mark a post reviewed without changes.
    Approve { id: i64 },
    /// Apply edits to a post, optionally undo the last few, then save it.
    Review {
        id: i64,
        #[arg(long)]
        edits: PathBuf,
        #[arg(long, default_value_t = 0)]
        undo: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ListKind {
    All,
    Unreviewed,
    Reviewed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(v) = args.api_url {
        settings.api_url = v;
    }
    if let Some(v) = args.auth_url {
        settings.auth_url = v;
    }
    if let Some(v) = args.token_path {
        settings.token_path = v;
    }
    let client_config = settings.client_config()?;
    info!(api = %client_config.api_base_url, auth = %client_config.auth_base_url, "annotator starting");

    let session = Arc::new(Session::new(
        Arc::new(HttpAuthClient::new(&client_config)?),
        Box::new(FileTokenStore::new(settings.token_path.clone())),
    ));
    let posts: Arc<dyn PostsApi> = Arc::new(HttpPostsClient::new(
        &client_config,
        Arc::clone(&session),
    )?);

    match args.command {
        Command::Login { username, password } => {
            let password = match password.or_else(|| std::env::var("ANNOTATOR_PASSWORD").ok()) {
                Some(password) => password,
                None => read_password_line()?,
            };
            match session.login(&username, &password).await {
                Ok(user) => println!("Signed in as {}", user.username),
                Err(_) => bail!(session
                    .last_error()
                    .unwrap_or_else(|| "Login failed".to_string())),
            }
        }
        Command::Logout => {
            session.logout();
            println!("Signed out");
        }
        Command::Whoami => {
            if session.init().await {
                if let Some(user) = session.user() {
                    println!("{} <{}> (id {})", user.username, user.email, user.id);
                }
            } else {
                println!("Not signed in");
            }
        }
        command => {
            require_login(&session).await?;
            run_signed_in(command, &posts).await?;
        }
    }

    Ok(())
}

async fn require_login(session: &Session) -> Result<()> {
    if session.init().await {
        Ok(())
    } else {
        bail!("not signed in; run `annotator login <username>` first")
    }
}

async fn run_signed_in(command: Command, posts: &Arc<dyn PostsApi>) -> Result<()> {
    match command {
        Command::Stats => {
            let stats = posts.dashboard_stats().await?;
            println!(
                "posts: {}  comments: {}  sources: {}",
                stats.total_posts, stats.total_comments, stats.sources_count
            );
            for day in &stats.last_seven_days {
                println!("  {}  {}", day.date, day.count);
            }
            for source in &stats.top_sources {
                println!("  {:<24} {}", source.name, source.count);
            }
        }
        Command::List { kind, page } => {
            let mut queue = VerificationQueue::new();
            queue.refresh(&**posts).await?;
            match kind {
                ListKind::All => {
                    for post in queue.page(page) {
                        print_post(post);
                    }
                    println!("page {page} of {}", queue.page_count().max(1));
                }
                ListKind::Unreviewed => print_page(queue.unreviewed(), page),
                ListKind::Reviewed => print_page(queue.reviewed(), page),
            }
        }
        Command::Sources { prefix } => {
            let lookup = SourceLookup::new(Arc::clone(posts));
            for source in lookup.suggest(&prefix).await? {
                println!("{} ({} uses)", source.name, source.usage_count);
            }
        }
        Command::Export { out } => {
            let csv = posts.export_csv().await?;
            std::fs::write(&out, csv)
                .with_context(|| format!("failed to write '{}'", out.display()))?;
            println!("Exported to {}", out.display());
        }
        Command::Submit { draft } => {
            let payload = draft::read_draft(&draft)?;
            let mut form = draft::fill_form(&payload)?;
            let created = form.submit(&**posts).await?;
            println!("Created post {}", created.id);
        }
        Command::Approve { id } => {
            let mut queue = VerificationQueue::new();
            let reviewed = queue.approve(&**posts, PostId(id)).await?;
            println!("Post {} is {}", reviewed.id, reviewed.status);
        }
        Command::Review { id, edits, undo } => {
            let edits = edits::read_edits(&edits)?;
            let mut queue = VerificationQueue::new();
            queue.refresh(&**posts).await?;
            let post = queue
                .take_for_review(PostId(id))
                .with_context(|| format!("post {id} is not in the verification queue"))?;

            let review = ReviewSession::new();
            review.load(post);
            for edit in &edits {
                review.edit(|post| edit.apply(post));
            }
            for _ in 0..undo {
                review.undo();
            }

            match review.save(&**posts).await? {
                SaveOutcome::Persisted {
                    record,
                    marked_reviewed,
                } => {
                    println!(
                        "Saved post {} after {} of {} edits{}",
                        record.id,
                        review.cursor(),
                        edits.len(),
                        if marked_reviewed {
                            " and marked it reviewed"
                        } else {
                            ""
                        }
                    );
                    queue.record_saved(record);
                }
                SaveOutcome::AlreadySaving | SaveOutcome::AlreadySaved => {
                    println!("Nothing saved");
                }
            }
        }
        Command::Login { .. } | Command::Logout | Command::Whoami => {}
    }
    Ok(())
}

fn print_page(posts: &[PostRecord], page: usize) {
    for post in page_slice(posts, page) {
        print_post(post);
    }
    println!(
        "page {page} of {}",
        posts.len().div_ceil(ITEMS_PER_PAGE).max(1)
    );
}

fn print_post(post: &PostRecord) {
    println!(
        "#{:<5} [{}] {:<16} {}",
        post.id,
        post.status,
        post.source,
        excerpt(&post.caption, EXCERPT_CHARS)
    );
}

fn read_password_line() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
