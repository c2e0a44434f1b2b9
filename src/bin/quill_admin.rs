//! Administration tool for Quill.
//!
//! # Usage
//!
//! ```bash
//! # Create a staff account
//! quill-admin create-author --username alice --email alice@example.com --password s3cretpass --staff
//!
//! # Fill a development database with fake content
//! quill-admin seed --users 5 --posts 20 --comments 60
//! ```
//!
//! Reads the same `config.yml` and `QUILL_*` variables as the server.
//! Seeded posts and comments are inserted already published, straight
//! through the repositories, so no notifications are sent.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use rand::seq::SliceRandom;
use rand::Rng;

use quill::config::Config;
use quill::db::{
    self,
    repositories::{CommentRepository, PostRepository, SqlxCommentRepository, SqlxPostRepository},
    DynDatabasePool,
};
use quill::models::{CreateAuthorInput, CreatePostInput, NewComment, GUEST_PREFIX};
use quill::services::AuthorService;

/// CLI tool for managing a Quill installation.
#[derive(Parser)]
#[command(name = "quill-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an author account
    CreateAuthor {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Allow the author to moderate comments and posts
        #[arg(long)]
        staff: bool,
    },

    /// Insert fake authors, published posts and published comments
    Seed {
        #[arg(long, default_value_t = 3)]
        users: usize,

        #[arg(long, default_value_t = 10)]
        posts: usize,

        #[arg(long, default_value_t = 30)]
        comments: usize,
    },
}

const SEED_PASSWORD: &str = "password123";

const WORDS: &[&str] = &[
    "river", "lantern", "orbit", "maple", "quartz", "harbor", "meadow", "signal", "copper",
    "winter", "garden", "engine", "canyon", "violet", "thunder", "paper", "summit", "echo",
];

const NAMES: &[&str] = &[
    "Alex", "Sam", "Robin", "Jordan", "Taylor", "Casey", "Morgan", "Riley", "Jamie", "Quinn",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_with_env(&cli.config)?;

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    db::migrations::run_migrations(&pool).await?;

    let result = match cli.command {
        Commands::CreateAuthor {
            username,
            email,
            password,
            staff,
        } => create_author(&pool, &config, username, email, password, staff).await,
        Commands::Seed {
            users,
            posts,
            comments,
        } => seed(&pool, &config, users, posts, comments).await,
    };

    pool.close().await;
    result
}

async fn create_author(
    pool: &DynDatabasePool,
    config: &Config,
    username: String,
    email: String,
    password: String,
    staff: bool,
) -> Result<()> {
    let service = AuthorService::from_pool(pool.clone(), config.session.expiration_days);

    let mut input = CreateAuthorInput::new(username, email, password);
    if staff {
        input = input.staff();
    }

    match service.create_author(input).await {
        Ok(author) => {
            println!("{}", "Author created".green().bold());
            println!("  {} {}", "ID:".dimmed(), author.id);
            println!("  {} {}", "Username:".dimmed(), author.username.cyan());
            println!("  {} {}", "Email:".dimmed(), author.email);
            println!(
                "  {} {}",
                "Staff:".dimmed(),
                if author.is_staff { "yes".yellow() } else { "no".normal() }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            Err(e.into())
        }
    }
}

fn sentence(rng: &mut impl Rng, words: usize) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(words);
    for _ in 0..words {
        out.push(WORDS.choose(rng).copied().unwrap_or("quill"));
    }
    let text = out.join(" ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => text,
    }
}

async fn seed(
    pool: &DynDatabasePool,
    config: &Config,
    users: usize,
    posts: usize,
    comments: usize,
) -> Result<()> {
    let authors = AuthorService::from_pool(pool.clone(), config.session.expiration_days);
    let post_repo = SqlxPostRepository::new(pool.clone());
    let comment_repo = SqlxCommentRepository::new(pool.clone());
    let mut rng = rand::thread_rng();

    println!("{}", "Seeding database".bright_blue().bold());

    let offset = authors.count().await?;
    let mut owner_ids = Vec::with_capacity(users);
    let mut labels = Vec::with_capacity(users);
    for i in 0..users {
        let username = format!("writer{}", offset + i as i64 + 1);
        let author = authors
            .create_author(CreateAuthorInput::new(
                username.clone(),
                format!("{}@example.com", username),
                SEED_PASSWORD,
            ))
            .await
            .with_context(|| format!("Failed to create author {}", username))?;
        owner_ids.push(author.id);
        labels.push(author.username);
    }
    println!("  {} {} authors (password: {})", "+".green(), users, SEED_PASSWORD);

    if owner_ids.is_empty() && posts > 0 {
        println!("{}", "  No authors to own posts; use --users".yellow());
        return Ok(());
    }

    let mut post_ids = Vec::with_capacity(posts);
    for _ in 0..posts {
        let owner_id = owner_ids[rng.gen_range(0..owner_ids.len())];
        let title_len = rng.gen_range(2..6);
        let input = CreatePostInput::new(
            sentence(&mut rng, title_len),
            sentence(&mut rng, 8),
            sentence(&mut rng, 60),
        )
        .published(true);
        post_ids.push(post_repo.create(owner_id, &input).await?.id);
    }
    println!("  {} {} published posts", "+".green(), posts);

    if post_ids.is_empty() {
        return Ok(());
    }

    for _ in 0..comments {
        let post_id = post_ids[rng.gen_range(0..post_ids.len())];
        // Mix registered and guest labels
        let author = match labels.choose(&mut rng) {
            Some(label) if rng.gen_bool(0.5) => label.clone(),
            _ => format!("{}{}", GUEST_PREFIX, NAMES.choose(&mut rng).copied().unwrap_or("Reader")),
        };
        let text_len = rng.gen_range(4..20);
        comment_repo
            .create(&NewComment {
                post_id,
                author,
                text: sentence(&mut rng, text_len),
                is_published: true,
            })
            .await?;
    }
    println!("  {} {} published comments", "+".green(), comments);

    println!("{}", "Done".green().bold());
    Ok(())
}
