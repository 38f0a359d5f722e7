//! Medialog priority list (medialog-pl) - command-line front end
//!
//! Manages categories, series and items, prints the priority list as
//! blocks, and moves entries the way a drag and drop on the board would.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medialog_common::events::{EventBus, ItemStatus};
use medialog_pl::config::Config;
use medialog_pl::db::items::{self, NewItem};
use medialog_pl::db::{OrderStore, SqliteOrderStore};
use medialog_pl::order::{Block, DragId, Scope};
use medialog_pl::{PriorityBoard, SyncOutcome, SyncQueue};
use sqlx::{Pool, Sqlite};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for medialog-pl
#[derive(Parser, Debug)]
#[command(name = "medialog-pl")]
#[command(about = "Priority list for tracked movies, anime, games and manga")]
#[command(version)]
struct Args {
    /// Folder holding the database
    #[arg(short, long, global = true, env = "MEDIALOG_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// User id (defaults to the local user)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and default categories
    Init,

    AddCategory {
        name: String,
    },

    AddSeries {
        name: String,
        #[arg(long)]
        category: Uuid,
    },

    AddItem {
        title: String,
        #[arg(long)]
        category: Uuid,
        #[arg(long)]
        series: Option<Uuid>,
        /// planned, in_progress, on_hold or completed
        #[arg(long, default_value = "planned")]
        status: String,
        #[arg(long)]
        rating: Option<f64>,
        #[arg(long)]
        why: Option<String>,
        /// Cover image URL (http or https)
        #[arg(long)]
        thumbnail: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Change an item's status
    Status {
        item: Uuid,
        status: String,
    },

    /// Print the priority list, globally or for one category
    List {
        #[arg(long)]
        category: Option<Uuid>,
    },

    /// Drop `moved` onto `target`; series handles are `series-handle:<uuid>`
    Move {
        moved: String,
        target: String,
        #[arg(long)]
        category: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        let message = match e.downcast_ref::<medialog_pl::Error>() {
            Some(err) => err.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.root_folder.as_deref(), args.user.as_deref())?;

    // Logs go to stderr so listings on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Root folder: {}", config.root_folder.display());

    let db = medialog_common::db::init_database(&config.db_path)
        .await
        .context("Failed to open database")?;
    let user_id = config.user_id;

    match args.command {
        Command::Init => {
            items::ensure_user(&db, user_id).await?;
            items::ensure_default_categories(&db, user_id).await?;
            for category in items::list_categories(&db, user_id).await? {
                println!("{}  {}", category.id, category.name);
            }
        }
        Command::AddCategory { name } => {
            let id = items::create_category(&db, user_id, &name).await?;
            println!("{}", id);
        }
        Command::AddSeries { name, category } => {
            let id = items::create_series(&db, user_id, &name, category).await?;
            println!("{}", id);
        }
        Command::AddItem {
            title,
            category,
            series,
            status,
            rating,
            why,
            thumbnail,
            tags,
        } => {
            let mut item = NewItem::new(title, category).with_status(parse_status(&status)?);
            item.series_id = series;
            item.rating = rating;
            item.why_interested = why;
            item.thumbnail_url = thumbnail;
            item.tags = tags;

            let id = items::create_item(&db, user_id, item).await?;
            println!("{}", id);
        }
        Command::Status { item, status } => {
            items::update_status(&db, user_id, item, parse_status(&status)?).await?;
        }
        Command::List { category } => {
            let store = SqliteOrderStore::new(db.clone());
            let mut board = PriorityBoard::load(&db, &store, user_id).await?;
            board.set_filter(scope_for(category));
            print_board(&db, user_id, &board).await?;
        }
        Command::Move {
            moved,
            target,
            category,
        } => {
            let moved: DragId = moved.parse()?;
            let target: DragId = target.parse()?;
            move_entry(&db, user_id, scope_for(category), &moved, &target).await?;
        }
    }

    Ok(())
}

fn scope_for(category: Option<Uuid>) -> Scope {
    category.map(Scope::Category).unwrap_or(Scope::Global)
}

fn parse_status(value: &str) -> medialog_pl::Result<ItemStatus> {
    ItemStatus::from_str(value)
        .ok_or_else(|| medialog_pl::Error::Validation(format!("Unknown status '{}'", value)))
}

async fn move_entry(
    db: &Pool<Sqlite>,
    user_id: Uuid,
    scope: Scope,
    moved: &DragId,
    target: &DragId,
) -> Result<()> {
    let store: Arc<dyn OrderStore> = Arc::new(SqliteOrderStore::new(db.clone()));
    let mut board = PriorityBoard::load(db, store.as_ref(), user_id).await?;
    board.set_filter(scope);

    let Some((scope, order)) = board.apply_drag(moved, target) else {
        println!("Order unchanged");
        return Ok(());
    };

    let capacity = medialog_common::db::event_bus_capacity(db).await?;
    let queue = SyncQueue::new(store, user_id, EventBus::new(capacity));
    let outcome = queue.submit(scope, order.clone()).await.outcome().await;
    board.reconcile(scope, &order, &outcome);

    match outcome {
        SyncOutcome::Persisted(_) => print_board(db, user_id, &board).await,
        SyncOutcome::Superseded => Ok(()),
        SyncOutcome::Failed(message) => Err(anyhow::anyhow!(message)),
    }
}

async fn print_board(db: &Pool<Sqlite>, user_id: Uuid, board: &PriorityBoard) -> Result<()> {
    let titles: HashMap<Uuid, String> = items::list_active_items(db, user_id)
        .await?
        .into_iter()
        .map(|item| (item.id, item.title))
        .collect();
    let series_names: HashMap<Uuid, String> = items::list_series(db, user_id)
        .await?
        .into_iter()
        .map(|series| (series.id, series.name))
        .collect();
    let title = |id: &Uuid| titles.get(id).map(String::as_str).unwrap_or("?");

    for (index, block) in board.blocks().iter().enumerate() {
        match block {
            Block::Single { item_id } => {
                println!("{:>3}. {}  {}", index + 1, title(item_id), item_id);
            }
            Block::Series { series_id, item_ids } => {
                let name = series_names.get(series_id).map(String::as_str).unwrap_or("?");
                println!(
                    "{:>3}. [{}]  {}{}",
                    index + 1,
                    name,
                    medialog_pl::order::SERIES_HANDLE_PREFIX,
                    series_id
                );
                for id in item_ids {
                    println!("       - {}  {}", title(id), id);
                }
            }
        }
    }

    Ok(())
}
