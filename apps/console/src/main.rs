mod commands;
mod render;

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{
        API_BASE_URL_ENV, DEFAULT_API_BASE_URL, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_DEBOUNCE,
        DEFAULT_SORT_FIELD, DEFAULT_SORT_ORDER,
    },
    FetchOutcome, HttpPostGateway, PostGateway, TableConfig, TableController, TableEvent,
    TableSnapshot,
};
use commands::{parse_line, ConsoleCommand, HELP};
use shared::domain::{NewPost, PostField, PostId, PostPatch, SortOrder};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast,
    task::JoinHandle,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "posts-console", about = "Browse and edit the posts collection")]
struct Args {
    #[arg(long, env = API_BASE_URL_ENV, default_value = DEFAULT_API_BASE_URL)]
    api_url: String,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,
    #[arg(long, default_value_t = DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64)]
    debounce_ms: u64,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive table browser (the default).
    Browse,
    /// Print one page and exit.
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_SORT_FIELD)]
        sort: PostField,
        #[arg(long, default_value_t = DEFAULT_SORT_ORDER)]
        order: SortOrder,
        #[arg(long, default_value = "")]
        search: String,
    },
    Show {
        post_id: i64,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        body: String,
    },
    Update {
        post_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    Delete {
        post_id: i64,
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config = TableConfig {
        page_size: args.page_size.max(1),
        search_debounce: Duration::from_millis(args.debounce_ms),
        request_timeout: args.timeout_secs.map(Duration::from_secs),
        ..TableConfig::default()
    };
    let gateway = Arc::new(HttpPostGateway::new(&args.api_url, config.request_timeout)?);
    info!(api_url = %gateway.base_url(), "posts console starting");

    match args.command.unwrap_or(Command::Browse) {
        Command::Browse => {
            let controller = TableController::new(gateway, config);
            browse(controller).await?;
        }
        Command::List {
            page,
            sort,
            order,
            search,
        } => {
            let mut view = config.initial_view();
            view.page = page.max(1);
            view.sort_by = sort;
            view.sort_order = order;
            view.search = search;
            let result = gateway.list(&view).await?;
            let snapshot = TableSnapshot {
                view,
                data: result.data,
                total: result.total,
                loading: false,
                error: None,
            };
            print!("{}", render::render_table(&snapshot));
        }
        Command::Show { post_id } => {
            let post = gateway.get(PostId(post_id)).await?;
            print!("{}", render::render_post(&post));
        }
        Command::Create {
            title,
            author,
            body,
        } => {
            let controller = TableController::new(gateway, config);
            let post = controller.create(NewPost::new(title, author, body)).await?;
            println!("created post {}", post.id);
        }
        Command::Update {
            post_id,
            title,
            author,
            body,
        } => {
            let patch = PostPatch {
                title,
                author,
                body,
            };
            if patch.is_empty() {
                bail!("nothing to update; pass --title, --author or --body");
            }
            let controller = TableController::new(gateway, config);
            let post = controller.update(PostId(post_id), patch).await?;
            print!("{}", render::render_post(&post));
        }
        Command::Delete { post_id, yes } => {
            if !yes {
                bail!("refusing to delete post {post_id} without --yes");
            }
            let controller = TableController::new(gateway, config);
            controller.delete(PostId(post_id)).await?;
            println!("deleted post {post_id}");
        }
    }

    Ok(())
}

async fn browse(controller: Arc<TableController>) -> Result<()> {
    let renderer = spawn_renderer(controller.subscribe_events());
    let search = controller.search_debouncer();
    println!("{HELP}");
    controller.load().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_delete: Option<PostId> = None;

    while let Some(line) = lines.next_line().await? {
        if let Some(post_id) = pending_delete.take() {
            if matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
                match controller.delete(post_id).await {
                    Ok(()) => println!("deleted post {post_id}"),
                    Err(err) => println!("delete failed: {err}"),
                }
            } else {
                println!("delete cancelled");
            }
            continue;
        }

        let command = match parse_line(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            ConsoleCommand::Page(page) => report(controller.set_page(page).await),
            ConsoleCommand::Next => report(controller.next_page().await),
            ConsoleCommand::Previous => report(controller.previous_page().await),
            ConsoleCommand::PageSize(size) => report(controller.set_page_size(size).await),
            ConsoleCommand::Sort(field) => report(controller.set_sort(field).await),
            ConsoleCommand::Search(text) => search.call(text),
            ConsoleCommand::Columns(columns) => controller.set_visible_columns(columns).await,
            ConsoleCommand::Toggle(field) => controller.toggle_column(field).await,
            ConsoleCommand::Refresh => report(controller.refetch().await),
            ConsoleCommand::Show(post_id) => match controller.fetch_post(post_id).await {
                Ok(post) => print!("{}", render::render_post(&post)),
                Err(err) => println!("could not load post {post_id}: {err}"),
            },
            ConsoleCommand::Create(post) => match controller.create(post).await {
                Ok(post) => println!("created post {}", post.id),
                Err(err) => println!("create failed: {err}"),
            },
            ConsoleCommand::Edit { post_id, patch } => {
                match controller.update(post_id, patch).await {
                    Ok(post) => println!("updated post {}", post.id),
                    Err(err) => println!("update failed: {err}"),
                }
            }
            ConsoleCommand::Delete(post_id) => match controller.fetch_post(post_id).await {
                Ok(post) => {
                    println!("delete post {post_id} \"{}\"? [y/N]", post.title);
                    pending_delete = Some(post_id);
                }
                Err(err) => println!("could not load post {post_id}: {err}"),
            },
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => break,
        }
    }

    search.shutdown().await;
    renderer.abort();
    Ok(())
}

fn report(outcome: FetchOutcome) {
    match outcome {
        FetchOutcome::Skipped => println!("no page in that direction"),
        FetchOutcome::Superseded => debug!("list response superseded by a newer request"),
        FetchOutcome::Applied | FetchOutcome::Failed(_) => {}
    }
}

/// Redraws the table whenever the controller settles into a new state.
fn spawn_renderer(mut events: broadcast::Receiver<TableEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TableEvent::StateChanged(snapshot)) if !snapshot.loading => {
                    print!("{}", render::render_table(&snapshot));
                }
                Ok(TableEvent::StateChanged(_)) => {}
                Ok(TableEvent::FetchFailed(message) | TableEvent::WriteFailed(message)) => {
                    debug!(%message, "controller reported a failure");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "renderer fell behind; waiting for the next state");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
