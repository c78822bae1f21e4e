use anyhow::{bail, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use shared::domain::{NewPost, PostId};
use storage::Storage;

const SAMPLE_AUTHORS: [&str; 4] = ["Ada", "Grace", "Linus", "Barbara"];
const SAMPLE_TOPICS: [&str; 5] = ["async", "ownership", "traits", "macros", "lifetimes"];

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/posts.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert sample posts, each one a minute older than the previous.
    Seed {
        #[arg(default_value_t = 25)]
        count: u32,
    },
    Count,
    Delete {
        post_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Seed { count } => {
            let now = Utc::now();
            for index in 0..count {
                let post = sample_post(index as usize);
                let stamped = now - Duration::minutes(i64::from(index));
                let created = storage.create_post(&post, stamped).await?;
                println!("created post_id={} title={:?}", created.id, created.title);
            }
        }
        Command::Count => {
            println!("posts={}", storage.count_posts().await?);
        }
        Command::Delete { post_id } => {
            if !storage.delete_post(PostId(post_id)).await? {
                bail!("post {post_id} not found");
            }
            println!("deleted post_id={post_id}");
        }
    }

    Ok(())
}

fn sample_post(index: usize) -> NewPost {
    let topic = SAMPLE_TOPICS[index % SAMPLE_TOPICS.len()];
    let author = SAMPLE_AUTHORS[index % SAMPLE_AUTHORS.len()];
    NewPost::new(
        format!("Notes on {topic} #{}", index + 1),
        author,
        format!("{author} writes about {topic} in Rust."),
    )
}
