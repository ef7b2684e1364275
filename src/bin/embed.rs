//! Prints the embedding of one text as a JSON array.

use clap::Parser;
use inference_client::{Client, ClientBuilder, EmbeddingModel};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Print the embedding vector of a text as JSON", long_about = None)]
struct Cli {
    /// Text to encode; the empty string when absent
    #[arg(default_value = "")]
    text: String,

    /// Embedding model to use instead of INFERENCE_EMBEDDING_MODEL
    #[arg(short, long)]
    model: Option<String>,
}

impl Cli {
    fn client(&self) -> anyhow::Result<(Client, EmbeddingModel)> {
        let client = ClientBuilder::from_environment()?.build()?;
        let model = self
            .model
            .as_deref()
            .map(EmbeddingModel::from)
            .unwrap_or_else(|| client.embedding_model().clone());

        Ok((client, model))
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "reqwest")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let (client, model) = cli.client()?;
    let vector = client.embed_with_model(&cli.text, &model).await?;

    println!("{}", serde_json::to_string(&vector)?);
    Ok(())
}

#[cfg(feature = "ureq")]
fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let (client, model) = cli.client()?;
    let vector = client.embed_with_model(&cli.text, &model)?;

    println!("{}", serde_json::to_string(&vector)?);
    Ok(())
}
