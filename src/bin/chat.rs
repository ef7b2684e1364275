//! Sends one prompt to the configured chat model and prints the reply.

use clap::Parser;
use inference_client::{ClientBuilder, Message};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Send one prompt to a chat completion backend", long_about = None)]
struct Cli {
    /// The user prompt
    #[arg(default_value = "Do you speak Chinese?")]
    prompt: String,

    /// Optional system instruction sent before the prompt
    #[arg(short, long)]
    system: Option<String>,

    /// Chat model to use instead of INFERENCE_CHAT_MODEL
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Maximum tokens to generate
    #[arg(short = 'n', long)]
    max_tokens: Option<usize>,
}

impl Cli {
    fn conversation(&self) -> Vec<Message> {
        self.system
            .iter()
            .map(Message::system)
            .chain([Message::user(&self.prompt)])
            .collect()
    }

    fn builder(&self) -> anyhow::Result<ClientBuilder> {
        let mut builder = ClientBuilder::from_environment()?;

        if let Some(model) = &self.model {
            builder = builder.chat_model(model.as_str());
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        Ok(builder)
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
    let client = cli.builder()?.build()?;
    let reply = client.complete(&cli.conversation()).await?;

    println!("{reply}");
    Ok(())
}

#[cfg(feature = "ureq")]
fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let client = cli.builder()?.build()?;
    let reply = client.complete(&cli.conversation())?;

    println!("{reply}");
    Ok(())
}
