//! binlog2topic - binlog rows events as topic messages
//!
//! Reads newline-delimited JSON rows events from a file or stdin, subscribes
//! to the given topics and prints every delivered message as JSON.

use anyhow::{Context, Result, bail};
use binlog2topic::replication::JsonLinesStream;
use binlog2topic::{BinlogSubscriber, Message, SubscriberConfig};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "binlog2topic",
    about = "Deliver MySQL binlog rows events as topic messages",
    version = "0.1.0"
)]
struct Args {
    /// File of newline-delimited JSON rows events (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Topic to subscribe to; repeat for several topics
    #[arg(short, long = "topic", required = true)]
    topics: Vec<String>,

    /// Pretty-print delivered messages
    #[arg(long)]
    pretty: bool,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Serialize)]
struct Delivered<'a> {
    topic: &'a str,
    #[serde(flatten)]
    message: &'a Message,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn open_input(input: Option<&PathBuf>) -> Result<(String, Box<dyn AsyncBufRead + Unpin + Send>)> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("could not open {}", path.display()))?;
            Ok((path.display().to_string(), Box::new(BufReader::new(file))))
        }
        None => Ok(("stdin".to_string(), Box::new(BufReader::new(tokio::io::stdin())))),
    }
}

fn render(topic: &str, message: &Message, pretty: bool) -> serde_json::Result<String> {
    let delivered = Delivered { topic, message };
    if pretty {
        serde_json::to_string_pretty(&delivered)
    } else {
        serde_json::to_string(&delivered)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = SubscriberConfig::from_env()?;
    if config.initialize_schema {
        bail!("schema initialization needs a database connection and is not available from the command line");
    }
    info!(
        "Reserved schema: {}, emitting {} on {} topic(s)",
        config.reserved_schema,
        config.emit,
        args.topics.len()
    );

    let (name, reader) = open_input(args.input.as_ref()).await?;
    let stream = JsonLinesStream::new(name, reader);

    let mut builder = BinlogSubscriber::builder(config);
    for topic in &args.topics {
        builder = builder.topic(topic.clone());
    }
    let subscriber = builder.start(stream).await?;

    let mut printers = Vec::with_capacity(args.topics.len());
    for topic in args.topics {
        let subscription = subscriber.subscribe(&topic).await?;
        let pretty = args.pretty;
        printers.push(tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                match render(&topic, &message, pretty) {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("Could not render message {}: {}", message.uuid, e),
                }
            }
        }));
    }

    tokio::select! {
        _ = subscriber.stream_finished() => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    let result = subscriber.close().await;
    for printer in printers {
        printer.await?;
    }

    match result {
        Ok(()) => {
            info!("binlog2topic completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("binlog2topic failed: {}", e);
            Err(e.into())
        }
    }
}
