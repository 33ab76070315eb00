//! exchange-client: sends NUL-delimited messages to an exchange server.
//!
//! Messages come from the command line, or one per line from stdin when
//! none are given.

use clap::Parser;
use exchange_server::framing;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the client
#[derive(Parser, Debug)]
#[command(name = "exchange-client")]
#[command(version = "0.1.0")]
#[command(about = "Send NUL-delimited messages to an exchange server", long_about = None)]
struct Args {
    /// Address of the exchange server
    #[arg(short, long, default_value = "127.0.0.1:25000")]
    server: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Messages to send; read from stdin when empty
    messages: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut stream = TcpStream::connect(&args.server).await?;
    info!(server = %args.server, "Connected");

    let mut sent = 0usize;
    if args.messages.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            sent += send(&mut stream, &line).await?;
        }
    } else {
        for message in &args.messages {
            sent += send(&mut stream, message).await?;
        }
    }

    stream.shutdown().await?;
    info!(sent, "Done");
    Ok(())
}

/// Write one framed message. Returns 1 if it was sent, 0 if skipped.
async fn send(stream: &mut TcpStream, message: &str) -> std::io::Result<usize> {
    match framing::encode(message.as_bytes()) {
        Ok(frame) => {
            stream.write_all(&frame).await?;
            info!(len = message.len(), "Sent: {message}");
            Ok(1)
        }
        Err(e) => {
            warn!(error = %e, "Skipping message");
            Ok(0)
        }
    }
}
