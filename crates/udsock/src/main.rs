//! udsock - command line front end for `udsock-core`.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use udsock_core::config::{Config, EndpointConfig};
use udsock_core::logging::{LogFormat, LogLevel, init_logging};
use udsock_core::{Domain, Endpoint};

/// Size of the length prefix `send` writes ahead of the payload.
const LEN_PREFIX: usize = std::mem::size_of::<u64>();

/// Poll interval for a listener configured as non-blocking.
const ACCEPT_POLL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "udsock", version)]
#[command(about = "Serve, ping and move data over unix domain sockets", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "UDSOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen and answer the ack handshake on every connection
    Serve {
        #[arg(long)]
        path: Option<PathBuf>,

        #[arg(long)]
        backlog: Option<i32>,

        /// Exit after the first connection
        #[arg(long)]
        once: bool,
    },
    /// Connect and exchange the ack handshake
    Ping {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Send a file to a `recv` listener
    Send {
        #[arg(long)]
        path: Option<PathBuf>,

        file: PathBuf,
    },
    /// Accept one connection and write the payload it carries
    Recv {
        #[arg(long)]
        path: Option<PathBuf>,

        /// Largest payload accepted, in bytes
        #[arg(long, default_value_t = 64 * 1024 * 1024)]
        max_len: u64,

        /// Write the payload here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level.as_str().to_string();
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_logging(&config.logging).context("initializing logging")?;

    let mut endpoint = config.endpoint;
    match cli.command {
        Commands::Serve {
            path,
            backlog,
            once,
        } => {
            if let Some(backlog) = backlog {
                endpoint.backlog = backlog;
            }
            override_path(&mut endpoint, path)?;
            serve(&endpoint, once)
        }
        Commands::Ping { path } => {
            override_path(&mut endpoint, path)?;
            ping(&endpoint)
        }
        Commands::Send { path, file } => {
            override_path(&mut endpoint, path)?;
            send(&endpoint, &file)
        }
        Commands::Recv {
            path,
            max_len,
            output,
        } => {
            override_path(&mut endpoint, path)?;
            recv(&endpoint, max_len, output.as_deref())
        }
    }
}

/// Apply a `--path` override, then validate the resulting settings.
fn override_path(endpoint: &mut EndpointConfig, path: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(path) = path {
        endpoint.path = path;
    }
    endpoint.validate()?;
    Ok(())
}

fn bind_listener(config: &EndpointConfig) -> anyhow::Result<Endpoint> {
    let mut listener = Endpoint::new(Domain::Unix, config.kind())?;
    listener.bind(&config.path)?;
    listener.listen(config.backlog)?;
    tracing::info!(path = %config.path.display(), "Listening");
    Ok(listener)
}

/// Blocking accept, polling when the listener is non-blocking. The accepted
/// connection is always blocking, like the client side of `connect`.
fn accept_one(listener: &Endpoint) -> anyhow::Result<(Endpoint, udsock_core::PeerAddr)> {
    loop {
        if let Some((mut conn, peer)) = listener.accept_with_addr()? {
            conn.set_nonblocking(false)?;
            return Ok((conn, peer));
        }
        std::thread::sleep(ACCEPT_POLL);
    }
}

fn connect(config: &EndpointConfig) -> anyhow::Result<Endpoint> {
    // Client sockets stay blocking whatever the listener settings say.
    let kind = config.kind().without(udsock_core::SocketFlags::NONBLOCK);
    let mut client = Endpoint::new(Domain::Unix, kind)?;
    client
        .connect(&config.path)
        .with_context(|| format!("connecting to {}", config.path.display()))?;
    Ok(client)
}

fn serve(config: &EndpointConfig, once: bool) -> anyhow::Result<()> {
    let listener = bind_listener(config)?;
    loop {
        let (conn, peer) = accept_one(&listener)?;
        let handshake = conn.recv_ack().and_then(|()| conn.send_ack());
        match handshake {
            Ok(()) => println!("ack exchanged with {peer}"),
            Err(err) if once => return Err(err.into()),
            Err(err) => tracing::warn!(%peer, error = %err, "Handshake failed"),
        }
        if once {
            return Ok(());
        }
    }
}

fn ping(config: &EndpointConfig) -> anyhow::Result<()> {
    let client = connect(config)?;
    client.send_ack()?;
    client.recv_ack()?;
    println!("ack from {}", config.path.display());
    Ok(())
}

fn send(config: &EndpointConfig, file: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let client = connect(config)?;
    client.send_all(&(data.len() as u64).to_ne_bytes())?;
    client.send_all(&data)?;
    println!("sent {} bytes to {}", data.len(), config.path.display());
    Ok(())
}

fn recv(config: &EndpointConfig, max_len: u64, output: Option<&Path>) -> anyhow::Result<()> {
    let listener = bind_listener(config)?;
    let (conn, peer) = accept_one(&listener)?;

    let mut prefix = [0u8; LEN_PREFIX];
    conn.recv_all(&mut prefix)?;
    let len = u64::from_ne_bytes(prefix);
    if len > max_len {
        bail!("peer {peer} announced {len} bytes, limit is {max_len}");
    }
    let len = usize::try_from(len).context("payload does not fit in memory")?;

    let mut payload = vec![0u8; len];
    conn.recv_all(&mut payload)?;
    tracing::info!(%peer, len, "Payload received");

    match output {
        Some(path) => {
            std::fs::write(path, &payload).with_context(|| format!("writing {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&payload)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
