//! Sync client CLI: upload, download, edit, cat, list, sync, and an
//! interactive line-oriented mode, against a running server.

use std::io::Write as _;

use clap::{Parser, Subcommand};
use rga_filesync::client::{EditSession, HttpClient, TransferClient};
use rga_filesync::config::{ClientConfig, load_or_create_site_id};
use rga_filesync::reconciler::{self, ReconcileAction};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a local file to the server.
    Upload { path: std::path::PathBuf },
    /// Download a file from the server into the sync directory.
    Download { name: String },
    /// Print a file's catalog metadata.
    Cat { name: String },
    /// List every live file known to the server.
    List,
    /// Reconcile the local sync directory against the server.
    Sync,
    /// Append text to a live document and print the resulting snapshot.
    Edit { doc: String, text: String },
    /// Read upload/download/cat/list/sync/edit commands from standard input,
    /// one per line, until a line reading `exit`.
    Interactive,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let site_id = load_or_create_site_id(&cli.config.sync_dir)?;
    let ws_url = cli.config.server_url.replacen("http", "ws", 1);

    if let Command::Interactive = cli.command {
        run_interactive(&cli.config, &site_id, &ws_url).await
    } else {
        run_command(cli.command, &cli.config, &site_id, &ws_url).await
    }
}

async fn run_interactive(config: &ClientConfig, site_id: &str, ws_url: &str) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    loop {
        print!("filesync> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        match parse_line(line) {
            Ok(command) => {
                if let Err(err) = run_command(command, config, site_id, ws_url).await {
                    eprintln!("error: {err}");
                }
            }
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

fn parse_line(line: &str) -> anyhow::Result<Command> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or_else(|| anyhow::anyhow!("empty command"))?;
    match verb {
        "upload" => {
            let path = words.next().ok_or_else(|| anyhow::anyhow!("usage: upload <path>"))?;
            Ok(Command::Upload { path: path.into() })
        }
        "download" => {
            let name = words.next().ok_or_else(|| anyhow::anyhow!("usage: download <name>"))?;
            Ok(Command::Download { name: name.to_string() })
        }
        "cat" => {
            let name = words.next().ok_or_else(|| anyhow::anyhow!("usage: cat <name>"))?;
            Ok(Command::Cat { name: name.to_string() })
        }
        "list" => Ok(Command::List),
        "sync" => Ok(Command::Sync),
        "edit" => {
            let doc = words.next().ok_or_else(|| anyhow::anyhow!("usage: edit <doc> <text>"))?;
            let text: Vec<&str> = words.collect();
            if text.is_empty() {
                anyhow::bail!("usage: edit <doc> <text>");
            }
            Ok(Command::Edit { doc: doc.to_string(), text: text.join(" ") })
        }
        other => anyhow::bail!("unknown command: {other}"),
    }
}

async fn run_command(
    command: Command,
    config: &ClientConfig,
    site_id: &str,
    ws_url: &str,
) -> anyhow::Result<()> {
    match command {
        Command::Upload { path } => {
            let bytes = std::fs::read(&path)?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("invalid file name"))?;
            let mut transfer = TransferClient::connect(&format!("{ws_url}/ws/transfer")).await?;
            let hash = transfer.upload(name, &bytes).await?;
            println!("uploaded {name} ({hash})");
        }
        Command::Download { name } => {
            let mut transfer = TransferClient::connect(&format!("{ws_url}/ws/transfer")).await?;
            let bytes = transfer.download(&name).await?;
            let dest = config.sync_dir.join(&name);
            std::fs::write(&dest, &bytes)?;
            println!("downloaded {name} ({} bytes)", bytes.len());
        }
        Command::Cat { name } => {
            let http = HttpClient::new(&config.server_url);
            match http.get_file_metadata(&name).await? {
                Some(meta) => println!("{meta:?}"),
                None => eprintln!("not found: {name}"),
            }
        }
        Command::List => {
            let http = HttpClient::new(&config.server_url);
            let files = http.list_files().await?;
            let mut stdout = std::io::stdout();
            for file in files {
                writeln!(stdout, "{}\t{}\t{}", file.name, file.version, file.hash)?;
            }
        }
        Command::Sync => {
            let local = reconciler::scan_local_tree(&config.sync_dir);
            let http = HttpClient::new(&config.server_url);
            let remote = http.list_files().await?;
            let actions = reconciler::plan(&local, &remote)?;

            let mut transfer = TransferClient::connect(&format!("{ws_url}/ws/transfer")).await?;
            for action in actions {
                match action {
                    ReconcileAction::Download { name } => {
                        let bytes = transfer.download(&name).await?;
                        std::fs::write(config.sync_dir.join(&name), &bytes)?;
                        println!("pulled {name}");
                    }
                    ReconcileAction::Upload { name, local_path } => {
                        let bytes = std::fs::read(&local_path)?;
                        transfer.upload(&name, &bytes).await?;
                        println!("pushed {name}");
                    }
                    ReconcileAction::InSync { name } => {
                        println!("{name} up to date");
                    }
                }
            }
        }
        Command::Edit { doc, text } => {
            let mut session =
                EditSession::connect(&format!("{ws_url}/ws/edit"), site_id, doc).await?;
            let mut index = session.read_local().chars().count();
            for ch in text.chars() {
                session.insert(index, ch).await?;
                index += 1;
            }
            println!("{}", session.read_local());
        }
        Command::Interactive => unreachable!("handled by run_interactive"),
    }
    Ok(())
}
