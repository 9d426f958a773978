//! CLI entry point for `emlview`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};

use emlview::export::{attachment, html};
use emlview::model::mail::ParsedMessage;
use emlview::parser::eml::{read_eml, EmlParser};

#[derive(Parser)]
#[command(name = "emlview", version, about = "Parse and view .eml messages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sender, recipients, subject, date, body and attachments
    Show {
        path: PathBuf,
        /// Print the full parsed message as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract all attachments into a directory
    Attachments {
        path: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the HTML viewer page for a message
    Render {
        path: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = emlview::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let parser = EmlParser::new().max_depth(config.parser.max_depth);

    match cli.command {
        Commands::Show { path, json } => cmd_show(&parser, &path, json),
        Commands::Attachments { path, output } => cmd_attachments(&parser, &path, &output),
        Commands::Render { path, output } => cmd_render(&parser, &path, &output),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &emlview::config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = emlview::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "emlview.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn load(parser: &EmlParser, path: &Path) -> anyhow::Result<ParsedMessage> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let text = read_eml(path)?;
    Ok(parser.parse(&text)?)
}

/// Print a parsed message as a summary or as JSON.
fn cmd_show(parser: &EmlParser, path: &Path, json: bool) -> anyhow::Result<()> {
    let message = load(parser, path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&message)?);
        return Ok(());
    }

    println!();
    println!("  {:<10} {}", "From", message.from);
    println!("  {:<10} {}", "To", message.to.join(", "));
    println!("  {:<10} {}", "Subject", message.subject);
    println!(
        "  {:<10} {}",
        "Date",
        message.date.format("%a, %d %b %Y %H:%M:%S %z")
    );
    println!("  {}", "-".repeat(72));

    let body = if message.text.is_empty() && message.has_html() {
        html::html_to_text(&message.html)
    } else {
        message.text.clone()
    };
    println!();
    println!("{body}");

    if !message.attachments.is_empty() {
        println!();
        println!(
            "  [Attachments: {} file(s), {}]",
            message.attachments.len(),
            format_size(message.attachments_size(), BINARY)
        );
        for (i, att) in message.attachments.iter().enumerate() {
            println!(
                "  {:>3}  {} ({}, {})",
                i,
                att.filename,
                att.content_type,
                format_size(att.size, BINARY)
            );
        }
    }
    println!();

    Ok(())
}

/// Extract all attachments of a message.
fn cmd_attachments(parser: &EmlParser, path: &Path, output: &Path) -> anyhow::Result<()> {
    let message = load(parser, path)?;

    if message.attachments.is_empty() {
        println!("  No attachments found.");
        return Ok(());
    }

    let paths = attachment::export_attachments(&message, output)?;
    for p in &paths {
        println!("  {}", p.display());
    }
    println!(
        "  Extracted {} attachment(s) to {}",
        paths.len(),
        output.display()
    );
    Ok(())
}

/// Write the viewer page for a message.
fn cmd_render(parser: &EmlParser, path: &Path, output: &Path) -> anyhow::Result<()> {
    let message = load(parser, path)?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("message");

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, html::viewer_page(id, &message))?;
    println!("  Wrote {}", output.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "emlview", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
