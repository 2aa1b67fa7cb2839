use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use mdbase_common::config::{FileStore, config_path};
use mdbase_common::export::ExportFormat;
use mdbase_common::telemetry::{self, TelemetryConfig};
use mdbase_common::{Config, JsonFileStore};
use mdbase_editor_core::{DocumentStats, EditorSession, outline};
use mdbase_markdown::{EditorSurface, parse_markdown, read_markup, to_markdown, write_html_io};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::Level;

#[derive(Parser)]
#[command(version, about = "mdbase - Markdown editor core and document library", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a .toml or .json config file
    #[arg(long, env = "MDBASE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the document store (overrides the config)
    #[arg(long, env = "MDBASE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render Markdown to editor markup
    Render {
        /// Markdown file, `-` for stdin
        input: PathBuf,
    },
    /// Convert editor markup back to Markdown
    ToMarkdown {
        /// Markup file, `-` for stdin
        input: PathBuf,
    },
    /// Word count and reading time of a Markdown file
    Stats {
        /// Markdown file, `-` for stdin
        input: PathBuf,
    },
    /// Heading outline of a Markdown file
    Outline {
        /// Markdown file, `-` for stdin
        input: PathBuf,
    },
    /// Export a stored document as Markdown or standalone HTML
    Export {
        /// `md` or `html`
        #[arg(long, short, default_value = "md")]
        format: ExportFormat,
        /// Document id, defaults to the active document
        #[arg(long)]
        id: Option<String>,
        /// Output directory
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
    },
    /// Manage the document library
    Docs {
        #[command(subcommand)]
        command: DocsCommand,
    },
}

#[derive(Subcommand)]
enum DocsCommand {
    /// List documents, active one marked with `*`
    List,
    /// Create an empty document and make it active
    New,
    /// Print a document as Markdown
    Show {
        /// Document id, defaults to the active document
        id: Option<String>,
    },
    /// Make a document active
    Switch { id: String },
    /// Delete a document
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Create a document from a Markdown file
    Import {
        /// Markdown file, `-` for stdin
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    init_miette();
    let cli = Cli::parse();

    let mut telemetry_config = TelemetryConfig::from_env("mdbase-cli");
    if cli.verbose {
        telemetry_config = telemetry_config.with_level(Level::DEBUG);
    }
    telemetry::init(telemetry_config);

    let mut config = load_config(cli.config.as_deref())?;
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir;
    }

    match cli.command {
        Commands::Render { input } => {
            let surface = parse_markdown(&read_input(&input)?);
            write_html_io(std::io::stdout().lock(), &surface)?;
        }
        Commands::ToMarkdown { input } => {
            let surface = read_markup(&read_input(&input)?);
            println!("{}", to_markdown(&surface));
        }
        Commands::Stats { input } => {
            let surface = parse_markdown(&read_input(&input)?);
            let stats = DocumentStats::of(&surface, config.words_per_minute);
            println!("{} words", stats.words);
            println!("{} min read", stats.reading_minutes);
        }
        Commands::Outline { input } => print_outline(&parse_markdown(&read_input(&input)?)),
        Commands::Export { format, id, output } => {
            let mut session = open_session(&config)?;
            if let Some(id) = id {
                session.switch_document(&id)?;
            }
            let export = session.export(format);
            std::fs::create_dir_all(&output).into_diagnostic()?;
            let path = output.join(&export.filename);
            std::fs::write(&path, export.contents).into_diagnostic()?;
            println!("✓ Exported {} ({})", path.display(), export.mime);
        }
        Commands::Docs { command } => docs(command, &config)?,
    }

    Ok(())
}

fn docs(command: DocsCommand, config: &Config) -> Result<()> {
    let mut session = open_session(config)?;
    match command {
        DocsCommand::List => {
            let active = session.library().active_id().map(str::to_string);
            for doc in session.library().documents() {
                let marker = if active.as_deref() == Some(doc.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {}  {}", doc.id, doc.display_title());
            }
        }
        DocsCommand::New => {
            session.new_document()?;
            if let Some(doc) = session.active() {
                println!("✓ Created {}", doc.id);
            }
        }
        DocsCommand::Show { id } => {
            let doc = match id {
                Some(id) => session.library().get(&id),
                None => session.active(),
            };
            let doc = doc.ok_or_else(|| miette::miette!("No such document"))?;
            println!("{}", to_markdown(&read_markup(&doc.content)));
        }
        DocsCommand::Switch { id } => {
            session.switch_document(&id)?;
            println!("✓ Active: {id}");
        }
        DocsCommand::Delete { id, yes } => {
            session.delete_document(&id, |_| yes)?;
            println!("✓ Deleted {id}");
        }
        DocsCommand::Import { input } => {
            let markdown = read_input(&input)?;
            session.new_document()?;
            session.engine_mut().replace_source_text(&markdown);
            session.persist()?;
            if let Some(doc) = session.active() {
                println!("✓ Imported {} as {}", doc.display_title(), doc.id);
            }
        }
    }
    Ok(())
}

fn print_outline(surface: &EditorSurface) {
    let entries = outline(surface);
    if entries.is_empty() {
        println!("No headings");
        return;
    }
    for entry in entries {
        let indent = "  ".repeat(usize::from(entry.level.saturating_sub(1)));
        println!("{indent}{}  #{}", entry.text, entry.anchor);
    }
}

fn open_session(config: &Config) -> Result<EditorSession<JsonFileStore>> {
    let path = config.store_path();
    tracing::debug!(path = %path.display(), "opening document store");
    let store = JsonFileStore::open(&path)?;
    Ok(EditorSession::open(store, config, None)?)
}

/// Explicit path first, then the platform config file, then defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(&FileStore::new(path))?),
        None => {
            let path = config_path();
            if path.exists() {
                Ok(Config::load(&FileStore::new(path))?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
        return Ok(buf);
    }
    std::fs::read_to_string(input)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", input.display()))
}

fn init_miette() {
    // A hook is already installed when this fails; keep it.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    miette::set_panic_hook();
}
