//! Browser assistant command-line interface.

pub mod handlers;
pub mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use assist_commands::{CommandExecutor, HandlerOutput, IntentParser};
use assist_library::{AssistConfig, Bookmark, Enrichment, Library, Output, OutputKind};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::handlers::{BUNDLED_REGISTRY, library_handlers};

/// Browser assistant: natural-language commands, bookmarks, and saved outputs
#[derive(Parser, Debug)]
#[command(name = "assist")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, env = "ASSIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for saved items, overrides the config file
    #[arg(long, env = "ASSIST_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a command and run the matching capability
    Run {
        /// What to do, in plain words
        text: String,
    },

    /// Show which capability a command resolves to, without running it
    Parse {
        /// What to do, in plain words
        text: String,
    },

    /// Manage bookmarks
    Bookmark(BookmarkArgs),

    /// Manage saved outputs
    Output(OutputArgs),

    /// Embed items that have no embedding and drop orphaned embeddings
    Reindex,

    /// List the command catalog
    Registry,
}

#[derive(Args, Debug)]
pub struct BookmarkArgs {
    #[command(subcommand)]
    pub command: BookmarkCommand,
}

#[derive(Subcommand, Debug)]
pub enum BookmarkCommand {
    /// Save a bookmark
    Add {
        /// Page url
        url: String,

        /// Page title
        #[arg(short, long)]
        title: String,

        /// Comma separated keywords
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Short summary of the page
        #[arg(long)]
        tldr: Option<String>,

        /// Favicon url
        #[arg(long)]
        favicon: Option<String>,
    },

    /// List bookmarks, newest first
    List,

    /// Rank bookmarks by similarity to a query
    Search {
        query: String,

        /// Maximum results
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Delete a bookmark by id
    Rm { id: String },
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    #[command(subcommand)]
    pub command: OutputCommand,
}

#[derive(Subcommand, Debug)]
pub enum OutputCommand {
    /// Save an output
    Add {
        /// summary, translation, write, rewrite, detect, prompt, or search_queries
        #[arg(short, long)]
        kind: OutputKind,

        /// Output text
        content: String,

        /// Prompt the output came from
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// List outputs, newest first
    List,

    /// Rank outputs by similarity to a query
    Search {
        query: String,

        /// Maximum results
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Delete an output by id
    Rm { id: String },
}

/// Resolve configuration from the CLI flags.
pub async fn load_config(cli: &Cli) -> anyhow::Result<AssistConfig> {
    let config = match &cli.config {
        Some(path) => AssistConfig::load(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AssistConfig::load_or_default(AssistConfig::default_path()).await?,
    };
    Ok(match &cli.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli).await?;
    debug!("Data directory: {}", config.storage.data_dir.display());
    let library = Arc::new(Library::open(&config).await?);

    match cli.command {
        Commands::Run { text } => {
            let parser = intent_parser(&config, library).await?;
            match parser.parse_command(&text).await? {
                Some(HandlerOutput::Empty) => println!("Done."),
                Some(output) => println!("{output}"),
                None => println!("No matching command for: {text}"),
            }
        }
        Commands::Parse { text } => {
            let parser = intent_parser(&config, library).await?;
            let call = parser.parse(&text).await?;
            println!("{}", serde_json::to_string_pretty(&call)?);
        }
        Commands::Bookmark(args) => bookmark(&library, args.command).await?,
        Commands::Output(args) => output(&library, args.command).await?,
        Commands::Reindex => {
            let report = library.reindex_missing().await?;
            let pruned = library.prune_orphans().await?;
            println!(
                "Indexed {}, failed {}, pruned {pruned}",
                report.indexed, report.failed
            );
        }
        Commands::Registry => {
            let registry = config.commands.registry(BUNDLED_REGISTRY).await?;
            let handlers = library_handlers(library);
            for entry in registry.entries() {
                let marker = if handlers.contains(&entry.name) { " " } else { "-" };
                let parameters: Vec<String> =
                    entry.parameters.iter().map(ToString::to_string).collect();
                println!(
                    "{marker} {}({})  {}",
                    entry.name,
                    parameters.join(", "),
                    entry.description
                );
            }
        }
    }

    Ok(())
}

async fn intent_parser(
    config: &AssistConfig,
    library: Arc<Library>,
) -> anyhow::Result<IntentParser> {
    let registry = Arc::new(config.commands.registry(BUNDLED_REGISTRY).await?);
    let executor = CommandExecutor::new(registry, library_handlers(library))
        .with_options(config.commands.executor_options());
    Ok(IntentParser::new(Arc::new(config.llm.model()), Arc::new(executor)))
}

async fn bookmark(library: &Library, command: BookmarkCommand) -> anyhow::Result<()> {
    match command {
        BookmarkCommand::Add {
            url,
            title,
            keywords,
            tldr,
            favicon,
        } => {
            let mut bookmark = Bookmark::new(url, title).with_keywords(keywords);
            if let Some(tldr) = tldr {
                bookmark = bookmark.with_tldr(tldr);
            }
            if let Some(favicon) = favicon {
                bookmark = bookmark.with_favicon(favicon);
            }
            let saved = library.save_bookmark(bookmark).await?;
            report_saved(&saved.item.id, &saved.enrichment);
        }
        BookmarkCommand::List => {
            for bookmark in library.bookmarks().await {
                println!("{}", render::bookmark_line(&bookmark));
            }
        }
        BookmarkCommand::Search { query, limit } => {
            for bookmark in library.search_bookmarks(&query).await?.iter().take(limit) {
                println!("{}", render::bookmark_line(bookmark));
            }
        }
        BookmarkCommand::Rm { id } => {
            if !library.delete_bookmark(&id).await? {
                println!("No bookmark {id}");
            }
        }
    }
    Ok(())
}

async fn output(library: &Library, command: OutputCommand) -> anyhow::Result<()> {
    match command {
        OutputCommand::Add {
            kind,
            content,
            prompt,
        } => {
            let mut output = Output::new(kind, content);
            if let Some(prompt) = prompt {
                output = output.with_prompt(prompt);
            }
            let saved = library.save_output(output).await?;
            report_saved(&saved.item.id, &saved.enrichment);
        }
        OutputCommand::List => {
            for output in library.outputs().await {
                println!("{}", render::output_line(&output));
            }
        }
        OutputCommand::Search { query, limit } => {
            for output in library.search_outputs(&query).await?.iter().take(limit) {
                println!("{}", render::output_line(output));
            }
        }
        OutputCommand::Rm { id } => {
            if !library.delete_output(&id).await? {
                println!("No output {id}");
            }
        }
    }
    Ok(())
}

fn report_saved(id: &str, enrichment: &Enrichment) {
    match enrichment {
        Enrichment::Indexed => println!("Saved {id}"),
        Enrichment::Skipped { reason } => {
            println!("Saved {id} (not indexed: {reason})");
        }
    }
}
