use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::path::PathBuf;
use std::process;
use todostore::{Backend, Config, Filter, KeyValueStore, Task, Theme, TodoStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "todostore CLI - Add, complete, edit, reorder and filter persisted tasks")]
#[command(version)]
struct Cli {
    /// Path to the config file (default: ~/.config/todostore/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the stored tasks, overrides the config file
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend, overrides the config file
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task to the end of the list
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show tasks
    List {
        #[arg(short, long, value_enum, default_value_t = Filter::All)]
        filter: Filter,

        /// Also show ids with their creation time
        #[arg(short, long)]
        verbose: bool,
    },

    /// Flip a task between completed and not completed
    Toggle { id: i64 },

    /// Remove a task
    Remove { id: i64 },

    /// Replace a task's text
    Edit {
        id: i64,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Move a task into another task's position
    Move { dragged: i64, target: i64 },

    /// Remove all completed tasks
    ClearCompleted,

    /// Show or toggle the light/dark theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    Show,
    Toggle,
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if !config.color {
        colored::control::set_override(false);
    }

    let mut store = TodoStore::hydrate(config.open_storage()?);

    match cli.command {
        Commands::Add { text } => {
            if let Some(id) = store.add(&text.join(" "))? {
                println!("Added {}", id.to_string().cyan());
            }
        }
        Commands::List { filter, verbose } => {
            let counts = store.counts();
            for task in store.filtered_view(filter) {
                println!("{}", render_task(task, verbose));
            }
            println!(
                "{}",
                format!(
                    "{} total, {} completed, {} remaining",
                    counts.total, counts.completed, counts.incomplete
                )
                .dimmed()
            );
        }
        Commands::Toggle { id } => {
            if !store.toggle_completed(id)? {
                not_found(id);
            }
        }
        Commands::Remove { id } => {
            if !store.remove(id)? {
                not_found(id);
            }
        }
        Commands::Edit { id, text } => {
            if store.edit_todo(id)? {
                store.set_edit_text(id, text.join(" "))?;
                store.save_edit(id)?;
            } else {
                not_found(id);
            }
        }
        Commands::Move { dragged, target } => {
            if !store.reorder(dragged, target)? {
                println!("Nothing to move");
            }
        }
        Commands::ClearCompleted => {
            let removed = store.clear_completed()?;
            println!("Removed {} completed task(s)", removed);
        }
        Commands::Theme { action } => {
            let kv: &mut dyn KeyValueStore = store.storage_mut();
            let theme = match action.unwrap_or(ThemeAction::Show) {
                ThemeAction::Show => Theme::load(&*kv),
                ThemeAction::Toggle => Theme::toggle(kv)?,
            };
            println!("{}", theme);
        }
    }

    if let Some(message) = store.message() {
        eprintln!("{}", message.red());
        process::exit(1);
    }

    Ok(())
}

fn render_task(task: &Task, verbose: bool) -> String {
    let mark = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let text = if task.completed {
        task.text.dimmed().strikethrough()
    } else {
        task.text.normal()
    };

    if verbose {
        let created = chrono::DateTime::from_timestamp_millis(task.id)
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        format!("{} {} {} {}", mark, task.id.to_string().cyan(), text, created.dimmed())
    } else {
        format!("{} {}", mark, text)
    }
}

fn not_found(id: i64) {
    println!("No task with id {}", id);
}
