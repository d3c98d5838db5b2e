use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use gobl_tasks::config::Config;
use gobl_tasks::diagnostics::StderrSink;
use gobl_tasks::process::shell_command;
use gobl_tasks::{glog, Error, Result, TaskIdentifier, TaskRegistry};

/// gobl-tasks - discover and run tasks from gobl build descriptors
#[derive(Parser, Debug)]
#[command(name = "gobl-tasks")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    GOBL_TASKS_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.gobl-tasks/gobl-tasks.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Config file (default: ~/.gobl-tasks/config.toml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Workspace root to scan; repeatable. Overrides configured roots.
    #[arg(short = 'r', long = "root")]
    pub roots: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List discovered tasks
    List {
        /// Print host tasks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the command line that runs a task
    Resolve {
        /// Task name as listed
        task: String,
    },

    /// Run a task in the first root
    Run {
        /// Task name as listed
        task: String,
    },

    /// List tasks and list again whenever a descriptor changes
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    gobl_tasks::log::init_with_debug(cli.debug);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let roots = select_roots(&cli, &config)?;
    glog!("gobl-tasks starting with {} root(s)", roots.len());

    let registry = TaskRegistry::from_config(&config, roots, Arc::new(StderrSink));

    match cli.command {
        Command::List { json } => run_list(&registry, json).await,
        Command::Resolve { task } => run_resolve(&registry, &task),
        Command::Run { task } => run_task(&registry, &task).await,
        Command::Watch => run_watch(&registry).await,
    }
}

fn select_roots(cli: &Cli, config: &Config) -> Result<Vec<PathBuf>> {
    if !cli.roots.is_empty() {
        return Ok(cli.roots.clone());
    }
    let configured = config.effective_roots();
    if !configured.is_empty() {
        return Ok(configured);
    }
    Ok(vec![std::env::current_dir()?])
}

fn first_root(registry: &TaskRegistry) -> Result<PathBuf> {
    registry
        .roots()
        .first()
        .cloned()
        .ok_or_else(|| Error::Validation("No workspace root configured".to_string()))
}

async fn run_list(registry: &TaskRegistry, json: bool) -> Result<()> {
    if json {
        let tasks = registry.provide_tasks().await;
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    print_tasks(registry).await;
    Ok(())
}

async fn print_tasks(registry: &TaskRegistry) {
    let tasks = registry.list_tasks().await;
    if tasks.is_empty() {
        println!("No gobl tasks found.");
        return;
    }
    for task in tasks {
        println!(
            "{}\t{:<5}\t{}",
            task.origin_root.display(),
            task.group.map(|g| g.as_str()).unwrap_or("-"),
            task.identifier
        );
    }
}

fn run_resolve(registry: &TaskRegistry, task: &str) -> Result<()> {
    let root = first_root(registry)?;
    let spec = registry.resolve(&TaskIdentifier::new(task), &root);
    println!("cwd:     {}", spec.working_directory.display());
    println!("command: {}", spec.command_line);
    Ok(())
}

async fn run_task(registry: &TaskRegistry, task: &str) -> Result<()> {
    let root = first_root(registry)?;
    let spec = registry.resolve(&TaskIdentifier::new(task), &root);
    glog!("Running `{}` in {}", spec.command_line, spec.working_directory.display());

    let status = shell_command(&spec.command_line)
        .current_dir(&spec.working_directory)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}

async fn run_watch(registry: &TaskRegistry) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = registry.watch_with(move |root| {
        let _ = tx.send(root.to_path_buf());
    })?;

    print_tasks(registry).await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.recv() => match changed {
                Some(root) => {
                    println!("\n{} changed, rediscovering...", root.display());
                    print_tasks(registry).await;
                }
                None => break,
            },
        }
    }

    handle.close();
    Ok(())
}
