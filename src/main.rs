use anyhow::Context;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use roster_rs::roster::collab::{
    choose_picture, confirm_and_remove, ConfirmDialog, DialogAction, ImagePicker, PickOutcome,
    RemoveOutcome, PERMISSION_MESSAGE, REMOVE_LABEL,
};
use roster_rs::roster::{
    AddForm, Field, RosterConfig, RosterError, RosterStore, Session, WorkerId, WorkerRecord,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage the worker roster", long_about = None)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the roster storage
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage key the roster lives under
    #[arg(long, global = true)]
    key: Option<String>,

    /// Require an integer age and YYYY-MM-DD dates
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all workers
    List,
    /// Show one worker's details
    Show { id: WorkerId },
    /// Add a worker
    Add(WorkerFields),
    /// Update fields of an existing worker
    Update {
        id: WorkerId,
        #[command(flatten)]
        fields: WorkerFields,
    },
    /// Remove a worker after confirmation
    Remove {
        id: WorkerId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct WorkerFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    age: Option<String>,
    #[arg(long)]
    start_date: Option<String>,
    #[arg(long)]
    date_of_birth: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Path to an image file
    #[arg(long)]
    picture: Option<PathBuf>,
}

impl WorkerFields {
    fn text_fields(&self) -> Vec<(Field, &str)> {
        [
            (Field::Name, &self.name),
            (Field::Age, &self.age),
            (Field::StartDate, &self.start_date),
            (Field::DateOfBirth, &self.date_of_birth),
            (Field::Phone, &self.phone),
            (Field::Email, &self.email),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }
}

/// Picks the image file given on the command line
struct PathPicker(Option<PathBuf>);

#[async_trait]
impl ImagePicker for PathPicker {
    async fn pick(&self) -> PickOutcome {
        let Some(path) = &self.0 else {
            return PickOutcome::cancelled();
        };
        match tokio::fs::canonicalize(path).await {
            Ok(abs) => PickOutcome::picked(format!("file://{}", abs.display())),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => PickOutcome::denied(),
            Err(e) => {
                log::warn!("Ignoring picture {}: {}", path.display(), e);
                PickOutcome::cancelled()
            }
        }
    }
}

/// Asks on the terminal; a bare answer of `y`/`yes` picks the destructive action
struct TerminalDialog;

#[async_trait]
impl ConfirmDialog for TerminalDialog {
    async fn choose(
        &self,
        title: &str,
        prompt: &str,
        actions: &[DialogAction],
    ) -> Option<String> {
        let labels: Vec<&str> = actions.iter().map(|a| a.label.as_str()).collect();
        let mut stdout = tokio::io::stdout();
        let question = format!("{}\n{} [{}] ", title, prompt, labels.join("/"));
        stdout.write_all(question.as_bytes()).await.ok()?;
        stdout.flush().await.ok()?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .ok()?;
        let answer = line.trim();
        if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
            return Some(REMOVE_LABEL.to_string());
        }
        labels
            .into_iter()
            .find(|label| label.eq_ignore_ascii_case(answer))
            .map(str::to_string)
    }
}

fn resolve_config(args: &Cli) -> anyhow::Result<RosterConfig> {
    let mut config = match &args.config {
        Some(path) => RosterConfig::from_yaml_file(path)?.merge_env(|k| std::env::var(k).ok()),
        None => RosterConfig::from_env(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(key) = &args.key {
        config.storage_key = key.clone();
    }
    if args.strict {
        config.strict_fields = true;
    }
    Ok(config)
}

fn print_worker(worker: &WorkerRecord) {
    println!("Worker Information ({})", worker.id);
    for line in worker.info_lines() {
        println!("  {}", line);
    }
    if let Some(picture) = &worker.picture {
        println!("  Picture: {}", picture);
    }
}

fn report_validation(err: &RosterError) {
    if let RosterError::Validation(errors) = err {
        for e in errors {
            eprintln!("  {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Cli::parse();
    let config = resolve_config(&args)?;
    log::info!(
        "Using roster '{}' in {}",
        config.storage_key,
        config.data_dir.display()
    );

    let store = RosterStore::from_config(&config);
    store
        .initialize()
        .await
        .context("failed to load the roster")?;

    match args.command {
        Commands::List => {
            let workers = store.list().await?;
            if workers.is_empty() {
                println!("No workers yet.");
            }
            for worker in workers {
                println!("{}\t{}", worker.id, worker.name);
            }
        }
        Commands::Show { id } => {
            let mut session = Session::new();
            let worker = session.open_info(&store, id).await?;
            print_worker(&worker);
            session.close();
        }
        Commands::Add(fields) => {
            let mut form = AddForm::new();
            form.show();
            for (field, value) in fields.text_fields() {
                form.set_field(field, value);
            }
            if fields.picture.is_some() {
                let outcome = choose_picture(&PathPicker(fields.picture.clone()), &mut form).await?;
                if matches!(outcome, PickOutcome::PermissionDenied { .. }) {
                    eprintln!("{}", PERMISSION_MESSAGE);
                }
            }
            match form.submit(&store).await {
                Ok(worker) => println!("Added worker {} ({})", worker.id, worker.name),
                Err(e) => {
                    report_validation(&e);
                    return Err(e.into());
                }
            }
        }
        Commands::Update { id, fields } => {
            let mut session = Session::new();
            session.open_editor(&store, id).await?;
            for (field, value) in fields.text_fields() {
                session.set_field(field, value)?;
            }
            if fields.picture.is_some() {
                let outcome =
                    choose_picture(&PathPicker(fields.picture.clone()), &mut session).await?;
                if matches!(outcome, PickOutcome::PermissionDenied { .. }) {
                    eprintln!("{}", PERMISSION_MESSAGE);
                }
            }
            if session.draft().is_some_and(|d| d.is_empty()) {
                println!("Nothing to update.");
                return Ok(());
            }
            match session.save(&store).await {
                Ok(worker) => print_worker(&worker),
                Err(e) => {
                    report_validation(&e);
                    return Err(e.into());
                }
            }
        }
        Commands::Remove { id, yes } => {
            let removed = if yes {
                Some(store.remove(id).await?)
            } else {
                match confirm_and_remove(&store, &TerminalDialog, id).await? {
                    RemoveOutcome::Removed(worker) => Some(worker),
                    RemoveOutcome::Cancelled => None,
                }
            };
            match removed {
                Some(worker) => println!("{} removed", worker.name),
                None => println!("Nothing removed."),
            }
        }
    }

    Ok(())
}
