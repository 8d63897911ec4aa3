pub mod output;
pub mod progress;

use std::path::PathBuf;

use clap::{ArgGroup, CommandFactory, Parser};

use crate::models::{
    cleanup, CancelFlag, Catalog, ProvisionEvent, ProvisionStage, Provisioner,
};

use self::progress::TerminalProgress;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Parser)]
#[command(name = "download-models", about = "Download models for Voice Bot")]
#[command(group(ArgGroup::new("action").args(["model", "all", "list", "clean"])))]
pub struct Cli {
    /// Download a specific model (vosk_en, vosk_hi, whisper)
    #[arg(long, value_name = "ID")]
    pub model: Option<String>,

    /// Download all models
    #[arg(long)]
    pub all: bool,

    /// Show which models are installed
    #[arg(long)]
    pub list: bool,

    /// Show leftover partial downloads and extracted archives
    #[arg(long)]
    pub clean: bool,

    /// Delete what --clean lists instead of only printing it
    #[arg(long, requires = "clean")]
    pub yes: bool,

    /// Directory to save models
    #[arg(long, value_name = "DIR", default_value = "models")]
    pub models_dir: PathBuf,

    /// JSON catalog replacing the built-in model list
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Log progress details to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    One(String),
    All,
    List,
    Clean { apply: bool },
}

impl Cli {
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        if let Some(id) = &self.model {
            Some(Action::One(id.clone()))
        } else if self.all {
            Some(Action::All)
        } else if self.list {
            Some(Action::List)
        } else if self.clean {
            Some(Action::Clean { apply: self.yes })
        } else {
            None
        }
    }

    fn load_catalog(&self) -> anyhow::Result<Catalog> {
        match &self.catalog {
            Some(path) => Ok(Catalog::from_path(path)?),
            None => Ok(Catalog::builtin()),
        }
    }
}

/// Executes the parsed request and returns the process exit code.
pub fn run(cli: &Cli, cancel: CancelFlag) -> i32 {
    let Some(action) = cli.action() else {
        output::print_usage_hint();
        let _ = Cli::command().print_help();
        return EXIT_FAILURE;
    };

    let catalog = match cli.load_catalog() {
        Ok(catalog) => catalog,
        Err(error) => {
            eprintln!("✗ {error:#}");
            return EXIT_FAILURE;
        }
    };
    let provisioner = match Provisioner::new(catalog, &cli.models_dir, cancel) {
        Ok(provisioner) => provisioner,
        Err(error) => {
            eprintln!("✗ {error:#}");
            return EXIT_FAILURE;
        }
    };

    match action {
        Action::One(id) => run_one(&provisioner, &id),
        Action::All => run_all(&provisioner),
        Action::List => {
            output::print_status(provisioner.models_dir(), &provisioner.status());
            EXIT_SUCCESS
        }
        Action::Clean { apply } => run_clean(&provisioner, apply),
    }
}

fn run_one(provisioner: &Provisioner, id: &str) -> i32 {
    let mut progress = TerminalProgress::new();
    let result = provisioner.provision_one_with_progress(id, |event| progress.handle(event));
    output::print_outcome(&result);
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(error) if error.is_cancelled() => EXIT_CANCELLED,
        Err(_) => EXIT_FAILURE,
    }
}

fn run_all(provisioner: &Provisioner) -> i32 {
    output::print_run_header(provisioner.models_dir());
    let mut progress = TerminalProgress::new();
    let report = provisioner.provision_all_with_progress(|event| {
        if let ProvisionEvent::Stage {
            id,
            stage: ProvisionStage::Pending,
        } = event
        {
            output::print_entry_header(id);
        }
        progress.handle(event);
        if let ProvisionEvent::Finished { result, .. } = event {
            output::print_outcome(result);
        }
    });
    if report.cancelled() {
        return EXIT_CANCELLED;
    }
    output::print_summary(&report);
    output::print_tts_notice();
    if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

fn run_clean(provisioner: &Provisioner, apply: bool) -> i32 {
    let plan = cleanup::plan(provisioner.catalog(), provisioner.models_dir());
    output::print_cleanup_plan(&plan, apply);
    if !apply || plan.is_empty() {
        return EXIT_SUCCESS;
    }
    match cleanup::apply(&plan) {
        Ok(reclaimed) => {
            println!("✓ Reclaimed {}", output::format_bytes(reclaimed));
            EXIT_SUCCESS
        }
        Err(error) => {
            eprintln!("✗ {error:#}");
            EXIT_FAILURE
        }
    }
}
