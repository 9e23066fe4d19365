use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use engine::Session;
use shared::domain::{Pool, SlotId, TemplateId};
use storage::{open_key_value_store, TemplateStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod terminal;

use config::{load_settings, CONFIG_FILE};
use terminal::{ConsoleNotifier, TerminalSurface};

const RENDER_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(about = "Random rotator: cycle labeled slots through random picks")]
struct Cli {
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// Storage directory, or `memory:` to keep nothing.
    #[arg(long)]
    data_dir: Option<String>,
    #[arg(long)]
    log_filter: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every template, marking the active one.
    List,
    /// Print one template as JSON.
    Show { id: String },
    /// Rotate a template in the terminal until the time runs out or Ctrl-C.
    Run {
        #[arg(long)]
        template: Option<String>,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    Create { name: String },
    Duplicate { source: String, name: String },
    Delete { id: String },
    /// Change a custom template.
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        speed: Option<i64>,
        /// File with one shared-pool entry per line.
        #[arg(long)]
        pool_file: Option<PathBuf>,
        /// `SLOT_ID=FILE`, one individual-pool entry per line.
        #[arg(long = "slot-pool")]
        slot_pools: Vec<String>,
        #[arg(long, conflicts_with = "individual_pool")]
        shared_pool: bool,
        #[arg(long)]
        individual_pool: bool,
        #[arg(long = "add-slot")]
        add_slots: Vec<String>,
        #[arg(long = "remove-slot")]
        remove_slots: Vec<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config);
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }
    if let Some(log_filter) = cli.log_filter {
        settings.log_filter = log_filter;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let kv = open_key_value_store(&settings.data_dir)?;
    let store = TemplateStore::new(kv, Arc::new(ConsoleNotifier));
    let surface = Arc::new(TerminalSurface::default());
    let mut session = Session::open(store, surface.clone());
    info!(data_dir = %settings.data_dir, "rotator: session opened");

    match cli.command {
        Command::List => {
            let active = session.data().active_template_id.clone();
            for template in session.templates() {
                let marker = if Some(&template.id) == active.as_ref() { "*" } else { " " };
                let kind = if template.is_default { "default" } else { "custom" };
                println!("{marker} {} [{kind}] {}", template.id, template.name);
            }
        }
        Command::Show { id } => {
            let id = TemplateId::new(id);
            let template = session
                .data()
                .template(&id)
                .ok_or_else(|| anyhow!("template {id} not found"))?;
            println!("{}", serde_json::to_string_pretty(template)?);
        }
        Command::Run { template, seconds } => {
            let id = template
                .or(settings.default_template)
                .map(TemplateId::new)
                .or_else(|| session.data().active_template_id.clone())
                .ok_or_else(|| anyhow!("no template to run"))?;
            session.load_template(&id)?;
            run_rotation(&session, &surface, Duration::from_secs(seconds)).await?;
        }
        Command::Create { name } => {
            let id = session.create_template(&name)?;
            println!("created template_id={id}");
        }
        Command::Duplicate { source, name } => {
            let id = session.duplicate_template(&TemplateId::new(source), &name)?;
            println!("created template_id={id}");
        }
        Command::Delete { id } => {
            session.delete_template(&TemplateId::new(id))?;
        }
        Command::Edit {
            id,
            name,
            location,
            speed,
            pool_file,
            slot_pools,
            shared_pool,
            individual_pool,
            add_slots,
            remove_slots,
        } => {
            let mut draft = session.begin_edit(&TemplateId::new(id))?;
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(location) = location {
                draft.config.location_text = location;
            }
            if let Some(speed) = speed {
                draft.config.speed = speed;
            }
            if let Some(path) = pool_file {
                draft.config.shared_pool = read_pool(&path)?;
            }
            if shared_pool {
                draft.is_shared_pool = true;
            }
            if individual_pool {
                draft.is_shared_pool = false;
            }
            for slot_id in remove_slots {
                if !draft.remove_slot(SlotId(slot_id)) {
                    bail!("slot {slot_id} not found");
                }
            }
            for label in add_slots {
                draft.add_slot(label);
            }
            for spec in slot_pools {
                let (slot_id, path) = parse_slot_pool(&spec)?;
                let slot = draft
                    .config
                    .rotators
                    .iter_mut()
                    .find(|slot| slot.id == slot_id)
                    .ok_or_else(|| anyhow!("slot {slot_id} not found"))?;
                slot.individual_pool = read_pool(&path)?;
            }
            session.save_settings(draft)?;
        }
    }

    Ok(())
}

async fn run_rotation(
    session: &Session,
    surface: &TerminalSurface,
    duration: Duration,
) -> Result<()> {
    session.start()?;
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let mut render = tokio::time::interval(RENDER_INTERVAL);
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            _ = render.tick() => {
                write!(stdout, "\r\x1b[2K{}", surface.render())?;
                stdout.flush()?;
            }
        }
    }

    session.stop();
    writeln!(stdout, "\r\x1b[2K{}", surface.render())?;
    Ok(())
}

fn read_pool(path: &Path) -> Result<Pool> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read pool file '{}'", path.display()))?;
    Ok(Pool::from_lines(&raw))
}

fn parse_slot_pool(spec: &str) -> Result<(SlotId, PathBuf)> {
    let (slot_id, path) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("expected SLOT_ID=FILE, got '{spec}'"))?;
    let slot_id = slot_id
        .trim()
        .parse::<i64>()
        .with_context(|| format!("invalid slot id in '{spec}'"))?;
    Ok((SlotId(slot_id), PathBuf::from(path.trim())))
}
