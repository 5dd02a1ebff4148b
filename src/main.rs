// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use inventaire::{logging, AppConfig, ExportFormat, FormState, InventoryForm, StoreConfig};

#[derive(Parser, Debug)]
#[clap(
    name = "inventaire",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inventory-taking form: pick references, count, record, export"
)]
struct Cli {
    /// Config file (defaults to $INVENTAIRE_CONFIG, then built-in defaults)
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct Credentials {
    /// Identity (must be on the allow-list)
    #[clap(short, long)]
    user: String,
    /// Shared passphrase
    #[clap(short, long)]
    password: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal form (default)
    Tui,
    /// List references nobody has counted yet
    Available {
        #[clap(flatten)]
        credentials: Credentials,
    },
    /// List every stored record
    Records {
        #[clap(flatten)]
        credentials: Credentials,
    },
    /// Record counts, e.g. `submit -u Bmehaini -p 1234 Ref001=5 Ref003=10`
    Submit {
        #[clap(flatten)]
        credentials: Credentials,
        /// REFERENCE=QUANTITY pairs; a bare REFERENCE counts as 0
        #[clap(required = true, value_parser = parse_count)]
        counts: Vec<(String, u32)>,
    },
    /// Write the full inventory to a spreadsheet file
    Export {
        #[clap(flatten)]
        credentials: Credentials,
        #[clap(long, value_enum, default_value = "xlsx")]
        format: FormatArg,
        /// Output path (defaults to inventaire_global.<ext>)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Xlsx,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

fn parse_count(raw: &str) -> Result<(String, u32), String> {
    match raw.split_once('=') {
        Some((reference, quantity)) => {
            let quantity = quantity
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("quantity for {} must be a non-negative integer", reference))?;
            Ok((reference.trim().to_string(), quantity))
        }
        None => Ok((raw.trim().to_string(), 0)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_ui_mode(&config),
        Command::Available { credentials } => {
            logging::init(config.logging.json);
            run_available(&config, &credentials)
        }
        Command::Records { credentials } => {
            logging::init(config.logging.json);
            run_records(&config, &credentials)
        }
        Command::Submit { credentials, counts } => {
            logging::init(config.logging.json);
            run_submit(&config, &credentials, &counts)
        }
        Command::Export {
            credentials,
            format,
            output,
        } => {
            logging::init(config.logging.json);
            run_export(&config, &credentials, format.into(), output)
        }
    }
}

fn open_form(config: &AppConfig, credentials: &Credentials) -> Result<InventoryForm> {
    let catalog = Arc::new(config.catalog()?);
    let store = config.open_store()?;

    if config.store == StoreConfig::Memory {
        eprintln!("⚠️  In-memory store: records vanish when this command exits.");
    }

    let mut form = InventoryForm::new(catalog, store);
    form.sign_in(&config.auth_gate(), &credentials.user, &credentials.password)
        .map_err(|e| anyhow!("{}", e))?;
    Ok(form)
}

fn run_available(config: &AppConfig, credentials: &Credentials) -> Result<()> {
    let form = open_form(config, credentials)?;

    if form.state() == FormState::FullyInventoried {
        println!("✅ Toutes les références ont été inventoriées.");
        return Ok(());
    }

    println!("📦 Références disponibles ({})", form.available().len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for entry in form.available() {
        println!("  {:<12} {}", entry.reference, entry.description);
    }
    Ok(())
}

fn run_records(config: &AppConfig, credentials: &Credentials) -> Result<()> {
    let form = open_form(config, credentials)?;
    let records = form.records()?;

    println!("🗄️  {} enregistrement(s)", records.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for r in &records {
        println!(
            "  {:<12} {:<10} {:<20} {:>6}",
            r.inventoriste, r.reference, r.description, r.quantity
        );
    }
    Ok(())
}

fn run_submit(config: &AppConfig, credentials: &Credentials, counts: &[(String, u32)]) -> Result<()> {
    let mut form = open_form(config, credentials)?;

    let references: Vec<&str> = counts.iter().map(|(r, _)| r.as_str()).collect();
    form.select(&references)?;
    for (reference, quantity) in counts {
        form.set_quantity(reference, *quantity)?;
    }

    println!("📝 Résumé à enregistrer");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for r in form.review()? {
        println!("  {:<10} {:<20} {:>6}", r.reference, r.description, r.quantity);
    }

    let outcome = form.submit()?;
    println!("\n✓ Données enregistrées: {}", outcome.appended.len());
    if !outcome.skipped.is_empty() {
        println!("✓ Déjà inventoriées ailleurs: {}", outcome.skipped.join(", "));
    }
    if form.is_fully_inventoried() {
        println!("✅ Toutes les références ont été inventoriées.");
    }
    Ok(())
}

fn run_export(
    config: &AppConfig,
    credentials: &Credentials,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let form = open_form(config, credentials)?;

    let Some(bytes) = form.export(format)? else {
        bail!("nothing to export: no inventory recorded yet");
    };

    let path = output.unwrap_or_else(|| PathBuf::from(format.file_name()));
    fs::write(&path, &bytes).with_context(|| format!("Failed to write {:?}", path))?;

    println!("📥 Inventaire exporté: {} ({} octets)", path.display(), bytes.len());
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    logging::init_for_tui(config.logging.json);

    let catalog = Arc::new(config.catalog()?);
    let store = config.open_store()?;
    let form = InventoryForm::new(catalog, store);

    let mut app = ui::App::new(form, config.auth_gate());
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin inventaire-server --features server");
    std::process::exit(1);
}
