use anyhow::Context;
use clap::{Parser, Subcommand};
use ctag_core::config::{date_patterns_from_env_value, record_data_dir_from_env_value};
use ctag_core::{
    missing_mandatory, sections_to_text, CoreConfig, FileSectionStore, NoteService, NoteStats,
    SectionStore, SectionView, Tag, TagCatalog,
};
use ctag_types::TagCode;
use ctag_uuid::{ClinicianId, PatientId, RecordId};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ctag")]
#[command(about = "Clinical tag annotation engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a note and print its sections as JSON
    Parse {
        /// Tag catalog (YAML)
        #[arg(long)]
        catalog: PathBuf,
        /// Authoring clinician id
        #[arg(long)]
        clinician: ClinicianId,
        /// Code expected in the note (repeatable)
        #[arg(long)]
        mandatory: Vec<TagCode>,
        /// Include note statistics in the output
        #[arg(long)]
        stats: bool,
        /// Note file, or `-` / nothing for stdin
        note: Option<PathBuf>,
    },
    /// Validate a tag catalog and print its hierarchy
    CheckCatalog {
        /// Tag catalog (YAML)
        catalog: PathBuf,
    },
    /// Assemble a note and persist it under CTAG_DATA_DIR
    Ingest {
        /// Tag catalog (YAML)
        #[arg(long)]
        catalog: PathBuf,
        /// Authoring clinician id
        #[arg(long)]
        clinician: ClinicianId,
        /// Subject patient id
        #[arg(long)]
        patient: PatientId,
        /// Code expected in the note (repeatable)
        #[arg(long)]
        mandatory: Vec<TagCode>,
        /// Note file, or `-` / nothing for stdin
        note: Option<PathBuf>,
    },
    /// Print a stored record as canonical tagged text
    Render {
        /// Record id
        record: RecordId,
        /// Print note statistics after the text
        #[arg(long)]
        stats: bool,
    },
}

fn load_config() -> anyhow::Result<Arc<CoreConfig>> {
    let data_dir = record_data_dir_from_env_value(std::env::var("CTAG_DATA_DIR").ok());
    let date_patterns = date_patterns_from_env_value(std::env::var("CTAG_DATE_PATTERNS").ok())?;
    Ok(Arc::new(CoreConfig::new(data_dir, date_patterns)?))
}

fn load_catalog(path: &Path) -> anyhow::Result<Arc<TagCatalog>> {
    let catalog = TagCatalog::load(path)
        .with_context(|| format!("failed to load catalog {}", path.display()))?;
    tracing::info!("loaded {} tag(s) from {}", catalog.len(), path.display());
    Ok(Arc::new(catalog))
}

fn read_note(note: Option<&Path>) -> anyhow::Result<String> {
    match note {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read note {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read note from stdin")?;
            Ok(text)
        }
    }
}

fn warn_missing(views: &[SectionView], mandatory: &[TagCode]) {
    for code in missing_mandatory(views, mandatory) {
        tracing::warn!("mandatory tag {} is missing", code);
    }
}

fn print_tree(catalog: &TagCatalog, tag: &Tag, depth: usize) -> anyhow::Result<()> {
    let scope = match tag.owner {
        Some(owner) => format!("clinician {owner}"),
        None => "global".to_string(),
    };
    println!(
        "{}{} {} [{}] ({})",
        "  ".repeat(depth),
        tag.code,
        tag.display_name,
        tag.data_type(),
        scope
    );
    for child in catalog.children_of(tag.id)? {
        print_tree(catalog, child, depth + 1)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ctag=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            catalog,
            clinician,
            mandatory,
            stats,
            note,
        } => {
            let cfg = load_config()?;
            let service =
                NoteService::new(cfg, load_catalog(&catalog)?).with_mandatory(mandatory.clone());
            let text = read_note(note.as_deref())?;

            let sections = service.preview(clinician, &text)?;
            let views: Vec<SectionView> = sections.iter().map(|s| s.view()).collect();
            warn_missing(&views, &mandatory);

            let output = if stats {
                serde_json::json!({
                    "sections": serde_json::to_value(&views)?,
                    "stats": serde_json::to_value(service.stats(&sections))?,
                })
            } else {
                serde_json::to_value(&views)?
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::CheckCatalog { catalog } => {
            let catalog = load_catalog(&catalog)?;
            catalog.check_hierarchy()?;
            for root in catalog.roots() {
                print_tree(&catalog, root, 0)?;
            }
        }
        Commands::Ingest {
            catalog,
            clinician,
            patient,
            mandatory,
            note,
        } => {
            let cfg = load_config()?;
            let store = FileSectionStore::new(&cfg);
            let service =
                NoteService::new(cfg, load_catalog(&catalog)?).with_mandatory(mandatory.clone());
            let text = read_note(note.as_deref())?;

            let ingested = service.ingest(clinician, patient, &text, &store)?;
            warn_missing(&ingested.views(), &mandatory);
            println!("{}", ingested.record.id());
        }
        Commands::Render { record, stats } => {
            let cfg = load_config()?;
            let store = FileSectionStore::new(&cfg);
            let stored = store.load(record)?;

            println!("{}", sections_to_text(&stored.sections));
            if stats {
                let stats = NoteStats::from_sections(&stored.sections, cfg.basic_codes());
                println!();
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        }
    }

    Ok(())
}
