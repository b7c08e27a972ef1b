use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexique_deck::{ArtifactWriter, DeckOutcome, Pipeline, PipelineConfig, RunSummary, Severity};

#[derive(Parser, Debug)]
#[command(name = "lexique-deck")]
#[command(about = "Build French flashcard decks from a frequency lexicon")]
struct Cli {
    /// JSON configuration file (defaults apply for missing keys)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Leave artifacts that already exist untouched
    #[arg(long, global = true)]
    skip_existing: bool,

    /// Lexicon TSV
    #[arg(long, global = true)]
    lexicon: Option<PathBuf>,

    /// Output directory for every artifact
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Directory of downloaded external word lists
    #[arg(long, global = true)]
    sources: Option<PathBuf>,

    /// Directory of hand-authored card content
    #[arg(long, global = true)]
    authored_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank lemmas per grammatical category
    Extract,
    /// Classify gender, profession, adjective and verb irregularities
    Classify,
    /// Merge external word lists into one snapshot
    MergeExternal,
    /// Join skeletons with authored content into card files
    Assemble,
    /// Every stage in order
    Run,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match execute(cli) {
        Ok(summary) if summary.has_critical_issues() => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\n❌ {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(path) = &cli.lexicon {
        config.paths.lexicon = path.clone();
    }
    if let Some(path) = &cli.out_dir {
        config.paths.out_dir = path.clone();
    }
    if let Some(path) = &cli.sources {
        config.paths.sources_dir = path.clone();
    }
    if let Some(path) = &cli.authored_dir {
        config.paths.authored_dir = path.clone();
    }
    Ok(config)
}

fn execute(cli: Cli) -> Result<RunSummary> {
    let config = load_config(&cli)?;
    let pipeline = Pipeline::new(config, ArtifactWriter::new(cli.skip_existing));
    let mut summary = RunSummary::new();

    println!("🃏 Lexique Deck - {:?}", cli.command);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading lexicon...");
    let lexicon = pipeline.load_lexicon().context("Failed to load lexicon")?;
    println!("✓ Loaded {} entries", lexicon.len());

    match cli.command {
        Command::Extract => {
            println!("\n🗂️  Extracting categories...");
            let selections = pipeline.extract(&lexicon, &mut summary)?;
            for selection in &selections {
                println!("  {}: {} lemmas", selection.category, selection.len());
            }
            println!("✓ Wrote {}", pipeline.config.categories_dir().display());
        }
        Command::Classify => {
            println!("\n🔬 Classifying irregularities...");
            let report = pipeline.classify(&lexicon, &mut summary)?;
            println!("✓ {}", report.summary());
        }
        Command::MergeExternal => {
            println!("\n🔍 Merging external vocabulary...");
            let items = pipeline
                .merge_external(&lexicon, &mut summary)
                .context("External merge failed")?;
            let high = items.iter().filter(|i| i.priority == lexique_deck::Priority::High).count();
            println!("✓ {} items ({} high priority)", items.len(), high);
        }
        Command::Assemble => {
            println!("\n🃏 Assembling cards...");
            let decks = pipeline.assemble(&lexicon, &mut summary)?;
            print_decks(&decks);
        }
        Command::Run => {
            println!("\n🚂 Running every stage...");
            let decks = pipeline.run(&lexicon, &mut summary)?;
            print_decks(&decks);
        }
    }

    print_summary(&summary);
    Ok(summary)
}

fn print_decks(decks: &[DeckOutcome]) {
    for deck in decks {
        match deck.aborted {
            Some(_) => println!("  ⚠️  {}", deck.summary()),
            None => println!("  ✓ {}", deck.summary()),
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Run summary: {}", summary.summary());
    for (name, count) in summary.counters() {
        println!("  {}: {}", name, count);
    }

    let flagged: Vec<_> = summary
        .issues()
        .iter()
        .filter(|i| i.severity != Severity::Info)
        .collect();
    if !flagged.is_empty() {
        println!("\n⚠️  {} issues need attention:", flagged.len());
        for issue in flagged {
            println!("  {}", issue);
        }
    }

    if summary.has_critical_issues() {
        println!("\n❌ Some card types were not emitted");
    } else {
        println!("\n✅ Done");
    }
}
