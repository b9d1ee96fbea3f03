//! llmpole CLI entry point

use anyhow::{Context, Result};
use clap::Parser;
use llmpole::config::{Action, CliArgs, LogFormat, PoleConfig};
use llmpole::display;
use llmpole::fit::{analyze_all, filter_by_use_case, filter_min_fit, filter_perfect_only, rank_models_by_fit, ModelFit};
use llmpole::models::ModelDatabase;
use llmpole::system::SystemSpecs;
use llmpole::PoleError;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    let config = match PoleConfig::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.log_level, config.log_format);

    if let Err(e) = run(&config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so JSON on stdout stays parseable
fn init_logging(default_level: LevelFilter, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(config: &PoleConfig) -> Result<()> {
    match &config.action {
        Action::System => {
            let specs = detect_system()?;
            if config.is_json() {
                println!("{}", display::render_system_json(&specs)?);
            } else {
                print!("{}", display::render_system(&specs));
            }
        }

        Action::List => {
            let specs = detect_system()?;
            let db = load_database(config)?;
            let fits = analyze_all(db.all_models(), &specs);
            emit_fits(config, &specs, &fits, display::render_model_list(&fits))?;
        }

        Action::Fit { perfect_only, limit } => {
            let specs = detect_system()?;
            let db = load_database(config)?;
            let mut fits = rank_models_by_fit(analyze_all(db.all_models(), &specs));
            if *perfect_only {
                fits = filter_perfect_only(fits);
            }
            if let Some(n) = limit {
                fits.truncate(*n);
            }
            emit_fits(config, &specs, &fits, display::render_recommend(&specs, &fits))?;
        }

        Action::Search { query } => {
            let db = load_database(config)?;
            let matches = db.find_model(query);
            if config.is_json() {
                println!("{}", display::render_models_json(&matches)?);
            } else {
                print!("{}", display::render_search(query, &matches));
            }
        }

        Action::Info { model } => {
            let db = load_database(config)?;
            let record = match db.find_unique(model) {
                Ok(record) => record,
                Err(PoleError::AmbiguousModel { query, matches }) => {
                    println!("Multiple models match '{}':", query);
                    for name in &matches {
                        println!("  {}", name);
                    }
                    println!("\nPlease use a more specific name.");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            let specs = detect_system()?;
            let fit = ModelFit::analyze(record, &specs);
            emit_fits(config, &specs, std::slice::from_ref(&fit), display::render_info(&fit))?;
        }

        Action::Recommend {
            limit,
            use_case,
            min_fit,
        } => {
            let specs = detect_system()?;
            let db = load_database(config)?;
            let mut fits = filter_min_fit(rank_models_by_fit(analyze_all(db.all_models(), &specs)), *min_fit);
            if let Some(label) = use_case {
                fits = filter_by_use_case(fits, label);
            }
            fits.truncate(*limit);
            emit_fits(config, &specs, &fits, display::render_recommend(&specs, &fits))?;
        }
    }

    Ok(())
}

fn detect_system() -> Result<SystemSpecs> {
    SystemSpecs::detect().context("Failed to detect system hardware")
}

fn load_database(config: &PoleConfig) -> Result<ModelDatabase> {
    ModelDatabase::load(config.models_file.as_deref()).context("Failed to load model catalog")
}

/// Print `text`, or the JSON document for `fits` when JSON was requested
fn emit_fits(config: &PoleConfig, specs: &SystemSpecs, fits: &[ModelFit<'_>], text: String) -> Result<()> {
    if config.is_json() {
        println!("{}", display::render_fits_json(specs, fits)?);
    } else {
        print!("{}", text);
    }
    Ok(())
}
