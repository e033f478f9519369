mod cli;
mod ui;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use cli::{Cli, Command};
use labflow::config::LabflowConfig;
use labflow::{
    Job, JobManager, LabflowError, Step, Transfer, VolumetricState, compiler, logging, preflight,
    simulator,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = load_config(&cli)?;
    info!(deck = config.deck.len(), max_volume_ul = config.max_volume_ul, "configuration loaded");

    match cli.command {
        Command::Validate { job } => {
            let job = load_job(&job)?;
            check(&job, &config)?;
            ui::print_ok(&format!("Job {} passed preflight", job.job_id));
        }
        Command::Compile { job, out } => {
            let job = load_job(&job)?;
            check(&job, &config)?;
            let records = compiler::compile(&job)?;
            match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    compiler::write_worklist(&records, BufWriter::new(file))?;
                    ui::print_ok(&format!(
                        "Wrote {} records to {}",
                        records.len(),
                        path.display()
                    ));
                }
                None => ui::print_records(&records),
            }
        }
        Command::Simulate { job, initial } => {
            let job = load_job(&job)?;
            check(&job, &config)?;
            let initial = initial.as_deref().map(load_volumes).transpose()?;
            let state = simulator::simulate(&job, initial.as_ref())?;
            ui::print_volumes(&state);
        }
        Command::Run { jobs, initial } => {
            let mut manager = config.manager();
            if let Some(path) = initial {
                manager = manager.with_initial_volumes(load_volumes(&path)?);
            }
            let mut rejected = 0;
            for path in &jobs {
                let job = load_job(path)?;
                let job_id = job.job_id.clone();
                match manager.submit(job) {
                    Ok(_) => {}
                    Err(LabflowError::Validation(failure)) => {
                        ui::print_violations(&job_id, &failure.errors);
                        rejected += 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            let failed = drain(&mut manager);
            if rejected + failed > 0 {
                bail!("{rejected} job(s) rejected, {failed} job(s) failed");
            }
        }
        Command::Status => {
            let manager = config.manager();
            println!("{}", serde_json::to_string_pretty(&manager.snapshot())?);
            println!("recovery policy:");
            for (kind, action) in manager.policy().table() {
                println!("  {kind}: {action}");
            }
        }
        Command::Demo => {
            let mut config = config;
            for label in ["S1", "D1"] {
                if !config.deck.iter().any(|l| l == label) {
                    config.deck.push(label.to_string());
                }
            }
            let mut manager = config.manager();
            let job = demo_job();
            println!("Generated IR job:");
            for step in &job.steps {
                println!("  {} - op={}", step.id, step.op_name());
            }
            println!();
            manager.submit(job)?;
            let failed = drain(&mut manager);
            if failed > 0 {
                bail!("demo job failed");
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<LabflowConfig> {
    let mut config = match &cli.config {
        Some(path) => LabflowConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LabflowConfig::load()?,
    };
    if let Some(max_volume) = cli.max_volume {
        config
            .set_max_volume(max_volume)
            .context("invalid --max-volume")?;
    }
    for label in &cli.labware {
        if !config.deck.contains(label) {
            config.deck.push(label.clone());
        }
    }
    Ok(config)
}

fn load_job(path: &Path) -> Result<Job> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing job {}", path.display()))
}

fn load_volumes(path: &Path) -> Result<VolumetricState> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing volumes {}", path.display()))
}

// Preflight against the configured deck; prints and fails on any violation.
fn check(job: &Job, config: &LabflowConfig) -> Result<()> {
    let errors = preflight::validate(job, &config.deck_state(), config.max_volume_ul);
    if !errors.is_empty() {
        ui::print_violations(&job.job_id, &errors);
        bail!("job {} failed preflight", job.job_id);
    }
    Ok(())
}

// Run every queued job; returns how many failed.
fn drain(manager: &mut JobManager) -> usize {
    let mut failed = 0;
    while manager.queue_len() > 0 {
        let job_id = manager
            .queued_ids()
            .next()
            .map(str::to_string)
            .unwrap_or_default();
        let progress = ui::RunProgress::start(&job_id);
        match manager.run_next() {
            Ok(output) => {
                progress.complete(&output.job_id, output.records.len());
                ui::print_records(&output.records);
                ui::print_volumes(&output.state);
            }
            Err(err) => {
                progress.fail(&job_id, &err.to_string());
                failed += 1;
            }
        }
        if let Some(record) = manager.history().last() {
            ui::print_audit(record);
        }
    }
    failed
}

fn demo_job() -> Job {
    let name = "Transfer 50 uL from plate S1 A1 to plate D1 B1, wash, then decontaminate.";
    Job::anonymous(vec![
        Step::transfer("s1", Transfer::new("S1", "A1", "D1", "B1", 50.0))
            .with_preconditions(["robot.homed == true", "tip.attached == true"]),
        Step::wash("s2", 1).with_preconditions(["robot.homed == true"]),
        Step::decontaminate("s3").with_preconditions(["robot.homed == true"]),
    ])
    .with_name(name)
    .with_constraint("require_homed", true)
}
