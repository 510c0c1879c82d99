//! Command implementations.

use crate::config::CliDefaults;
use crate::loader;
use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use strata_dataset::{profile_table, ColumnProfile};
use strata_orchestrator::{OrchestratorError, PlatformService, StartTrainingRequest};
use strata_training::{
    validate as validate_config, Algorithm, ConfigValidation, IssueKind, JobStatus,
    NaiveBayesBackend, PredictionInput, TrainingConfiguration,
};

/// Poll cadence while watching a job. The engine imposes no minimum; the
/// revision fast path keeps this cheap.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub fn profile(file: &Path) -> anyhow::Result<()> {
    let table = loader::load_csv(file)?;
    let profiles = profile_table(&table).context("profiling dataset")?;

    println!(
        "{}: {} rows, {} columns\n",
        file.display(),
        table.row_count(),
        table.column_count()
    );
    println!("{}", render_profiles(&profiles));
    Ok(())
}

pub fn validate(
    file: &Path,
    target: &str,
    features: Vec<String>,
    test_size: Option<f64>,
    defaults: &CliDefaults,
) -> anyhow::Result<()> {
    let table = loader::load_csv(file)?;
    let profiles = profile_table(&table).context("profiling dataset")?;

    let mut configuration = TrainingConfiguration::new(target, features);
    configuration.model.test_size = test_size.unwrap_or(defaults.test_size);
    configuration.model.random_state = defaults.random_state;

    let validation = validate_config(&configuration, &profiles);
    print_issues(&validation);
    if !validation.is_valid {
        bail!("configuration is not valid");
    }
    println!("{}", "configuration is valid".green());
    Ok(())
}

pub struct TrainArgs {
    pub file: PathBuf,
    pub target: String,
    pub features: Vec<String>,
    pub test_size: Option<f64>,
    pub algorithm: Option<String>,
    pub name: Option<String>,
    pub predict: Option<String>,
    pub defaults: CliDefaults,
}

pub async fn train(args: TrainArgs) -> anyhow::Result<()> {
    let table = loader::load_csv(&args.file)?;
    let service = PlatformService::new(Arc::new(NaiveBayesBackend::new()));

    let dataset_name = args
        .file
        .file_stem()
        .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned());
    let summary = service.register_dataset(&dataset_name, table).await?;
    println!("registered dataset {} ({} rows)", summary.id, summary.row_count);

    let algorithm =
        parse_algorithm(args.algorithm.as_deref().unwrap_or(&args.defaults.algorithm))?;
    let request = StartTrainingRequest {
        project_id: "cli".to_string(),
        dataset_id: summary.id,
        target_column: args.target,
        feature_columns: args.features.clone(),
        algorithm: Some(algorithm),
        test_size: Some(args.test_size.unwrap_or(args.defaults.test_size)),
        random_state: Some(args.defaults.random_state),
        preprocessing: None,
    };

    let response = match service.start_training(request).await {
        Ok(response) => response,
        Err(OrchestratorError::InvalidConfiguration { validation, .. }) => {
            print_issues(&validation);
            bail!("configuration rejected; no job was started");
        }
        Err(e) => return Err(e.into()),
    };
    println!("job {} accepted", response.job_id);

    // Poll until terminal, printing only when the record changed.
    let mut snapshot = service.training_status(&response.job_id).await?;
    print_status(&snapshot);
    while !snapshot.status.is_terminal() {
        tokio::time::sleep(POLL_INTERVAL).await;
        if let Some(changed) = service
            .training_status_if_changed(&response.job_id, snapshot.revision)
            .await?
        {
            snapshot = changed;
            print_status(&snapshot);
        }
    }

    if snapshot.status == JobStatus::Failed {
        bail!(
            "training failed: {}",
            snapshot.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    let results = service.training_results(&response.job_id).await?;
    println!("\n{}", "training completed".green().bold());
    let mut metrics = Table::new();
    metrics.load_preset(UTF8_FULL).set_header(vec!["metric", "value"]);
    metrics.add_row(vec!["accuracy".to_string(), format!("{:.3}", results.accuracy)]);
    metrics.add_row(vec!["precision".to_string(), format!("{:.3}", results.precision)]);
    metrics.add_row(vec!["recall".to_string(), format!("{:.3}", results.recall)]);
    metrics.add_row(vec!["f1_score".to_string(), format!("{:.3}", results.f1_score)]);
    if let Some(secs) = results.training_time_secs {
        metrics.add_row(vec!["training_time".to_string(), format!("{secs:.2}s")]);
    }
    println!("{metrics}");

    if args.name.is_none() && args.predict.is_none() {
        return Ok(());
    }
    let model_name = args.name.unwrap_or_else(|| format!("{dataset_name}-model"));
    let record = service
        .deploy_model(&response.job_id, &args.defaults.owner, &model_name)
        .await?;
    println!("deployed '{}' at {}", record.model_name, record.api_endpoint);

    if let Some(text) = args.predict {
        let column = args
            .features
            .first()
            .ok_or_else(|| anyhow!("no feature column to attach the input to"))?;
        let input = PredictionInput::new().with_field(column.clone(), text);
        let prediction = service.predict(&record.model_id, &input).await?;
        println!(
            "prediction: {} (confidence {:.3}, {:.1} ms)",
            prediction.prediction.bold(),
            prediction.confidence,
            prediction.processing_time_ms
        );
    }
    Ok(())
}

fn parse_algorithm(name: &str) -> anyhow::Result<Algorithm> {
    match name {
        "auto" => Ok(Algorithm::Auto),
        "logistic" => Ok(Algorithm::Logistic),
        "svm" => Ok(Algorithm::Svm),
        "random_forest" => Ok(Algorithm::RandomForest),
        "naive_bayes" => Ok(Algorithm::NaiveBayes),
        other => bail!("unknown algorithm '{other}'"),
    }
}

fn render_profiles(profiles: &[ColumnProfile]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "column", "type", "nulls", "unique", "quality", "target?", "feature?",
    ]);
    for profile in profiles {
        table.add_row(vec![
            profile.name.clone(),
            format!("{:?}", profile.inferred_type).to_lowercase(),
            format!("{} ({}%)", profile.null_count, profile.null_percentage),
            profile.unique_count.to_string(),
            format!("{:?}", profile.data_quality).to_lowercase(),
            mark(profile.is_recommended_target),
            mark(profile.is_recommended_feature),
        ]);
    }
    table
}

fn mark(flag: bool) -> String {
    if flag { "yes".to_string() } else { String::new() }
}

fn print_issues(validation: &ConfigValidation) {
    for issue in &validation.issues {
        let label = match issue.kind {
            IssueKind::Error => "error".red().bold(),
            IssueKind::Warning => "warning".yellow(),
            IssueKind::Info => "info".blue(),
        };
        match &issue.column {
            Some(column) => println!("{label} [{column}]: {}", issue.message),
            None => println!("{label}: {}", issue.message),
        }
    }
}

fn print_status(snapshot: &strata_orchestrator::JobSnapshot) {
    let status = match snapshot.status {
        JobStatus::Completed => snapshot.status.to_string().green(),
        JobStatus::Failed => snapshot.status.to_string().red(),
        _ => snapshot.status.to_string().cyan(),
    };
    println!("{:>3}% {:<13} {}", snapshot.progress, status, snapshot.current_step);
}
