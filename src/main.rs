mod cli;
mod presets;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use cli::report::ReportOptions;
use cli::score::{ScoreFormat, ScoreRequest};
use sso_audit::output::ReportFormat;

#[derive(Parser)]
#[command(
    name = "sso-audit",
    about = "AWS IAM Identity Center access reporting",
    version
)]
enum Cli {
    /// Collect users, groups, accounts and permission sets and write the reports
    Report(ReportArgs),
    /// Score a role's actions or an IAM policy document offline
    Score(ScoreArgs),
    /// Show the classification of account names
    Classify(ClassifyArgs),
    /// Write an sso-audit.toml configuration preset
    Init(InitArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

impl Cli {
    fn verbose(&self) -> bool {
        match self {
            Self::Report(args) => args.verbose,
            Self::Score(args) => args.verbose,
            _ => false,
        }
    }
}

#[derive(Parser)]
struct ReportArgs {
    #[arg(
        long,
        short,
        value_delimiter = ',',
        help = "Report formats: csv, xlsx, html, json (default: from config, all)"
    )]
    format: Vec<ReportFormat>,

    #[arg(long, short, help = "Directory for the report files")]
    output_dir: Option<PathBuf>,

    #[arg(long, help = "File name prefix for the report files")]
    prefix: Option<String>,

    #[arg(long, help = "Path to sso-audit.toml (default: ./sso-audit.toml)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Configuration profile to use")]
    profile: Option<String>,

    #[arg(long, help = "AWS region of the IAM Identity Center instance")]
    region: Option<String>,

    #[arg(long, help = "Named AWS profile for credentials")]
    aws_profile: Option<String>,

    #[arg(long, help = "Custom permission scoring table (YAML)")]
    scoring: Option<PathBuf>,

    #[arg(long, short, help = "Log progress to stderr")]
    verbose: bool,
}

#[derive(Parser)]
struct ScoreArgs {
    #[arg(help = "IAM actions to score, e.g. iam:CreateUser s3:GetObject")]
    actions: Vec<String>,

    #[arg(long, help = "IAM policy document (JSON) whose allowed actions are scored")]
    policy: Option<PathBuf>,

    #[arg(long, default_value = "CustomRole", help = "Role name shown in the report")]
    name: String,

    #[arg(long, default_value = "", help = "Role ARN shown in the report")]
    arn: String,

    #[arg(
        long,
        short,
        default_value = "markdown",
        help = "Output format: json, markdown, csv"
    )]
    format: ScoreFormat,

    #[arg(long, help = "Custom permission scoring table (YAML)")]
    scoring: Option<PathBuf>,

    #[arg(long, help = "CI-friendly markdown (plain tags instead of emoji)")]
    ci: bool,

    #[arg(long, short, help = "Write the report to a file instead of stdout")]
    output: Option<PathBuf>,

    #[arg(long, short, help = "Log progress to stderr")]
    verbose: bool,
}

#[derive(Parser)]
struct ClassifyArgs {
    #[arg(help = "Account names to classify (lists the rules when empty)")]
    names: Vec<String>,

    #[arg(long, help = "Path to sso-audit.toml (default: ./sso-audit.toml)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Configuration profile to use")]
    profile: Option<String>,
}

#[derive(Parser)]
struct InitArgs {
    #[arg(
        long,
        default_value = "standard",
        value_parser = ["standard", "minimal", "ci"],
        help = "Configuration preset: standard, minimal, ci"
    )]
    preset: String,

    #[arg(long, help = "Overwrite existing sso-audit.toml if it already exists")]
    force: bool,
}

#[derive(Parser)]
struct CompletionsArgs {
    #[arg(help = "Target shell: bash, zsh, fish, elvish, powershell")]
    shell: Shell,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SSO_AUDIT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let command = Cli::parse();
    init_tracing(command.verbose());

    match command {
        Cli::Report(args) => cli::report::run_report(ReportOptions {
            config: args.config,
            profile: args.profile,
            region: args.region,
            aws_profile: args.aws_profile,
            scoring: args.scoring,
            formats: args.format,
            output_dir: args.output_dir,
            prefix: args.prefix,
        }),
        Cli::Score(args) => cli::score::run_score(&ScoreRequest {
            actions: &args.actions,
            policy: args.policy.as_deref(),
            name: &args.name,
            arn: &args.arn,
            scoring: args.scoring.as_deref(),
            format: args.format,
            ci: args.ci,
            output: args.output.as_deref(),
        }),
        Cli::Classify(args) => cli::classify::run_classify(
            &args.names,
            args.config.as_deref(),
            args.profile.as_deref(),
        ),
        Cli::Init(args) => cli::init::run_init(&args.preset, args.force),
        Cli::Completions(args) => {
            generate(
                args.shell,
                &mut Cli::command(),
                "sso-audit",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}
