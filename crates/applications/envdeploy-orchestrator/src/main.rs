//! envdeploy - stage custom resources and deploy environment stacks
//!
//! ## Usage
//!
//! ```bash
//! # List the custom resources found in the template tree
//! envdeploy artifacts --template-dir ./templates
//!
//! # Upload custom resources only, printing the URL map as JSON
//! envdeploy --app phonetool --env test --region us-west-2 upload
//!
//! # Upload and deploy the environment stack
//! envdeploy --app phonetool --env test --region us-west-2 \
//!     deploy --root-user-arn arn:aws:iam::123456789012:root
//!
//! # Deploy with URLs from an earlier upload, using the legacy packager layout
//! envdeploy --app phonetool --env test --upload-mode legacy \
//!     deploy --root-user-arn arn:aws:iam::123456789012:root --urls-file urls.json
//! ```

use anyhow::Context;
use aws_config::BehaviorVersion;
use aws_types::region::Region;
use clap::{Parser, Subcommand};
use envdeploy_core::{Application, ArtifactUrls, DeploymentInput, Environment};
use envdeploy_orchestrator::{
    artifact_key, BundledCustomResources, ConsoleProgress, DeployConfig, DirectUpload,
    EnvDeployer, S3Uploader, TemplateTree, TerraformAppResources, TerraformEnvironmentDeployer,
    TracingProgress, UploadMode, UploadStrategy, DEFAULT_UPLOAD_CONCURRENCY,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// envdeploy: regional environment deployments
#[derive(Parser)]
#[command(name = "envdeploy")]
#[command(about = "Stage custom resources and deploy environment stacks", long_about = None)]
struct Cli {
    /// Application name
    #[arg(long, global = true, env = "ENVDEPLOY_APP")]
    app: Option<String>,

    /// Environment name
    #[arg(long, global = true, env = "ENVDEPLOY_ENV")]
    env: Option<String>,

    /// AWS region of the environment
    #[arg(long, global = true, env = "ENVDEPLOY_REGION", default_value = "us-east-1")]
    region: String,

    /// Template tree containing custom-resources/
    #[arg(long, global = true, env = "ENVDEPLOY_TEMPLATE_DIR", default_value = "./templates")]
    template_dir: PathBuf,

    /// Directory of pre-built custom resource archives (legacy upload mode)
    #[arg(long, global = true, env = "ENVDEPLOY_BUNDLE_DIR", default_value = "./custom-resources")]
    bundle_dir: PathBuf,

    /// Root of the Terraform stacks
    #[arg(long, global = true, env = "ENVDEPLOY_INFRA_DIR", default_value = "./infra")]
    infra_dir: PathBuf,

    /// Custom resource upload mode (direct, legacy)
    #[arg(long, global = true, env = "ENVDEPLOY_UPLOAD_MODE", default_value = "direct", value_parser = parse_upload_mode)]
    upload_mode: UploadMode,

    /// Concurrent uploads in direct mode
    #[arg(long, global = true, default_value_t = DEFAULT_UPLOAD_CONCURRENCY)]
    upload_concurrency: usize,

    /// Terraform executable
    #[arg(long, global = true, env = "ENVDEPLOY_TERRAFORM", default_value = "terraform")]
    terraform_bin: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List custom resources in the template tree and their storage keys
    Artifacts,

    /// Upload custom resources and print the URL map as JSON
    Upload,

    /// Upload custom resources (unless --urls-file is given) and deploy the environment
    Deploy {
        /// Root user ARN of the application account
        #[arg(long, env = "ENVDEPLOY_ROOT_USER_ARN")]
        root_user_arn: String,

        /// Role managing the environment's resources
        #[arg(long, default_value = "")]
        manager_role_arn: String,

        /// Role Terraform assumes while applying the stack
        #[arg(long)]
        execution_role_arn: Option<String>,

        /// Application domain
        #[arg(long)]
        domain: Option<String>,

        /// JSON file with custom resource URLs from an earlier upload
        #[arg(long)]
        urls_file: Option<PathBuf>,

        /// Apply even when nothing changed
        #[arg(long)]
        force: bool,

        /// Terraform parallelism
        #[arg(long)]
        parallelism: Option<u32>,

        /// Send stack output to the log instead of stdout
        #[arg(long)]
        quiet: bool,
    },
}

fn parse_upload_mode(s: &str) -> Result<UploadMode, String> {
    UploadMode::from_str(s).ok_or_else(|| format!("unknown upload mode '{s}' (direct, legacy)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "envdeploy=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = DeployConfig::default()
        .with_upload_mode(cli.upload_mode)
        .with_template_dir(&cli.template_dir)
        .with_bundle_dir(&cli.bundle_dir)
        .with_infra_dir(&cli.infra_dir)
        .with_upload_concurrency(cli.upload_concurrency)
        .with_terraform_bin(&cli.terraform_bin);

    match cli.command {
        Commands::Artifacts => list_artifacts(&config),

        Commands::Upload => {
            config.validate()?;
            let (app, env) = target(cli.app, cli.env, cli.region, None)?;
            let deployer = build_deployer(app, env, &config).await;

            let urls = deployer.upload_artifacts().await?;
            println!("{}", serde_json::to_string_pretty(&urls)?);
            Ok(())
        }

        Commands::Deploy {
            root_user_arn,
            manager_role_arn,
            execution_role_arn,
            domain,
            urls_file,
            force,
            parallelism,
            quiet,
        } => {
            let config = match parallelism {
                Some(n) => config.with_parallelism(n),
                None => config,
            };
            config.validate()?;

            let (app, mut env) = target(cli.app, cli.env, cli.region, domain)?;
            env.manager_role_arn = manager_role_arn;
            env.execution_role_arn = execution_role_arn;

            let deployer = build_deployer(app, env, &config).await;
            let deployer = if quiet {
                deployer.with_progress(Arc::new(TracingProgress))
            } else {
                deployer.with_progress(Arc::new(ConsoleProgress))
            };

            let custom_resources_urls = match urls_file {
                Some(path) => read_urls(&path)?,
                None => deployer.upload_artifacts().await?,
            };

            deployer
                .deploy_environment(&DeploymentInput {
                    root_user_arn,
                    custom_resources_urls,
                    force_new_update: force,
                })
                .await?;

            info!("✅ Environment deployed");
            Ok(())
        }
    }
}

/// Application and environment from the global flags
fn target(
    app: Option<String>,
    env: Option<String>,
    region: String,
    domain: Option<String>,
) -> anyhow::Result<(Application, Environment)> {
    let app = app.ok_or_else(|| anyhow::anyhow!("--app required"))?;
    let env = env.ok_or_else(|| anyhow::anyhow!("--env required"))?;

    let mut application = Application::new(&app);
    application.domain = domain;
    Ok((application, Environment::new(app, env, region)))
}

/// Wire the AWS and Terraform collaborators into a deployer
async fn build_deployer(app: Application, env: Environment, config: &DeployConfig) -> EnvDeployer {
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(env.region.clone()))
        .load()
        .await;
    let uploader = Arc::new(S3Uploader::from_config(&aws_config));

    let uploads = match config.upload_mode {
        UploadMode::Legacy => UploadStrategy::Legacy(Arc::new(BundledCustomResources::new(
            &config.bundle_dir,
            uploader,
        ))),
        UploadMode::Direct => UploadStrategy::Direct(
            DirectUpload::new(TemplateTree::new(&config.template_dir), uploader)
                .with_concurrency(config.upload_concurrency),
        ),
    };

    EnvDeployer::new(
        app,
        env,
        Arc::new(TerraformAppResources::new(
            &config.infra_dir,
            &config.terraform_bin,
        )),
        uploads,
        Arc::new(TerraformEnvironmentDeployer::new(
            &config.infra_dir,
            &config.terraform_bin,
        )),
    )
    .with_parallelism(config.parallelism)
}

/// Print each custom resource with the key it would be uploaded under
fn list_artifacts(config: &DeployConfig) -> anyhow::Result<()> {
    let tree = TemplateTree::new(&config.template_dir);
    let resources = tree
        .env_custom_resources()
        .with_context(|| format!("scan {}", tree.root().display()))?;

    println!("{:<40} KEY", "FUNCTION");
    for cr in &resources {
        let body = cr
            .render()
            .with_context(|| format!("render {}", cr.function_name()))?;
        println!("{:<40} {}", cr.function_name(), artifact_key(cr.function_name(), &body));
    }
    println!("\n{} custom resource(s)", resources.len());
    Ok(())
}

/// Read a custom resource URL map written by `envdeploy upload`
fn read_urls(path: &Path) -> anyhow::Result<ArtifactUrls> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}
