use campus_press::client::SanityClient;
use campus_press::dataset::Dataset;
use campus_press::deploy::{self, DeployConfig, DeployOutcome, DeployTrigger};
use campus_press::query::ContentSource;
use campus_press::studio::{self, AssumeYes, Confirm, PromptConfirm, Role};
use campus_press::types::{SNAPSHOT_FILE, Snapshot};
use campus_press::{config, fetch, generate, output, schema};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "campus-press")]
#[command(about = "Static site generator for an institutional news site")]
#[command(long_about = "\
Static site generator for an institutional news site

Content is written in a headless CMS (news articles, homepage banners,
courses, presidents) and queried with GROQ. Pages are rendered to plain HTML.

Pipeline:

  fetch      CMS API (or --export)  →  <temp-dir>/snapshot.json
  generate   snapshot.json          →  <output>/
  build      fetch + generate

Generated routes:

  /                      banner carousel + latest articles
  /noticias/             all articles
  /noticias/<slug>/      article detail
  /cursos/               courses
  /presidentes/          presidents
  /404.html

Configuration comes from config.toml (see 'campus-press gen-config'), with
SANITY_PROJECT_ID, SANITY_DATASET, SANITY_API_VERSION, SANITY_API_TOKEN,
DEPLOY_HOOK_URL and SITE_URL overriding it. Set RUST_LOG for more detail.")]
#[command(version = version_string())]
struct Cli {
    /// Site configuration file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (snapshot, deploy state)
    #[arg(long, default_value = ".campus-press-temp", global = true)]
    temp_dir: PathBuf,

    /// Read content from a CMS export (NDJSON file or export directory)
    /// instead of the live API
    #[arg(long, global = true)]
    export: Option<PathBuf>,

    /// Static files copied verbatim into the output
    #[arg(long, default_value = "public", global = true)]
    public: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query the CMS into a snapshot
    Fetch,
    /// Produce the HTML site from the snapshot
    Generate,
    /// Run the full pipeline: fetch → generate
    Build,
    /// Validate every document against the content schemas
    Check,
    /// Trigger the rebuild webhook (administrators only)
    Deploy(DeployArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct DeployArgs {
    /// CMS role of the person publishing
    #[arg(long)]
    role: Role,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,

    /// Publish from this document's action menu (shorter confirmation)
    #[arg(long, value_name = "ID")]
    document: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Command::Fetch => {
            let site_config = config::load_config(&cli.config)?;
            let snapshot = run_fetch(&cli, &site_config)?;
            output::print_fetch_output(&snapshot);
        }
        Command::Generate => {
            let snapshot = generate::load_snapshot(&cli.temp_dir.join(SNAPSHOT_FILE))?;
            let report = generate::generate(&snapshot, &cli.output, Some(cli.public.as_path()))?;
            output::print_generate_output(&report);
        }
        Command::Build => {
            let site_config = config::load_config(&cli.config)?;

            println!("==> Stage 1: Fetching content");
            let snapshot = run_fetch(&cli, &site_config)?;
            output::print_fetch_output(&snapshot);

            println!("==> Stage 2: Generating HTML → {}", cli.output.display());
            let report = generate::generate(&snapshot, &cli.output, Some(cli.public.as_path()))?;
            output::print_generate_output(&report);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            let site_config = config::load_config(&cli.config)?;
            let source = content_source(&cli, &site_config)?;
            println!("==> Checking {}", source.describe());
            let documents = source.all_documents()?;
            let violations = schema::validate_all(&documents);
            output::print_check_output(&violations, documents.len());
            if !violations.is_empty() {
                return Err(format!("{} schema violations", violations.len()).into());
            }
            println!("==> Content is valid");
        }
        Command::Deploy(args) => {
            let site_config = config::load_config(&cli.config)?;
            run_deploy(args, &site_config, &cli.temp_dir)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays the command's own output.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("campus_press=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The export when `--export` is given, the live API otherwise.
fn content_source(
    cli: &Cli,
    site_config: &config::SiteConfig,
) -> Result<Box<dyn ContentSource>, Box<dyn std::error::Error>> {
    match &cli.export {
        Some(path) => Ok(Box::new(Dataset::load(path)?)),
        None => {
            site_config.require_project_id()?;
            Ok(Box::new(SanityClient::new(&site_config.cms)?))
        }
    }
}

fn run_fetch(
    cli: &Cli,
    site_config: &config::SiteConfig,
) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let source = content_source(cli, site_config)?;
    let snapshot = fetch::fetch(source.as_ref(), site_config)?;
    std::fs::create_dir_all(&cli.temp_dir)?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(cli.temp_dir.join(SNAPSHOT_FILE), json)?;
    Ok(snapshot)
}

fn run_deploy(
    args: &DeployArgs,
    site_config: &config::SiteConfig,
    state_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let tools = studio::visible_tools(args.role, &studio::ALL_TOOLS);
    tracing::debug!(role = %args.role, ?tools, "tools available");

    let trigger = DeployTrigger::new(DeployConfig::from_site(site_config))?
        .with_last_deploy(deploy::load_last_deploy(state_dir));
    println!("{}", output::format_last_deploy(trigger.last_deploy().as_ref()));

    let mut confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(PromptConfirm::stdio())
    };
    let mut notifier = output::TerminalNotifier::default();
    let outcome = match &args.document {
        Some(id) => trigger.publish_document(id, args.role, confirm.as_mut(), &mut notifier),
        None => trigger.trigger(args.role, confirm.as_mut(), &mut notifier),
    };
    println!("{}", output::format_deploy_outcome(&outcome));

    match outcome {
        DeployOutcome::Started { at } => {
            deploy::save_last_deploy(state_dir, at)?;
            Ok(())
        }
        DeployOutcome::Cancelled => Ok(()),
        other => Err(output::format_deploy_outcome(&other).into()),
    }
}
