use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use apify_client::ApifyClient;
use leadscout_common::{Config, Entity, Platform, SearchMode};
use leadscout_pipeline::autopilot::{Autopilot, AutopilotConfig};
use leadscout_pipeline::cascade::StandardSources;
use leadscout_pipeline::history::{HistoryStore, MemoryHistoryStore, PgHistoryStore};
use leadscout_pipeline::progress::TracingSink;
use leadscout_pipeline::providers::apify::{
    ApifyContactScraper, ApifyStaffDirectory, ApifyTwitterProfiles, LinkedInListing, MapsListing,
};
use leadscout_pipeline::providers::dns::MxProbe;
use leadscout_pipeline::providers::http::HttpFetcher;
use leadscout_pipeline::providers::serper::SerperSearch;
use leadscout_pipeline::providers::whois::{DomainsBot, WhoisJsonApi};
use leadscout_pipeline::providers::{ListingProvider, RegistrationLookup, SearchIndex, Summarizer};
use leadscout_pipeline::quota::SearchQuota;
use leadscout_pipeline::settings::{AcquisitionSettings, CascadeSettings};
use leadscout_pipeline::{CascadeResolver, Orchestrator, PipelineDeps, RunRequest};

#[derive(Parser)]
#[command(name = "leadscout")]
#[command(about = "Find and enrich B2B leads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct RunArgs {
    /// History owner; leads already delivered to this user are skipped
    #[arg(long, default_value = "local")]
    user: String,

    /// Free-text description of the leads wanted
    #[arg(long)]
    query: String,

    #[arg(long, default_value_t = 10)]
    quota: usize,

    /// maps | linkedin
    #[arg(long, default_value = "maps")]
    platform: Platform,

    /// fast | deep
    #[arg(long, default_value = "fast")]
    mode: SearchMode,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one acquisition and print the accepted leads as JSON
    Run(RunArgs),

    /// Run the discovery cascade for a single company
    Discover {
        #[arg(long)]
        name: String,

        #[arg(long)]
        website: String,

        #[arg(long, default_value = "")]
        location: String,

        /// Company page or social profile URL
        #[arg(long)]
        social_url: Option<String>,

        /// Known owner name, if any
        #[arg(long)]
        owner: Option<String>,
    },

    /// Run daily at the scheduled time configured in the autopilot file
    Autopilot {
        #[command(flatten)]
        run: RunArgs,

        /// Autopilot config file (default: $DATA_DIR/autopilot.json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enable with this "HH:MM" schedule before starting
        #[arg(long)]
        at: Option<String>,
    },
}

/// Everything built from config, shared by all subcommands.
struct Services {
    config: Config,
    quota: Arc<SearchQuota>,
    cascade: Arc<CascadeResolver>,
    orchestrator: Orchestrator,
}

async fn build_services(config: Config) -> Result<Services> {
    let apify = Arc::new(ApifyClient::new(config.apify_api_token.clone()));
    let summarizer: Option<Arc<dyn Summarizer>> = config
        .anthropic_api_key
        .as_ref()
        .map(|key| Arc::new(Claude::new(key.clone(), config.claude_model.clone())) as Arc<dyn Summarizer>);
    let search: Option<Arc<dyn SearchIndex>> = config
        .serper_api_key
        .as_deref()
        .map(|key| Arc::new(SerperSearch::new(key)) as Arc<dyn SearchIndex>);
    if search.is_none() {
        warn!("SERPER_API_KEY not set, web search source disabled");
    }
    let quota = Arc::new(SearchQuota::new(config.search_daily_quota));
    let probe = Arc::new(MxProbe::new());

    let cascade = Arc::new(CascadeResolver::standard(
        CascadeSettings::default(),
        StandardSources {
            staff: Arc::new(ApifyStaffDirectory::new(apify.clone())),
            search,
            quota: quota.clone(),
            fetcher: Arc::new(HttpFetcher::new()),
            summarizer: summarizer.clone(),
            probe,
            registries: vec![
                Arc::new(WhoisJsonApi::new()) as Arc<dyn RegistrationLookup>,
                Arc::new(DomainsBot::new()),
            ],
            social: Arc::new(ApifyTwitterProfiles::new(apify.clone())),
        },
    ));

    let history: Arc<dyn HistoryStore> = match &config.database_url {
        Some(url) => Arc::new(PgHistoryStore::connect(url).await?),
        None => {
            warn!("DATABASE_URL not set, history is kept in memory for this process only");
            Arc::new(MemoryHistoryStore::new())
        }
    };

    let deps = PipelineDeps::builder()
        .config(config.clone())
        .history(history)
        .listings(vec![
            Arc::new(MapsListing::new(apify.clone())) as Arc<dyn ListingProvider>,
            Arc::new(LinkedInListing::new(apify.clone())),
        ])
        .scraper(Arc::new(ApifyContactScraper::new(apify)))
        .cascade(cascade.clone())
        .settings(AcquisitionSettings::from_config(&config))
        .build();
    let deps = match summarizer {
        Some(summarizer) => PipelineDeps { summarizer: Some(summarizer), ..deps },
        None => deps,
    };

    Ok(Services {
        config,
        quota,
        cascade,
        orchestrator: Orchestrator::new(deps),
    })
}

fn stop_on_ctrl_c(flags: Vec<Arc<AtomicBool>>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after in-flight work");
            for flag in flags {
                flag.store(true, Ordering::Relaxed);
            }
        }
    });
}

fn request_from(args: &RunArgs, quota: usize) -> RunRequest {
    RunRequest {
        user_id: args.user.clone(),
        query: args.query.clone(),
        quota,
        platform: args.platform,
        mode: args.mode,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadscout=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env();
    config.log_redacted();
    config.validate()?;

    let services = build_services(config).await?;
    let shutdown = Arc::new(AtomicBool::new(false));
    stop_on_ctrl_c(vec![services.orchestrator.cancel_flag(), shutdown.clone()]);
    let sink = TracingSink;

    match cli.command {
        Commands::Run(args) => {
            let outcome = services
                .orchestrator
                .run(request_from(&args, args.quota), &sink)
                .await?;
            info!(
                run_id = outcome.run_id.as_str(),
                accepted = outcome.leads.len(),
                termination = ?outcome.stats.termination,
                "Run complete"
            );
            println!("{}", serde_json::to_string_pretty(&outcome.leads)?);
        }
        Commands::Discover {
            name,
            website,
            location,
            social_url,
            owner,
        } => {
            let mut entity = Entity::new(name).with_website(website).with_location(location);
            entity.social_url = social_url;
            let result = services.cascade.resolve(Arc::new(entity), owner, &sink).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Autopilot { run, config, at } => {
            let path = config.unwrap_or_else(|| services.config.data_dir.join("autopilot.json"));
            if let Some(time) = at {
                let mut autopilot_config = AutopilotConfig::load(&path)?;
                autopilot_config.enable(&time, u32::try_from(run.quota).unwrap_or(u32::MAX))?;
                autopilot_config.save(&path)?;
                info!(time = autopilot_config.scheduled_time.as_str(), "Autopilot enabled");
            }

            let mut autopilot = Autopilot::new(path, services.quota.clone());
            let orchestrator = &services.orchestrator;
            let sink = &sink;
            let run_args = &run;
            autopilot
                .run(shutdown, |quantity| async move {
                    let quota = usize::try_from(quantity).unwrap_or(usize::MAX);
                    match orchestrator.run(request_from(run_args, quota), sink).await {
                        Ok(outcome) => info!(
                            run_id = outcome.run_id.as_str(),
                            accepted = outcome.leads.len(),
                            "Autopilot run complete"
                        ),
                        Err(e) => error!(error = %e, "Autopilot run failed"),
                    }
                })
                .await;
        }
    }

    Ok(())
}
