use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardgenie_core::catalog::Catalog;
use cardgenie_core::comparison;
use cardgenie_core::domain::profile::{parse_monthly_income, UserProfile, BENEFIT_OPTIONS, SPENDING_OPTIONS};
use cardgenie_core::filter::{self, CardFilter};
use cardgenie_core::oracle::gemini::GeminiClient;
use cardgenie_core::oracle::OracleRequest;
use cardgenie_core::orchestrator::{RecommendationOrchestrator, RequestState};
use cardgenie_core::selection::{SelectionSet, ToggleOutcome};

#[derive(Debug, Parser)]
#[command(name = "cardgenie")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Browse the card catalog.
    Cards {
        /// all, no-annual-fee, best-for-travel, cashback or premium.
        #[arg(long, default_value_t = CardFilter::All)]
        filter: CardFilter,

        /// Case-insensitive match on card name or issuer.
        #[arg(long, default_value = "")]
        search: String,
    },

    /// Ask the AI assistant for cards matching a profile.
    Recommend {
        /// Monthly income in INR.
        #[arg(long)]
        income: String,

        /// Top spending category (repeatable), e.g. Shopping, Fuel, Travel.
        #[arg(long = "spending")]
        spending: Vec<String>,

        /// Desired benefit (repeatable), e.g. Cashback, Lounge Access.
        #[arg(long = "benefit")]
        benefits: Vec<String>,

        /// Card id to add to the manual comparison (repeatable, at most 4 kept).
        #[arg(long = "compare")]
        compare: Vec<String>,

        /// Print the oracle prompt instead of calling it.
        #[arg(long)]
        dry_run: bool,
    },

    /// List the suggested spending categories and benefits.
    Options,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = cardgenie_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let catalog = Arc::new(Catalog::from_settings(&settings)?);

    match args.command {
        Command::Cards {
            filter: active_filter,
            search,
        } => {
            let visible = filter::visible_cards(catalog.cards(), active_filter, &search);
            if visible.is_empty() {
                tracing::info!(filter = %active_filter, %search, "no cards match your criteria");
            }
            print_json(&visible)
        }
        Command::Options => print_json(&serde_json::json!({
            "spendingCategories": SPENDING_OPTIONS,
            "desiredBenefits": BENEFIT_OPTIONS,
            "filters": CardFilter::ALL.map(|f| f.label()),
        })),
        Command::Recommend {
            income,
            spending,
            benefits,
            compare,
            dry_run,
        } => {
            let income = parse_monthly_income(&income)?;
            let profile = UserProfile::try_new(income, spending, benefits)?;
            let selection = build_selection(&catalog, &compare)?;

            if dry_run {
                let request = OracleRequest::new(profile, &catalog);
                println!("{}", GeminiClient::user_prompt(&request)?);
                tracing::info!(dry_run = true, cards_len = request.catalog.len(), "oracle prompt printed");
                return Ok(());
            }

            let orchestrator = match GeminiClient::from_settings(&settings) {
                Ok(client) => RecommendationOrchestrator::new(catalog.clone(), Arc::new(client)),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::warn!(error = %e, "recommendation oracle unavailable");
                    RecommendationOrchestrator::unconfigured(catalog.clone())
                }
            };

            let state = orchestrator.request_recommendations(profile).await;
            if let RequestState::Failed { .. } = state {
                if let Some(diagnostic) = orchestrator.last_diagnostic() {
                    tracing::debug!(%diagnostic, "recommendation failure detail");
                }
            }

            print_json(&comparison::assemble(&state, &selection))
        }
    }
}

fn build_selection(catalog: &Catalog, ids: &[String]) -> anyhow::Result<SelectionSet> {
    let mut selection = SelectionSet::new();
    for id in ids {
        let card = catalog
            .get(id)
            .with_context(|| format!("unknown card id: {id}"))?;
        if selection.toggle(card) == ToggleOutcome::AtCapacity {
            tracing::warn!(card_id = %id, "comparison limit of 4 cards reached; card skipped");
        }
    }
    Ok(selection)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn init_sentry(settings: &cardgenie_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
