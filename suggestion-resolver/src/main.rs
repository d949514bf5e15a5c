use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use suggestion_resolver::{
    Category, GameSession, MarkerPreference, PriorItem, Resolution, ResolutionStrategy,
    ResolverConfig, Resolver, ResultSet, SearchBackend, Theme,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Trust the suggested link, search when it fails
    Link,
    /// Always search
    Search,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    DataApi,
    YtDlp,
}

#[derive(Parser, Debug)]
#[clap(
    name = "song-game",
    about = "Generate a themed round of songs, quotes or movie scenes to guess",
    version
)]
struct Args {
    #[clap(short, long)]
    /// Theme of the round, e.g. "80s synth pop"
    theme: String,

    #[clap(short, long, default_value = "song")]
    /// song, quote or movie-scene
    category: String,

    #[clap(short = 'n', long, default_value_t = 10)]
    /// Items per batch
    count: usize,

    #[clap(long, default_value_t = 1)]
    /// Batches to generate; later batches exclude everything already played
    rounds: usize,

    #[clap(long, value_enum)]
    strategy: Option<StrategyArg>,

    #[clap(long)]
    /// Look for karaoke/instrumental versions instead of originals
    prefer_karaoke: bool,

    #[clap(long, value_enum)]
    search_backend: Option<BackendArg>,

    #[clap(long)]
    model: Option<String>,

    #[clap(long)]
    /// Display-only movie scenes, no clip lookup
    no_clips: bool,

    #[clap(long = "exclude", value_name = "TITLE|CONTRIBUTOR")]
    /// Already-played item, repeatable
    exclude: Vec<String>,

    #[clap(long)]
    /// Print each batch as JSON instead of text
    json: bool,

    #[clap(long, default_value = "info")]
    /// Log level used when RUST_LOG is not set
    log_level: String,
}

impl Args {
    fn apply(&self, config: &mut ResolverConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = match strategy {
                StrategyArg::Link => ResolutionStrategy::TrustLinkThenSearch,
                StrategyArg::Search => ResolutionStrategy::SearchOnly,
            };
        }
        if let Some(backend) = self.search_backend {
            config.search_backend = match backend {
                BackendArg::DataApi => SearchBackend::DataApi,
                BackendArg::YtDlp => SearchBackend::YtDlp,
            };
        }
        if self.prefer_karaoke {
            config.marker_preference = MarkerPreference::PreferKaraoke;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if self.no_clips {
            config.movie_scene_clips = false;
        }
    }
}

fn parse_exclusion(raw: &str) -> Result<PriorItem> {
    let (title, contributor) = raw
        .split_once('|')
        .ok_or_else(|| anyhow!("--exclude expects TITLE|CONTRIBUTOR, got '{}'", raw))?;
    Ok(PriorItem::new(title.trim(), contributor.trim()))
}

fn print_text(result_set: &ResultSet, resolution: &Resolution) {
    println!(
        "\n{} {} for \"{}\"",
        result_set.len(),
        result_set.category().plural(),
        result_set.theme()
    );
    for (index, item) in result_set.items().iter().enumerate() {
        println!("{:>3}. {}", index + 1, item.display_title);
        println!(
            "     {} | {} | {} | {}",
            item.display_meta.contributor,
            item.display_meta.source,
            item.display_meta.year,
            item.display_meta.genre
        );
        if let Some(video) = &item.media {
            println!("     {} ({:?}, {:?})", video.watch_url(), item.available, item.resolution);
            println!("     embed: {}", video.embed_url());
        }
        if let Some(hints) = &item.hints {
            println!("     {} hint levels", hints.levels_available());
            if let Some(anonymized) = &hints.anonymized {
                println!("     hint: {}", anonymized);
            }
        }
    }

    let report = &resolution.report;
    if !report.unresolved.is_empty() {
        println!("\nCould not find videos for: {}", report.unresolved.join(", "));
    }
    if report.needs_warning() {
        println!(
            "\nWarning: only {} of {} requested items could be resolved.",
            report.resolved, report.requested
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .init();

    let category: Category = args.category.parse()?;
    let theme = Theme::new(&args.theme)?;

    let mut config = ResolverConfig::from_env();
    args.apply(&mut config);
    let resolver = Resolver::from_config(&config).context("Failed to set up the resolver")?;

    let mut session = GameSession::new(category, theme);
    let excluded = args
        .exclude
        .iter()
        .map(|raw| parse_exclusion(raw))
        .collect::<Result<Vec<_>>>()?;
    if !excluded.is_empty() {
        info!("Starting with {} excluded items", excluded.len());
    }

    for round in 1..=args.rounds.max(1) {
        let request = session
            .next_request(args.count)?
            .with_exclusions(excluded.iter().cloned());

        let resolution = match resolver.resolve(&request).await {
            Ok(resolution) => resolution,
            Err(e) if e.is_recoverable() => {
                error!("Round {} failed: {}", round, e);
                warn!("Run the command again to retry");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        if args.json {
            let output = serde_json::json!({
                "round": round,
                "result_set": &resolution.result_set,
                "report": &resolution.report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&resolution.result_set, &resolution);
        }

        let added = session.install(resolution.result_set);
        info!(
            "Round {} done, {} new items, {} in history",
            round,
            added,
            session.history().len()
        );
    }

    Ok(())
}
