use paperlens::batch::BatchRunner;
use paperlens::cli::{Cli, Commands, ConfigAction};
use paperlens::config::Config;
use paperlens::engine::{self, Engine};
use paperlens::error::{PaperLensError, Result};
use paperlens::storage::ArtifactStore;
use std::path::{Path, PathBuf};

fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest { input } => cmd_ingest(cli.config, input),
        Commands::Build => cmd_build(cli.config),
        Commands::Index { input } => {
            cmd_ingest(cli.config.clone(), input)?;
            cmd_build(cli.config)
        }
        Commands::Chat { top_k } => cmd_chat(cli.config, top_k),
        Commands::Ask {
            question,
            top_k,
            max_tokens,
        } => cmd_ask(cli.config, &question, top_k, max_tokens),
        Commands::Query { query, limit, json } => cmd_query(cli.config, &query, limit, json),
        Commands::Batch { input, output } => cmd_batch(cli.config, &input, output.as_deref()),
        Commands::Status => cmd_status(cli.config),
        Commands::Config { action } => cmd_config(cli.config, action),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "paperlens=debug" } else { "paperlens=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_ingest(config_path: Option<PathBuf>, input: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let input = match input {
        Some(path) => path,
        None => config.corpus_path()?,
    };

    let stats = engine::ingest(&config, &input)?;

    println!("✓ Ingested {}", input.display());
    println!("  Documents processed: {}", stats.documents);
    println!("  Skipped (too short): {}", stats.skipped_short);
    println!("  Malformed records:   {}", stats.malformed);
    println!("  Chunks created:      {}", stats.chunks);
    Ok(())
}

fn cmd_build(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let manifest = engine::build_indices(&config)?;

    println!("✓ Indices built in {}", config.index_dir()?.display());
    println!("  Chunks:    {}", manifest.chunk_count);
    println!("  Embedder:  {} ({}D)", manifest.embedding_model, manifest.dimension);
    println!("  Tokenizer: {}", manifest.tokenizer);
    Ok(())
}

fn cmd_chat(config_path: Option<PathBuf>, top_k: Option<usize>) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = Engine::open(&config)?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let stdin = std::io::stdin();
    paperlens::chat::run(&engine, top_k, stdin.lock(), std::io::stdout()).map_err(|e| PaperLensError::Io {
        source: e,
        context: "Chat session failed".to_string(),
    })
}

fn cmd_ask(
    config_path: Option<PathBuf>,
    question: &str,
    top_k: Option<usize>,
    max_tokens: Option<usize>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = Engine::open(&config)?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let params = engine.params_with_max_tokens(max_tokens.unwrap_or(config.generation.max_tokens));

    let response = engine.ask_with(question, top_k, &params);
    if response.retrieval.is_degraded() {
        eprintln!(
            "⚠ Retrieval degraded (semantic: {}, keyword: {})",
            response.retrieval.dense, response.retrieval.sparse
        );
    }

    println!("{}", response.answer.text);
    if !response.retrieval.chunks.is_empty() {
        println!("\nSources:");
        for chunk in &response.retrieval.chunks {
            println!("  [{}] {} ({}) - {}", chunk.chunk_id, chunk.title, chunk.year, chunk.paper_id);
        }
    }
    Ok(())
}

fn cmd_query(config_path: Option<PathBuf>, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = Engine::open(&config)?;
    let outcome = engine.retrieve(query, limit.unwrap_or(config.retrieval.top_k));

    if json {
        let out = serde_json::to_string_pretty(&outcome).map_err(|e| PaperLensError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    println!("Semantic search: {}", outcome.dense);
    println!("Keyword search:  {}", outcome.sparse);
    if outcome.is_empty() {
        println!("\nNo results.");
        return Ok(());
    }

    for (i, (chunk, candidate)) in outcome.chunks.iter().zip(&outcome.candidates).enumerate() {
        println!(
            "\n{}. [Source {}] {} ({}) via {} #{}",
            i + 1,
            chunk.chunk_id,
            chunk.title,
            chunk.year,
            candidate.source,
            candidate.rank + 1
        );
        if !chunk.authors.is_empty() {
            println!("   Authors: {}", chunk.authors.join(", "));
        }
        println!("   {}", paperlens::corpus::truncate_chars(&chunk.text, 200));
    }
    Ok(())
}

fn cmd_batch(config_path: Option<PathBuf>, input: &Path, output: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = Engine::open(&config)?;

    let summary = BatchRunner::new(&engine, &config.batch).run(input, output)?;

    println!("\nSummary");
    println!("=======");
    println!("  Total messages:        {}", summary.total);
    println!("  Successfully analyzed: {}", summary.analyzed);
    println!("  Errors:                {}", summary.errors);
    println!("  Skipped:               {}", summary.skipped);
    if summary.truncated > 0 {
        println!("  Truncated:             {}", summary.truncated);
    }
    println!("\n  Results saved to: {}", summary.output.display());
    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = ArtifactStore::new(config.index_dir()?);
    let status = store.status();

    let describe = |size: Option<u64>| match size {
        Some(bytes) => format!("present ({} bytes)", bytes),
        None => "missing".to_string(),
    };

    println!("paperlens Status");
    println!("================");
    println!("\nIndex directory: {}", status.dir.display());
    println!("  chunks.json: {}", describe(status.chunks));
    println!("  dense.idx:   {}", describe(status.dense));
    println!("  sparse.json: {}", describe(status.sparse));

    if status.sparse.is_some() {
        match store.read_sparse() {
            Ok(artifact) => {
                let m = artifact.manifest;
                println!("\nManifest:");
                println!("  Format version: {}", m.format_version);
                println!("  Chunks:         {}", m.chunk_count);
                println!("  Embedder:       {} ({}D)", m.embedding_model, m.dimension);
                println!("  Tokenizer:      {}", m.tokenizer);
                println!("  Fingerprint:    {}", m.chunk_fingerprint);
            }
            Err(e) => println!("\n⚠ {}", e),
        }
    }

    if let Err(e) = store.require_all() {
        println!("\n{}", e);
    }
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| PaperLensError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!("Config file not found, using defaults. Run 'paperlens config init' to create one.");
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    Config::load(&path)
}
