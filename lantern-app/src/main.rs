use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lantern_common::UserConfigSource;
use lantern_common::observability::init_logging;
use lantern_config::{ConfigLoader, FileUserConfig, LanternConfig, default_config_path};
use lantern_runtime::LanternRuntime;

mod wiring;

#[derive(Parser)]
#[command(name = "lantern", version, about = "Web-augmented prompts for a chat page")]
struct Cli {
    /// Config file (defaults to <config dir>/lantern/lantern.yaml when present).
    #[arg(long, global = true, env = "LANTERN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the content script against a live chat page until Ctrl-C.
    Attach {
        #[arg(long)]
        headless: bool,
    },
    /// Print the prompt a query would be submitted as.
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
}

/// An explicit `--config` must exist; the default location is optional.
fn load_config(explicit: Option<&PathBuf>) -> Result<(LanternConfig, Option<PathBuf>)> {
    match explicit {
        Some(path) => Ok((ConfigLoader::new().with_file(path).load()?, Some(path.clone()))),
        None => {
            let path = default_config_path();
            let mut loader = ConfigLoader::new();
            if let Some(p) = &path {
                loader = loader.with_optional_file(p);
            }
            Ok((loader.load()?, path.filter(|p| p.exists())))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (cfg, config_path) = load_config(cli.config.as_ref())?;

    let log_path = init_logging(cfg.logging.clone())?;
    tracing::info!(log_path = %log_path.display(), config = ?config_path, "app.start");

    let runtime = LanternRuntime::build("lantern", None)?;
    let handle = runtime.handle();

    let outcome = runtime.block_on(async {
        match cli.command {
            Command::Attach { headless } => {
                let user: Arc<dyn UserConfigSource> = match config_path {
                    Some(path) => Arc::new(FileUserConfig::new(path)),
                    None => Arc::new(cfg.user.clone()),
                };
                let _watcher = handle.cancel_on_ctrl_c();
                wiring::attach(cfg, user, headless, handle.unload_token()).await
            }
            Command::Search { query } => {
                let prompt = wiring::search(&cfg, &query.join(" ")).await?;
                println!("{prompt}");
                Ok(())
            }
        }
    });

    if let Err(e) = &outcome {
        tracing::error!(error = %e, "app.failed");
    }
    runtime.shutdown(Duration::from_secs(2));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_joins_words_and_config_is_global() {
        let cli = Cli::try_parse_from(["lantern", "search", "rust", "news", "--config", "x.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        match cli.command {
            Command::Search { query } => assert_eq!(query.join(" "), "rust news"),
            Command::Attach { .. } => panic!("expected search"),
        }
    }

    #[test]
    fn search_requires_a_query() {
        assert!(Cli::try_parse_from(["lantern", "search"]).is_err());
    }

    #[test]
    fn explicit_config_must_exist() {
        let missing = PathBuf::from("/definitely/not/here/lantern.yaml");
        assert!(load_config(Some(&missing)).is_err());
    }
}
