use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::debug;

mod archive;
mod engine;
mod env;
mod error;
mod networking;
mod release;

use engine::Syncer;
use engine::models::{SyncConfig, SyncOutcome};
use error::SyncError;
use networking::NetworkClient;
use release::RepoId;

#[derive(Parser, Debug)]
#[command(
    name = "ge-proton-sync",
    author,
    version,
    about = "Install the latest GE-Proton release into Steam's compatibility tools folder"
)]
struct Cli {
    /// Owner of the release repository.
    #[arg(long, default_value = release::DEFAULT_OWNER)]
    owner: String,

    /// Name of the release repository.
    #[arg(long, default_value = release::DEFAULT_REPO)]
    repo: String,

    /// Install root; a leading `~/` is expanded to the home directory.
    #[arg(long, default_value = env::DEFAULT_INSTALL_DIR)]
    install_dir: String,

    /// Root URL of the release hosting API.
    #[arg(long, env = "GE_SYNC_API_BASE", default_value = release::DEFAULT_API_BASE)]
    api_base: String,

    /// File suffix identifying the archive among a release's assets.
    #[arg(long, default_value = release::DEFAULT_ARCHIVE_EXTENSION)]
    extension: String,

    /// Print the tool version and exit.
    #[arg(long)]
    version_only: bool,
}

impl Cli {
    fn into_config(self) -> Result<SyncConfig, SyncError> {
        let install_root = env::expand_home(&self.install_dir)?;
        Ok(SyncConfig::new(RepoId::new(self.owner, self.repo), install_root)
            .with_api_base(self.api_base)
            .with_archive_extension(self.extension))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("ge-proton-sync {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let result = run(cli).await;
    match &result {
        Ok(SyncOutcome::AlreadyInstalled { tag }) => {
            println!("The latest version, {tag}, is already installed. Exiting...");
        }
        Ok(SyncOutcome::Installed { tag, asset_name }) => {
            println!("Installed {tag} from {asset_name}.");
        }
        Err(err) => eprintln!("Error ({}): {err}", err.category()),
    }
    exit_code(&result)
}

/// Success and the already-installed short-circuit exit 0; any failure exits 1.
fn exit_code(result: &Result<SyncOutcome, SyncError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run(cli: Cli) -> Result<SyncOutcome, SyncError> {
    let mut syncer = Syncer::new(cli.into_config()?, NetworkClient::new());
    debug!("config: {:?}", syncer.config());
    let result = syncer.run().await;
    debug!("sync: visited {}", syncer.visited().join(" -> "));
    result
}
