use std::fs;

use log::{debug, info, warn};

use crate::archive;
use crate::engine::models::{SyncConfig, SyncOutcome};
use crate::engine::state::SyncStep;
use crate::env;
use crate::error::SyncError;
use crate::networking::NetworkClient;
use crate::release;

pub mod models;
pub mod state;

/// Drives one sync run: resolve the latest release, skip it if the marker is
/// present, otherwise download, extract and remove the archive.
pub struct Syncer {
    config: SyncConfig,
    networking: NetworkClient,
    visited: Vec<&'static str>,
}

impl Syncer {
    pub fn new(config: SyncConfig, networking: NetworkClient) -> Self {
        Self {
            config,
            networking,
            visited: Vec::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Labels of the steps entered during the last run, in order.
    pub fn visited(&self) -> &[&'static str] {
        &self.visited
    }

    /// Run the pipeline to a terminal state. The first failing step ends the
    /// run with its error; nothing is retried or rolled back.
    pub async fn run(&mut self) -> Result<SyncOutcome, SyncError> {
        self.visited.clear();
        let mut step = SyncStep::Start;
        loop {
            debug!("sync: entering {step}");
            self.visited.push(step.label());
            if let SyncStep::Done(outcome) = step {
                return Ok(outcome);
            }
            step = self.advance(step).await?;
        }
    }

    async fn advance(&self, step: SyncStep) -> Result<SyncStep, SyncError> {
        let next = match step {
            SyncStep::Start => {
                env::ensure_install_root(&self.config.install_root)?;
                SyncStep::ResolveLatest
            }
            SyncStep::ResolveLatest => {
                info!("sync: resolving latest release of {}", self.config.repo);
                let resolved = release::fetch_latest(
                    &self.networking,
                    &self.config.api_base,
                    &self.config.repo,
                    &self.config.archive_extension,
                )
                .await?;
                SyncStep::CheckInstalled { release: resolved }
            }
            SyncStep::CheckInstalled { release } => {
                if self.config.is_installed(&release.tag) {
                    info!(
                        "sync: {} already present at {}",
                        release.tag,
                        self.config.marker_path(&release.tag).display()
                    );
                    SyncStep::Done(SyncOutcome::AlreadyInstalled { tag: release.tag })
                } else {
                    SyncStep::Download { release }
                }
            }
            SyncStep::Download { release } => {
                let archive_path = self.config.temp_archive_path(&release.tag);
                info!(
                    "sync: downloading {} to {}",
                    release.download_url,
                    archive_path.display()
                );
                self.networking
                    .download_to_path(&release.download_url, &archive_path)
                    .await?;
                SyncStep::Extract {
                    release,
                    archive_path,
                }
            }
            SyncStep::Extract {
                release,
                archive_path,
            } => {
                archive::extract_tar_gz(&archive_path, &self.config.install_root)?;
                self.record_marker(&release.tag)?;
                SyncStep::Cleanup {
                    release,
                    archive_path,
                }
            }
            SyncStep::Cleanup {
                release,
                archive_path,
            } => {
                info!("sync: removing {}", archive_path.display());
                archive::remove_archive(&archive_path).map_err(|source| SyncError::Cleanup {
                    path: archive_path.clone(),
                    source,
                })?;
                SyncStep::Done(SyncOutcome::Installed {
                    tag: release.tag,
                    asset_name: release.asset_name,
                })
            }
            done @ SyncStep::Done(_) => done,
        };
        Ok(next)
    }

    // The archive normally unpacks into a folder named after the tag; create
    // it when it did not, so the next run still sees the marker.
    fn record_marker(&self, tag: &str) -> Result<(), SyncError> {
        if self.config.is_installed(tag) {
            return Ok(());
        }
        let marker = self.config.marker_path(tag);
        warn!(
            "sync: archive did not produce {}, creating it",
            marker.display()
        );
        fs::create_dir(&marker).map_err(|source| SyncError::MarkerCreate {
            path: marker,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ExtractError;
    use crate::archive::tests::{TestEntry, build_tar_gz};
    use crate::release::RepoId;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LATEST_PATH: &str = "/repos/owner/pkg/releases/latest";

    fn release_body(server: &MockServer, assets: &[&str]) -> String {
        let assets: Vec<String> = assets
            .iter()
            .map(|name| {
                format!(
                    r#"{{"name":"{name}","browser_download_url":"{}/download/{name}"}}"#,
                    server.uri()
                )
            })
            .collect();
        format!(r#"{{"tag_name":"v1.2.3","assets":[{}]}}"#, assets.join(","))
    }

    async fn mount_release(server: &MockServer, assets: &[&str], expected: u64) {
        Mock::given(method("GET"))
            .and(path(LATEST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(release_body(server, assets)))
            .expect(expected)
            .mount(server)
            .await;
    }

    async fn mount_archive(server: &MockServer, name: &str, body: Vec<u8>, expected: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/download/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(expected)
            .mount(server)
            .await;
    }

    fn syncer(server: &MockServer, root: &Path) -> Syncer {
        let config = SyncConfig::new(RepoId::new("owner", "pkg"), root).with_api_base(server.uri());
        Syncer::new(config, NetworkClient::new())
    }

    fn bin_run_archive() -> Vec<u8> {
        build_tar_gz(&[TestEntry::Dir("bin/"), TestEntry::File("bin/run", b"ok")])
    }

    #[tokio::test]
    async fn installs_latest_release_end_to_end() {
        let server = MockServer::start().await;
        mount_release(&server, &["readme.txt", "pkg-v1.2.3.tar.gz"], 1).await;
        mount_archive(&server, "readme.txt", Vec::new(), 0).await;
        mount_archive(&server, "pkg-v1.2.3.tar.gz", bin_run_archive(), 1).await;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("compatibilitytools.d");
        let mut syncer = syncer(&server, &root);

        let outcome = syncer.run().await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Installed {
                tag: "v1.2.3".into(),
                asset_name: "pkg-v1.2.3.tar.gz".into(),
            }
        );
        assert!(root.join("v1.2.3").is_dir());
        assert_eq!(fs::read(root.join("bin/run")).unwrap(), b"ok");
        assert!(!syncer.config().temp_archive_path("v1.2.3").exists());
        assert_eq!(
            syncer.visited(),
            [
                "start",
                "resolve_latest",
                "check_installed",
                "download",
                "extract",
                "cleanup",
                "done"
            ]
        );
    }

    #[tokio::test]
    async fn second_run_skips_download() {
        let server = MockServer::start().await;
        mount_release(&server, &["pkg-v1.2.3.tar.gz"], 2).await;
        mount_archive(&server, "pkg-v1.2.3.tar.gz", bin_run_archive(), 1).await;

        let tmp = tempfile::tempdir().unwrap();
        let mut syncer = syncer(&server, tmp.path());

        let first = syncer.run().await.unwrap();
        assert!(matches!(first, SyncOutcome::Installed { .. }));

        let second = syncer.run().await.unwrap();
        assert_eq!(
            second,
            SyncOutcome::AlreadyInstalled {
                tag: "v1.2.3".into()
            }
        );
        assert_eq!(
            syncer.visited(),
            [
                "start",
                "resolve_latest",
                "check_installed",
                "done_already_present"
            ]
        );
    }

    #[tokio::test]
    async fn existing_marker_short_circuits() {
        let server = MockServer::start().await;
        mount_release(&server, &["pkg-v1.2.3.tar.gz"], 1).await;
        mount_archive(&server, "pkg-v1.2.3.tar.gz", bin_run_archive(), 0).await;

        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("v1.2.3")).unwrap();

        let outcome = syncer(&server, tmp.path()).run().await.unwrap();
        assert!(matches!(outcome, SyncOutcome::AlreadyInstalled { .. }));
        assert!(!tmp.path().join("bin").exists());
    }

    #[tokio::test]
    async fn marker_from_archive_is_kept() {
        let server = MockServer::start().await;
        mount_release(&server, &["pkg-v1.2.3.tar.gz"], 1).await;
        let body = build_tar_gz(&[
            TestEntry::Dir("v1.2.3/"),
            TestEntry::File("v1.2.3/version", b"v1.2.3"),
        ]);
        mount_archive(&server, "pkg-v1.2.3.tar.gz", body, 1).await;

        let tmp = tempfile::tempdir().unwrap();
        syncer(&server, tmp.path()).run().await.unwrap();

        assert_eq!(fs::read(tmp.path().join("v1.2.3/version")).unwrap(), b"v1.2.3");
    }

    #[tokio::test]
    async fn no_matching_asset_downloads_nothing() {
        let server = MockServer::start().await;
        mount_release(&server, &["readme.txt", "pkg.zip"], 1).await;
        mount_archive(&server, "readme.txt", Vec::new(), 0).await;
        mount_archive(&server, "pkg.zip", Vec::new(), 0).await;

        let tmp = tempfile::tempdir().unwrap();
        let mut syncer = syncer(&server, tmp.path());
        let err = syncer.run().await.unwrap_err();

        assert!(matches!(err, SyncError::NoMatchingAsset { .. }));
        assert_eq!(syncer.visited(), ["start", "resolve_latest"]);
        assert!(!tmp.path().join("v1.2.3").exists());
    }

    #[tokio::test]
    async fn corrupt_archive_aborts_and_leaves_download() {
        let server = MockServer::start().await;
        mount_release(&server, &["pkg-v1.2.3.tar.gz"], 1).await;
        mount_archive(&server, "pkg-v1.2.3.tar.gz", b"garbage".to_vec(), 1).await;

        let tmp = tempfile::tempdir().unwrap();
        let mut syncer = syncer(&server, tmp.path());
        let err = syncer.run().await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::Extract(ExtractError::Decompress { .. })
        ));
        assert_eq!(err.category(), "extraction");
        assert!(syncer.config().temp_archive_path("v1.2.3").exists());
        assert!(!tmp.path().join("v1.2.3").exists());
    }

    #[tokio::test]
    async fn uncreatable_root_fails_before_network() {
        let server = MockServer::start().await;
        mount_release(&server, &["pkg-v1.2.3.tar.gz"], 0).await;

        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let err = syncer(&server, &blocker.join("root")).run().await.unwrap_err();
        assert!(matches!(err, SyncError::InstallDir { .. }));
    }
}
