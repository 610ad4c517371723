//! The reconciliation state machine.
//!
//! One [`Reconciler::run`] call is one end-to-end attempt to match the
//! host's declared package set: validate the declared set, match by hash,
//! get the player's consent, download and verify everything missing, then
//! resolve and commit the new enabled configuration atomically.
//!
//! The whole attempt is a single cooperative async flow. Transfer completion
//! and the confirmation prompt are its only suspension points, and both race
//! the cancellation token so a disconnect can abandon the attempt from any
//! state short of committed, without touching the enabled configuration.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::package::{LocalPackage, PackageKind, ServerPackage};

use super::enabled::EnabledPackages;
use super::error::{ProtocolViolation, SyncError, SyncResult};
use super::extractor::ArchiveExtractor;
use super::matcher::{match_by_hash, missing_of, PackageMatch};
use super::progress::SyncProgress;
use super::queue::DownloadQueue;
use super::transfer::{TransferSession, Transport};
use super::verifier::ArtifactVerifier;

/// Boxed future type for dyn-compatible async collaborators.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// UI collaborator owning the consent gate.
///
/// Presenting the missing-package list and soliciting the decision is the
/// caller's business; no transfer starts until this returns true.
pub trait SyncConfirmer: Send + Sync {
    /// Ask whether the listed packages may be downloaded.
    fn confirm<'a>(&'a self, missing: &'a [ServerPackage]) -> BoxFuture<'a, bool>;
}

/// Confirmer with a fixed answer, for headless clients and tests.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl SyncConfirmer for AutoConfirm {
    fn confirm<'a>(&'a self, _missing: &'a [ServerPackage]) -> BoxFuture<'a, bool> {
        let answer = self.0;
        Box::pin(async move { answer })
    }
}

/// Observable state of a reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// No attempt has started.
    Idle,
    /// Validating the declared set and matching against local packages.
    ComputingMissing,
    /// Waiting for the player to approve the downloads.
    AwaitingConfirmation,
    /// Driving transfers, one at a time.
    Downloading,
    /// Resolving the final enabled set.
    Finalizing,
    /// The new configuration is committed.
    Committed,
    /// The attempt ended without committing.
    Failed(String),
}

/// Summary of a committed attempt.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Name of the enabled core package.
    pub core: String,
    /// Number of enabled regular packages (including client-only ones).
    pub regular_count: usize,
    /// Packages downloaded this attempt.
    pub downloaded_count: usize,
    /// Bytes transferred this attempt.
    pub bytes_downloaded: u64,
}

/// How an attempt ended, short of an error.
///
/// Declining and aborting are normal exits, not failures: the caller
/// disconnects from the host and the enabled configuration is untouched.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The enabled configuration was replaced.
    Committed(SyncReport),
    /// The player declined the downloads.
    Declined,
    /// The attempt was cancelled.
    Aborted,
}

/// Drives one reconciliation attempt against a host's declared package set.
pub struct Reconciler {
    config: SyncConfig,
    transport: Arc<dyn Transport>,
    verifier: ArtifactVerifier,
    confirmer: Arc<dyn SyncConfirmer>,
    enabled: Arc<EnabledPackages>,
    progress: Arc<SyncProgress>,
    cancel: CancellationToken,
    state: SyncState,
}

impl Reconciler {
    /// Create a reconciler over the given collaborators.
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn ArchiveExtractor>,
        confirmer: Arc<dyn SyncConfirmer>,
        enabled: Arc<EnabledPackages>,
    ) -> Self {
        Self {
            config,
            transport,
            verifier: ArtifactVerifier::new(extractor),
            confirmer,
            enabled,
            progress: Arc::new(SyncProgress::new()),
            cancel: CancellationToken::new(),
            state: SyncState::Idle,
        }
    }

    /// Current state of the attempt.
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Shared progress handle for UI polling.
    pub fn progress(&self) -> Arc<SyncProgress> {
        Arc::clone(&self.progress)
    }

    /// Token that aborts the attempt when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one reconciliation attempt.
    ///
    /// `server` is the host's declared set, `local` the client's known
    /// packages (typically a library scan). On success the enabled
    /// configuration has been committed; on any error it is untouched, or
    /// restored from backup if the commit itself failed partway.
    pub async fn run(
        &mut self,
        server: &[ServerPackage],
        local: &[LocalPackage],
    ) -> SyncResult<SyncOutcome> {
        let result = self.drive(server, local).await;
        match &result {
            Ok(SyncOutcome::Committed(report)) => {
                info!(
                    core = %report.core,
                    regular = report.regular_count,
                    downloaded = report.downloaded_count,
                    bytes = report.bytes_downloaded,
                    "enabled package set committed"
                );
            }
            Ok(SyncOutcome::Declined) => {
                warn!("player declined package downloads, leaving server");
                self.state = SyncState::Failed("declined by user".to_string());
            }
            Ok(SyncOutcome::Aborted) => {
                warn!("reconciliation attempt aborted");
                self.state = SyncState::Failed("attempt aborted".to_string());
            }
            Err(e) => {
                warn!(error = %e, "reconciliation attempt failed");
                self.state = SyncState::Failed(e.to_string());
            }
        }
        self.progress.finish();
        result
    }

    async fn drive(
        &mut self,
        server: &[ServerPackage],
        local: &[LocalPackage],
    ) -> SyncResult<SyncOutcome> {
        self.state = SyncState::ComputingMissing;
        validate_declared_set(server)?;

        let matches = match_by_hash(server, local);
        let missing = missing_of(&matches);

        if let Some(base) = &self.config.base_package {
            if let Some(mismatched) = missing.iter().find(|p| &p.name == base) {
                return Err(SyncError::Protocol(ProtocolViolation::MissingBasePackage {
                    name: mismatched.name.clone(),
                    remote: mismatched.hash,
                }));
            }
        }

        info!(
            declared = server.len(),
            missing = missing.len(),
            "reconciling against host package set"
        );

        let mut downloaded: Vec<LocalPackage> = Vec::new();
        if !missing.is_empty() {
            self.state = SyncState::AwaitingConfirmation;
            let confirmed = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(SyncOutcome::Aborted),
                confirmed = self.confirmer.confirm(&missing) => confirmed,
            };
            if !confirmed {
                return Ok(SyncOutcome::Declined);
            }

            self.prepare_staging()?;
            self.state = SyncState::Downloading;
            self.progress.set_total_packages(missing.len());

            let mut queue = DownloadQueue::new();
            queue.enqueue_all(missing);

            while let Some(target) = queue.dequeue_next() {
                debug!(name = %target.name, hash = %target.hash.short(), "requesting transfer");
                let session = TransferSession::begin(
                    self.transport.as_ref(),
                    target.clone(),
                    &self.config.staging_dir,
                )?;
                let transfer_progress = session.progress_handle();
                self.progress
                    .start_package(&target.name, Arc::clone(&transfer_progress));

                let archive = tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(SyncOutcome::Aborted),
                    result = session.await_completion() => result?,
                };

                let package = self.verifier.verify(&target, &archive)?;
                let (received, _) = transfer_progress.get();
                self.progress.finish_package(received);
                debug!(name = %package.name, "package downloaded and verified");
                downloaded.push(package);
            }
        }

        self.state = SyncState::Finalizing;
        let prior = self.enabled.snapshot();
        let (core, regular) = resolve_enabled_set(&matches, &downloaded, &prior.regular)?;

        let report = SyncReport {
            core: core.name.clone(),
            regular_count: regular.len(),
            downloaded_count: downloaded.len(),
            bytes_downloaded: self.progress.bytes_downloaded(),
        };
        self.commit(core, regular)?;
        self.state = SyncState::Committed;

        Ok(SyncOutcome::Committed(report))
    }

    /// Wipe and recreate the staging directory.
    ///
    /// Artifacts from a previous attempt are deleted up front rather than on
    /// exit, so a failed verification stays inspectable until the next join.
    fn prepare_staging(&self) -> SyncResult<()> {
        let dir = &self.config.staging_dir;
        if dir.exists() {
            std::fs::remove_dir_all(dir).map_err(|e| SyncError::StagingDir {
                path: dir.clone(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(dir).map_err(|e| SyncError::StagingDir {
            path: dir.clone(),
            source: e,
        })
    }

    /// Apply the resolved set: back up, then replace core and regular lists
    /// together. A failure after the backup restores it before surfacing.
    fn commit(&self, core: LocalPackage, regular: Vec<LocalPackage>) -> SyncResult<()> {
        self.enabled.back_up().map_err(SyncError::Commit)?;

        let applied = self
            .enabled
            .set_core(core)
            .and_then(|_| self.enabled.set_regular(regular));

        if let Err(e) = applied {
            self.enabled.restore_backup();
            return Err(SyncError::Commit(e));
        }
        Ok(())
    }
}

/// Check the declared set is usable at all: non-empty, exactly one core.
fn validate_declared_set(server: &[ServerPackage]) -> SyncResult<()> {
    if server.is_empty() {
        return Err(SyncError::Protocol(ProtocolViolation::EmptyPackageList));
    }
    let core_count = server.iter().filter(|p| p.kind.is_core()).count();
    match core_count {
        1 => Ok(()),
        0 => Err(SyncError::Protocol(ProtocolViolation::NoCorePackage)),
        n => Err(SyncError::Protocol(ProtocolViolation::MultipleCorePackages(n))),
    }
}

/// Resolve the final enabled set from the match results and this attempt's
/// verified downloads.
///
/// Freshly downloaded artifacts win over pre-existing local matches with the
/// same hash. Regular packages keep the host's declaration order; enabled
/// client-only packages follow, in their prior relative order. A required
/// entry with neither a download nor a local match means the download loop
/// silently dropped it, which is an internal defect rather than a host
/// problem.
pub(crate) fn resolve_enabled_set(
    matches: &[PackageMatch],
    downloaded: &[LocalPackage],
    prior_regular: &[LocalPackage],
) -> SyncResult<(LocalPackage, Vec<LocalPackage>)> {
    let mut core: Option<LocalPackage> = None;
    let mut regular: Vec<LocalPackage> = Vec::new();

    for entry in matches {
        let resolved = downloaded
            .iter()
            .find(|d| d.hash == entry.server.hash)
            .cloned()
            .or_else(|| entry.local.clone());

        match entry.server.kind {
            PackageKind::Core => match resolved {
                Some(package) => core = Some(package),
                None => {
                    return Err(SyncError::UnresolvedPackage {
                        name: entry.server.name.clone(),
                    })
                }
            },
            PackageKind::Regular => match resolved {
                Some(package) => regular.push(package),
                None if !entry.server.required => {
                    debug!(name = %entry.server.name, "skipping unresolved optional package");
                }
                None => {
                    return Err(SyncError::UnresolvedPackage {
                        name: entry.server.name.clone(),
                    })
                }
            },
        }
    }

    let core = core.ok_or(SyncError::Protocol(ProtocolViolation::NoCorePackage))?;

    for package in prior_regular.iter().filter(|p| p.is_client_only()) {
        if !regular.iter().any(|r| r.hash == package.hash) {
            regular.push(package.clone());
        }
    }

    Ok((core, regular))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use semver::Version;
    use tempfile::TempDir;

    use crate::package::{ContentHash, PackageManifest, MANIFEST_FILENAME};
    use crate::sync::extractor::ExtractError;
    use crate::sync::transfer::{PendingTransfer, TransferError, TransferFeed};

    use super::*;

    /// Test extractor: the "archive" is a marker file naming a directory to
    /// copy into the destination.
    struct CopyExtractor;

    impl ArchiveExtractor for CopyExtractor {
        fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), ExtractError> {
            let source = std::fs::read_to_string(archive).map_err(|e| ExtractError::Corrupt {
                path: archive.to_path_buf(),
                reason: e.to_string(),
            })?;
            copy_tree(Path::new(source.trim()), dest_dir).map_err(|e| ExtractError::Failed {
                path: archive.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }

    fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dest)?;
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            let target = dest.join(entry.file_name());
            if entry.path().is_dir() {
                copy_tree(&entry.path(), &target)?;
            } else {
                std::fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    /// Transport serving prepared package directories through marker-file
    /// archives, counting every request it receives.
    #[derive(Default)]
    struct FakeTransport {
        archives: Mutex<HashMap<String, PathBuf>>,
        requests: AtomicUsize,
    }

    impl FakeTransport {
        fn serve(&self, name: &str, package_dir: &Path) {
            self.archives
                .lock()
                .unwrap()
                .insert(name.to_string(), package_dir.to_path_buf());
        }

        fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    impl Transport for FakeTransport {
        fn request(
            &self,
            name: &str,
            _expected: &ContentHash,
            dest_dir: &Path,
        ) -> SyncResult<PendingTransfer> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let (feed, pending) = PendingTransfer::channel();

            match self.archives.lock().unwrap().get(name) {
                Some(package_dir) => {
                    let archive = dest_dir.join(format!("{name}.mspkg"));
                    std::fs::create_dir_all(dest_dir).unwrap();
                    std::fs::write(&archive, package_dir.to_str().unwrap()).unwrap();

                    let size = std::fs::metadata(&archive).unwrap().len();
                    feed.progress().set_total(size);
                    feed.progress().set_received(size);
                    feed.complete(Ok(archive));
                }
                None => {
                    feed.complete(Err(TransferError::Network("no such archive".to_string())));
                }
            }
            Ok(pending)
        }
    }

    /// Transport whose transfers never complete, for cancellation tests.
    #[derive(Default)]
    struct StalledTransport {
        feeds: Mutex<Vec<TransferFeed>>,
    }

    impl Transport for StalledTransport {
        fn request(
            &self,
            _name: &str,
            _expected: &ContentHash,
            _dest_dir: &Path,
        ) -> SyncResult<PendingTransfer> {
            let (feed, pending) = PendingTransfer::channel();
            self.feeds.lock().unwrap().push(feed);
            Ok(pending)
        }
    }

    /// Build a real package directory and return its loaded form.
    fn build_package(
        root: &Path,
        dir_name: &str,
        name: &str,
        kind: PackageKind,
        synced: bool,
    ) -> LocalPackage {
        let dir = root.join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        let manifest = PackageManifest {
            name: name.to_string(),
            version: Version::new(1, 0, 0),
            kind,
            synced,
            workshop_id: None,
            files: vec!["content.xml".to_string()],
        };
        std::fs::write(
            dir.join(MANIFEST_FILENAME),
            serde_json::to_vec_pretty(&manifest).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.join("content.xml"), format!("content of {name}")).unwrap();
        LocalPackage::load(&dir).unwrap()
    }

    fn descriptor(package: &LocalPackage) -> ServerPackage {
        ServerPackage {
            name: package.name.clone(),
            hash: package.hash,
            workshop_id: None,
            kind: package.kind,
            required: true,
        }
    }

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
        transport: Arc<FakeTransport>,
        enabled: Arc<EnabledPackages>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path().to_path_buf();
            Self {
                _temp: temp,
                root,
                transport: Arc::new(FakeTransport::default()),
                enabled: Arc::new(EnabledPackages::in_memory()),
            }
        }

        fn reconciler(&self, confirm: bool) -> Reconciler {
            let config = SyncConfig::default().with_staging_dir(self.root.join("staging"));
            Reconciler::new(
                config,
                Arc::clone(&self.transport) as Arc<dyn Transport>,
                Arc::new(CopyExtractor),
                Arc::new(AutoConfirm(confirm)),
                Arc::clone(&self.enabled),
            )
        }
    }

    #[tokio::test]
    async fn test_empty_declared_set_is_protocol_violation() {
        let fx = Fixture::new();
        let mut reconciler = fx.reconciler(true);

        let err = reconciler.run(&[], &[]).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Protocol(ProtocolViolation::EmptyPackageList)
        ));
        assert_eq!(fx.transport.request_count(), 0);
        assert!(matches!(reconciler.state(), SyncState::Failed(_)));
    }

    #[tokio::test]
    async fn test_multiple_cores_fail_before_any_transfer() {
        let fx = Fixture::new();
        let core_a = build_package(&fx.root, "a", "CoreA", PackageKind::Core, true);
        let core_b = build_package(&fx.root, "b", "CoreB", PackageKind::Core, true);

        let mut reconciler = fx.reconciler(true);
        let err = reconciler
            .run(&[descriptor(&core_a), descriptor(&core_b)], &[])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Protocol(ProtocolViolation::MultipleCorePackages(2))
        ));
        assert_eq!(fx.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_no_core_is_protocol_violation() {
        let fx = Fixture::new();
        let pack = build_package(&fx.root, "p", "Pack", PackageKind::Regular, true);

        let mut reconciler = fx.reconciler(true);
        let err = reconciler
            .run(&[descriptor(&pack)], &[pack.clone()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Protocol(ProtocolViolation::NoCorePackage)
        ));
    }

    #[tokio::test]
    async fn test_fully_matched_set_commits_without_transfers() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);
        let pack = build_package(&fx.root, "pack", "SciFiPack", PackageKind::Regular, true);

        let mut reconciler = fx.reconciler(false); // would decline if asked
        let outcome = reconciler
            .run(
                &[descriptor(&core), descriptor(&pack)],
                &[core.clone(), pack.clone()],
            )
            .await
            .unwrap();

        let report = match outcome {
            SyncOutcome::Committed(report) => report,
            other => panic!("expected commit, got {other:?}"),
        };
        assert_eq!(report.downloaded_count, 0);
        assert_eq!(fx.transport.request_count(), 0);
        assert_eq!(reconciler.state(), &SyncState::Committed);

        let snapshot = fx.enabled.snapshot();
        assert_eq!(snapshot.core.unwrap().hash, core.hash);
        assert_eq!(snapshot.regular.len(), 1);
        assert_eq!(snapshot.regular[0].hash, pack.hash);
    }

    #[tokio::test]
    async fn test_download_missing_and_preserve_client_only_order() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);
        let scifi = build_package(&fx.root, "scifi", "SciFiPack", PackageKind::Regular, true);
        let theme = build_package(&fx.root, "theme", "UITheme", PackageKind::Regular, false);

        // Client-only theme is enabled from a previous session.
        fx.enabled.set_regular(vec![theme.clone()]).unwrap();

        // Host declares base + scifi; client only has base (and the theme).
        fx.transport.serve("SciFiPack", &scifi.dir);

        let mut reconciler = fx.reconciler(true);
        let outcome = reconciler
            .run(
                &[descriptor(&core), descriptor(&scifi)],
                &[core.clone(), theme.clone()],
            )
            .await
            .unwrap();

        let report = match outcome {
            SyncOutcome::Committed(report) => report,
            other => panic!("expected commit, got {other:?}"),
        };
        assert_eq!(report.downloaded_count, 1);
        assert_eq!(fx.transport.request_count(), 1);

        let snapshot = fx.enabled.snapshot();
        assert_eq!(snapshot.core.unwrap().hash, core.hash);
        let hashes: Vec<ContentHash> = snapshot.regular.iter().map(|p| p.hash).collect();
        assert_eq!(hashes, vec![scifi.hash, theme.hash]);
    }

    #[tokio::test]
    async fn test_declined_download_leaves_enabled_set_untouched() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);
        let scifi = build_package(&fx.root, "scifi", "SciFiPack", PackageKind::Regular, true);
        let before = fx.enabled.snapshot();

        let mut reconciler = fx.reconciler(false);
        let outcome = reconciler
            .run(&[descriptor(&core), descriptor(&scifi)], &[core.clone()])
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Declined));
        assert_eq!(fx.transport.request_count(), 0);
        assert_eq!(fx.enabled.snapshot(), before);
        assert_eq!(
            reconciler.state(),
            &SyncState::Failed("declined by user".to_string())
        );
    }

    #[tokio::test]
    async fn test_hash_mismatch_aborts_without_mutating_enabled_set() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);
        let scifi = build_package(&fx.root, "scifi", "SciFiPack", PackageKind::Regular, true);
        fx.enabled.set_core(core.clone()).unwrap();
        let before = fx.enabled.snapshot();

        // The host declares a different build of SciFiPack than the archive
        // the transport actually serves.
        let mut declared = descriptor(&scifi);
        declared.hash = ContentHash::of_bytes(b"the host's build");
        fx.transport.serve("SciFiPack", &scifi.dir);

        let mut reconciler = fx.reconciler(true);
        let err = reconciler
            .run(&[descriptor(&core), declared.clone()], &[core.clone()])
            .await
            .unwrap_err();

        match err {
            SyncError::HashMismatch {
                name,
                expected,
                actual,
            } => {
                assert_eq!(name, "SciFiPack");
                assert_eq!(expected, declared.hash);
                assert_eq!(actual, scifi.hash);
            }
            other => panic!("expected HashMismatch, got {other}"),
        }
        assert_eq!(fx.enabled.snapshot(), before);
    }

    #[tokio::test]
    async fn test_transfer_failure_aborts_attempt() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);
        let scifi = build_package(&fx.root, "scifi", "SciFiPack", PackageKind::Regular, true);
        // Nothing served: the transfer completes with a network error.

        let mut reconciler = fx.reconciler(true);
        let err = reconciler
            .run(&[descriptor(&core), descriptor(&scifi)], &[core.clone()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::TransferFailed {
                source: TransferError::Network(_),
                ..
            }
        ));
        assert!(matches!(reconciler.state(), SyncState::Failed(_)));
    }

    #[tokio::test]
    async fn test_downloaded_core_preferred_over_local_match() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);

        // The core is missing locally and gets downloaded.
        fx.transport.serve("BaseGame", &core.dir);

        let mut reconciler = fx.reconciler(true);
        let staging = fx.root.join("staging");
        let outcome = reconciler.run(&[descriptor(&core)], &[]).await.unwrap();

        assert!(matches!(outcome, SyncOutcome::Committed(_)));
        let enabled_core = fx.enabled.snapshot().core.unwrap();
        assert_eq!(enabled_core.hash, core.hash);
        assert!(
            enabled_core.dir.starts_with(&staging),
            "expected the downloaded artifact, got {}",
            enabled_core.dir.display()
        );
    }

    #[tokio::test]
    async fn test_unresolved_optional_package_is_skipped() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);
        let sub = build_package(&fx.root, "sub", "ReactorSub", PackageKind::Regular, true);

        let optional = ServerPackage {
            required: false,
            ..descriptor(&sub)
        };

        let mut reconciler = fx.reconciler(false);
        let outcome = reconciler
            .run(&[descriptor(&core), optional], &[core.clone()])
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Committed(_)));
        assert_eq!(fx.transport.request_count(), 0);
        assert!(fx.enabled.snapshot().regular.is_empty());
    }

    #[tokio::test]
    async fn test_base_package_mismatch_fails_fast() {
        let fx = Fixture::new();
        let local_base = build_package(&fx.root, "base", "Vanilla", PackageKind::Core, true);

        let mut remote_base = descriptor(&local_base);
        remote_base.hash = ContentHash::of_bytes(b"the host runs another build");

        let config = SyncConfig::default()
            .with_staging_dir(fx.root.join("staging"))
            .with_base_package("Vanilla");
        let mut reconciler = Reconciler::new(
            config,
            Arc::clone(&fx.transport) as Arc<dyn Transport>,
            Arc::new(CopyExtractor),
            Arc::new(AutoConfirm(true)),
            Arc::clone(&fx.enabled),
        );

        let err = reconciler
            .run(&[remote_base], &[local_base.clone()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Protocol(ProtocolViolation::MissingBasePackage { .. })
        ));
        assert_eq!(fx.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_during_transfer_aborts_cleanly() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);
        let scifi = build_package(&fx.root, "scifi", "SciFiPack", PackageKind::Regular, true);
        fx.enabled.set_core(core.clone()).unwrap();
        let before = fx.enabled.snapshot();

        let transport = Arc::new(StalledTransport::default());
        let config = SyncConfig::default().with_staging_dir(fx.root.join("staging"));
        let mut reconciler = Reconciler::new(
            config,
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::new(CopyExtractor),
            Arc::new(AutoConfirm(true)),
            Arc::clone(&fx.enabled),
        );

        let cancel = reconciler.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let outcome = reconciler
            .run(&[descriptor(&core), descriptor(&scifi)], &[core.clone()])
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Aborted));
        assert_eq!(fx.enabled.snapshot(), before);
        assert!(matches!(reconciler.state(), SyncState::Failed(_)));
    }

    #[tokio::test]
    async fn test_resolve_reports_unresolved_required_package() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);
        let scifi = build_package(&fx.root, "scifi", "SciFiPack", PackageKind::Regular, true);

        let matches = match_by_hash(
            &[descriptor(&core), descriptor(&scifi)],
            std::slice::from_ref(&core),
        );

        // The download loop produced nothing for SciFiPack.
        let err = resolve_enabled_set(&matches, &[], &[]).unwrap_err();
        assert!(matches!(
            err,
            SyncError::UnresolvedPackage { name } if name == "SciFiPack"
        ));
    }

    #[tokio::test]
    async fn test_commit_failure_restores_backup() {
        let fx = Fixture::new();
        let core = build_package(&fx.root, "core", "BaseGame", PackageKind::Core, true);

        let store_dir = fx.root.join("config");
        let store_path = store_dir.join("enabled.json");
        std::fs::create_dir_all(&store_dir).unwrap();
        let enabled = Arc::new(EnabledPackages::at_path(&store_path).unwrap());
        enabled.set_core(core.clone()).unwrap();
        let before = enabled.snapshot();

        // Turn the store file into a directory: the backup write still lands
        // (different filename) but the commit's rename onto the store fails.
        std::fs::remove_file(&store_path).unwrap();
        std::fs::create_dir(&store_path).unwrap();

        let replacement = build_package(&fx.root, "newcore", "OtherCore", PackageKind::Core, true);
        let config = SyncConfig::default().with_staging_dir(fx.root.join("staging"));
        let mut reconciler = Reconciler::new(
            config,
            Arc::clone(&fx.transport) as Arc<dyn Transport>,
            Arc::new(CopyExtractor),
            Arc::new(AutoConfirm(false)),
            Arc::clone(&enabled),
        );

        let result = reconciler
            .run(&[descriptor(&replacement)], &[replacement.clone()])
            .await;

        assert!(matches!(result, Err(SyncError::Commit(_))));
        assert_eq!(enabled.snapshot(), before);
        assert!(matches!(reconciler.state(), SyncState::Failed(_)));
    }
}
