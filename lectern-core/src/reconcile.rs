// lectern-core/src/reconcile.rs
// The diffing algorithm: match local artifacts to remote entries, decide
// staleness, and rate-limit the remote calls needed to do so. Sources are
// scanned sequentially, in configuration order, with a fixed inter-request
// delay; parallel scanning would defeat the rate-limit strategy against a
// shared API quota.
use std::collections::HashMap;
use std::time::Duration;

use lectern_common::config::{Config, PLUGIN_DIR_SUFFIX};
use lectern_common::error::{LecternError, Result};
use lectern_common::fingerprint;
use lectern_common::model::version;
use lectern_common::model::{
    CachedPatch, InstalledPlugin, LocalArtifact, PluginUpdateCandidate, ReconcileOutcome,
    RemoteArtifact, Source, SourceList, UpdateCandidate,
};
use lectern_net::filter;
use lectern_net::scanner::RemoteScanner;
use tracing::{debug, warn};

use crate::shell::ProgressSender;
use crate::snapshot::SnapshotStore;
use crate::{descriptions, ignore, inventory};

/// Delay between consecutive remote listing calls.
const INTER_REQUEST_DELAY: Duration = Duration::from_millis(500);
/// Consecutive rate-limited sources tolerated before the pass aborts.
const RATE_LIMIT_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Scan remote sources even when a valid snapshot exists.
    pub force_refresh: bool,
}

/// Tracks consecutive rate-limited sources; trips the abort once the
/// threshold is reached. Successes reset the streak.
#[derive(Debug, Default)]
struct RateLimitGate {
    consecutive: u32,
    tripped: bool,
}

impl RateLimitGate {
    fn record_success(&mut self) {
        self.consecutive = 0;
    }

    fn record_rate_limited(&mut self) {
        self.consecutive += 1;
        if self.consecutive >= RATE_LIMIT_THRESHOLD {
            self.tripped = true;
        }
    }

    fn tripped(&self) -> bool {
        self.tripped
    }
}

pub struct Reconciler<S: RemoteScanner> {
    config: Config,
    scanner: S,
    delay: Duration,
}

impl<S: RemoteScanner> Reconciler<S> {
    pub fn new(config: Config, scanner: S) -> Self {
        Self {
            config,
            scanner,
            delay: INTER_REQUEST_DELAY,
        }
    }

    /// Overrides the inter-request delay. Tests use zero.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn pace(&self, requests_made: &mut u32) {
        if *requests_made > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        *requests_made += 1;
    }

    /// One reconciliation pass: consult the snapshot, scan what it cannot
    /// answer, diff local state against the merged remote map, and check
    /// plugin releases.
    pub async fn run(
        &self,
        sources: &SourceList,
        options: &ReconcileOptions,
        progress: &ProgressSender,
    ) -> Result<ReconcileOutcome> {
        let cache_key = sources.cache_key();
        let store = SnapshotStore::new(&self.config);
        let mut gate = RateLimitGate::default();
        let mut requests_made = 0u32;

        let cached = if options.force_refresh {
            None
        } else {
            store.load_valid(&cache_key)
        };
        let remote_map = match cached {
            Some(map) => map,
            None => {
                let map = self
                    .scan_patch_sources(sources, &mut gate, &mut requests_made, progress)
                    .await;
                if gate.tripped() {
                    // A rate-limit abort never overwrites a previous good
                    // snapshot with a partial one.
                    debug!("Rate-limit abort; leaving any existing snapshot untouched");
                } else if let Err(e) = store.save(&cache_key, &map) {
                    warn!("Failed to persist scan snapshot: {}", e);
                }
                map
            }
        };

        let ignored = ignore::load_ignore_list(&self.config.ignore_file());
        let overrides = descriptions::load_overrides(&self.config.descriptions_file());

        progress.set("Checking installed patches...");
        let local = inventory::scan_patches(&self.config)?;
        let mut patch_updates = Vec::new();
        for (name, artifact) in &local {
            if ignored.contains(name) {
                debug!("'{}' is on the ignore list", name);
                continue;
            }
            // Only artifacts already present locally are update candidates;
            // remote-only names are never proposed here.
            let Some(cached) = remote_map.get(name) else {
                continue;
            };
            match self.patch_staleness(artifact, &cached.patch).await {
                Ok(Some((content, expected_md5))) => {
                    let description = descriptions::resolve(
                        name,
                        &overrides,
                        cached.patch.notes.as_deref(),
                        Some(&content),
                    );
                    patch_updates.push(UpdateCandidate {
                        local: artifact.clone(),
                        remote: cached.patch.clone(),
                        source: cached.repo_config.clone(),
                        repo_content: Some(content),
                        expected_md5,
                        description,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping '{}' this pass: {}", name, e),
            }
        }

        let plugin_updates = if gate.tripped() {
            Vec::new()
        } else {
            self.check_plugin_sources(
                sources,
                &ignored,
                &mut gate,
                &mut requests_made,
                progress,
            )
            .await?
        };

        Ok(ReconcileOutcome {
            patch_updates,
            plugin_updates,
            rate_limit_hit: gate.tripped(),
        })
    }

    /// Scans every configured patch source in order, merging results into a
    /// single name-keyed map. The first source to produce a given name wins;
    /// later duplicates are dropped silently — a stable, order-dependent
    /// policy, not a conflict.
    async fn scan_patch_sources(
        &self,
        sources: &SourceList,
        gate: &mut RateLimitGate,
        requests_made: &mut u32,
        progress: &ProgressSender,
    ) -> HashMap<String, CachedPatch> {
        let mut merged: HashMap<String, CachedPatch> = HashMap::new();
        for source in &sources.patches {
            if gate.tripped() {
                break;
            }
            self.pace(requests_made).await;
            progress.set(format!("Scanning {}...", source.slug()));
            match self.scanner.list_patches(source).await {
                Ok(items) => {
                    gate.record_success();
                    for artifact in items {
                        if merged.contains_key(&artifact.name) {
                            debug!(
                                "'{}' already provided by an earlier source; dropping {}'s copy",
                                artifact.name,
                                source.slug()
                            );
                            continue;
                        }
                        merged.insert(
                            artifact.name.clone(),
                            CachedPatch {
                                patch: artifact,
                                repo_config: source.clone(),
                            },
                        );
                    }
                }
                Err(LecternError::RateLimited(msg)) => {
                    warn!("Rate limited while scanning {}: {}", source.slug(), msg);
                    gate.record_rate_limited();
                }
                Err(e) => {
                    // Transient-remote: this source contributes nothing this
                    // pass; the scan continues.
                    warn!("Scanning {} failed: {}; treating as no files", source.slug(), e);
                }
            }
        }
        merged
    }

    /// Staleness verdict for one local/remote pair. Returns the fetched
    /// content and the fingerprint to verify against at install time, or
    /// `None` when the pair is current.
    async fn patch_staleness(
        &self,
        local: &LocalArtifact,
        remote: &RemoteArtifact,
    ) -> Result<Option<(Vec<u8>, String)>> {
        if let Some(remote_md5) = &remote.md5 {
            if *remote_md5 == local.md5 {
                return Ok(None);
            }
            // Fetch lazily, only once a difference is known.
            debug!("'{}' fingerprint differs; fetching content", local.name);
            let content = self.scanner.fetch_patch_body(remote).await?;
            return Ok(Some((content, remote_md5.clone())));
        }

        // Fingerprint unknown: fall back to byte size, and confirm a
        // mismatch by recomputing before declaring staleness.
        if remote.size == local.size {
            return Ok(None);
        }
        debug!("'{}' size differs; fetching content to confirm", local.name);
        let content = self.scanner.fetch_patch_body(remote).await?;
        let computed = fingerprint::md5_of_bytes(&content);
        if computed == local.md5 {
            return Ok(None);
        }
        Ok(Some((content, computed)))
    }

    async fn check_plugin_sources(
        &self,
        sources: &SourceList,
        ignored: &std::collections::HashSet<String>,
        gate: &mut RateLimitGate,
        requests_made: &mut u32,
        progress: &ProgressSender,
    ) -> Result<Vec<PluginUpdateCandidate>> {
        let installed = inventory::scan_plugins(&self.config, false)?;
        let mut updates = Vec::new();
        for source in &sources.plugins {
            if gate.tripped() {
                break;
            }
            // Only already-installed plugins are update candidates here; a
            // separate install-new flow offers unmatched sources instead.
            let Some(plugin) = match_installed(source, &installed) else {
                debug!("No installed plugin matches {}", source.slug());
                continue;
            };
            if ignored.contains(&plugin.name) {
                debug!("'{}' is on the ignore list", plugin.name);
                continue;
            }
            self.pace(requests_made).await;
            progress.set(format!("Checking releases of {}...", source.slug()));
            match self.scanner.latest_release(source).await {
                Ok(release) => {
                    gate.record_success();
                    let asset = match filter::select_asset(&release, source.asset_match.as_deref())
                    {
                        Ok(Some(asset)) => asset.clone(),
                        Ok(None) => {
                            debug!(
                                "Release {} of {} has no matching asset",
                                release.tag,
                                source.slug()
                            );
                            continue;
                        }
                        Err(e) => {
                            warn!("Bad asset filter on {}: {}", source.slug(), e);
                            continue;
                        }
                    };
                    let remote_version = version::strip_tag_prefix(&release.tag).to_string();
                    if version::is_newer(&remote_version, &plugin.version) {
                        updates.push(PluginUpdateCandidate {
                            plugin: plugin.clone(),
                            source: source.clone(),
                            remote_version,
                            notes: release.notes.clone(),
                            asset,
                        });
                    }
                }
                Err(LecternError::RateLimited(msg)) => {
                    warn!("Rate limited while checking {}: {}", source.slug(), msg);
                    gate.record_rate_limited();
                }
                Err(e) => {
                    warn!("Release check for {} failed: {}", source.slug(), e);
                }
            }
        }
        Ok(updates)
    }
}

/// Matches a configured plugin source to an installed plugin: exact name,
/// repo name with the plugin suffix stripped, case-insensitive name, then
/// the on-disk directory name.
fn match_installed<'a>(
    source: &Source,
    installed: &'a [InstalledPlugin],
) -> Option<&'a InstalledPlugin> {
    let repo = source.repo.as_str();
    if let Some(plugin) = installed.iter().find(|p| p.name == repo) {
        return Some(plugin);
    }
    if let Some(stripped) = repo.strip_suffix(PLUGIN_DIR_SUFFIX) {
        if let Some(plugin) = installed.iter().find(|p| p.name == stripped) {
            return Some(plugin);
        }
    }
    if let Some(plugin) = installed.iter().find(|p| p.name.eq_ignore_ascii_case(repo)) {
        return Some(plugin);
    }
    installed
        .iter()
        .find(|p| p.dir_name == repo || p.dir_name.strip_suffix(PLUGIN_DIR_SUFFIX) == Some(repo))
}
