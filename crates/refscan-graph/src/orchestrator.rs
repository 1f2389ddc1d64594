use refscan_core::{
    DiagnosticSink, Instantiated, NoDiagnostics, NoProgress, ObjectId, ProgressSink, ProjectHost,
    RefScanError, Result, ScanSettings, TraversalOrder,
};
use tracing::{debug, error, info, warn};

use crate::walker::{GraphWalker, NodeChecks, Traversal, WalkRoot, WalkerOptions};
use crate::{CancelToken, ErrorAggregator};

/// Context label used for records found by the flat asset pass.
pub const PROJECT_CONTEXT: &str = "Project";

/// Merged result of a scan across one or more roots.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub errors: ErrorAggregator,
    pub cancelled: bool,
    /// Roots that could not be opened or loaded.
    pub skipped_roots: Vec<String>,
}

impl ScanOutcome {
    pub fn merge(&mut self, other: ScanOutcome) {
        self.errors.merge(other.errors);
        self.cancelled |= other.cancelled;
        self.skipped_roots.extend(other.skipped_roots);
    }

    pub fn summary(&self) -> String {
        let count = self.errors.len();
        if self.cancelled {
            format!(
                "Process cancelled.\n{} missing references were found.",
                count
            )
        } else {
            format!(
                "Finished finding missing references.\n{} missing references were found.",
                count
            )
        }
    }
}

/// Owns a scan-local template instance and hands it back to the host on drop.
pub struct TransientInstance<'h, H: ProjectHost> {
    host: &'h H,
    instance: Option<Instantiated<H::Graph>>,
}

impl<'h, H: ProjectHost> TransientInstance<'h, H> {
    pub fn acquire(host: &'h H, path: &str) -> Result<Self> {
        let instance = host.instantiate_template(path)?;
        Ok(Self {
            host,
            instance: Some(instance),
        })
    }

    fn inner(&self) -> &Instantiated<H::Graph> {
        // Only taken in Drop.
        self.instance
            .as_ref()
            .unwrap_or_else(|| unreachable!("instance released before drop"))
    }

    pub fn graph(&self) -> &H::Graph {
        &self.inner().graph
    }

    pub fn root(&self) -> ObjectId {
        self.inner().root
    }

    pub fn source(&self) -> &str {
        &self.inner().source
    }
}

impl<H: ProjectHost> Drop for TransientInstance<'_, H> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            debug!("Releasing transient instance of {}", instance.source);
            self.host.release_instance(instance);
        }
    }
}

/// Paths outside the project (absolute on any platform) are not scanned.
pub fn is_project_asset(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    let bytes = path.as_bytes();
    !(bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\'))
}

/// Enumerates roots from the host and drives walker passes over them.
pub struct ScanOrchestrator<'h, H: ProjectHost> {
    host: &'h H,
    settings: ScanSettings,
    progress: Box<dyn ProgressSink + 'h>,
    diagnostics: Box<dyn DiagnosticSink + 'h>,
    cancel: CancelToken,
}

impl<'h, H: ProjectHost> ScanOrchestrator<'h, H> {
    pub fn new(host: &'h H, settings: ScanSettings) -> Self {
        Self {
            host,
            settings,
            progress: Box::new(NoProgress),
            diagnostics: Box::new(NoDiagnostics),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: impl ProgressSink + 'h) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: impl DiagnosticSink + 'h) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn walker_options(
        &self,
        checks: NodeChecks,
        recurse: bool,
        order: TraversalOrder,
    ) -> WalkerOptions {
        WalkerOptions::default()
            .with_order(order)
            .with_checks(checks)
            .with_recurse(recurse)
            .with_missing_template_marker(self.settings.missing_template_marker.clone())
    }

    /// Forwards freshly captured records to the diagnostic channel.
    fn publish(&mut self, traversal: &Traversal) {
        if self.settings.batch_mode {
            return;
        }
        for record in traversal.errors.records() {
            self.diagnostics.emit(&record.message());
        }
    }

    pub fn scan_active_scene(&mut self) -> Result<ScanOutcome> {
        let path = self
            .host
            .active_scene()
            .ok_or_else(|| RefScanError::InvalidOperation("no active scene".to_string()))?;
        self.scan_scene(&path)
    }

    pub fn scan_scene(&mut self, path: &str) -> Result<ScanOutcome> {
        self.scan_scenes(&[path.to_string()], None, 0.0)
            .map(|(outcome, _)| outcome)
    }

    /// Enabled build scenes, equally weighted.
    pub fn scan_build_scenes(&mut self) -> Result<ScanOutcome> {
        let scenes: Vec<String> = self
            .host
            .build_scenes()
            .into_iter()
            .filter(|scene| scene.enabled)
            .map(|scene| scene.path)
            .collect();
        info!("Scanning {} build scenes", scenes.len());
        self.scan_scenes(&scenes, None, 0.0)
            .map(|(outcome, _)| outcome)
    }

    /// Scans each scene as a forest. `weights` defaults to `1/len` per scene.
    ///
    /// Returns the outcome and the progress reached after the last root.
    pub fn scan_scenes(
        &mut self,
        paths: &[String],
        weights: Option<&[f32]>,
        start: f32,
    ) -> Result<(ScanOutcome, f32)> {
        if let Some(weights) = weights {
            if weights.len() != paths.len() {
                return Err(RefScanError::InvalidOperation(format!(
                    "{} weights supplied for {} roots",
                    weights.len(),
                    paths.len()
                )));
            }
        }

        let options =
            self.walker_options(NodeChecks::references_only(), true, self.settings.traversal);
        let equal = if paths.is_empty() {
            0.0
        } else {
            1.0 / paths.len() as f32
        };

        let host = self.host;
        let mut outcome = ScanOutcome::default();
        let mut offset = start;
        for (i, path) in paths.iter().enumerate() {
            let weight = weights.map(|w| w[i]).unwrap_or(equal);
            if self.cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let scene = match host.open_scene(path) {
                Ok(scene) => scene,
                Err(e) => {
                    error!(
                        "{}. This scene was added to the build, and it's possible that it has been deleted",
                        e
                    );
                    outcome.skipped_roots.push(path.clone());
                    offset += weight;
                    continue;
                }
            };

            let root = WalkRoot::forest(scene.path.clone(), scene.roots.clone())
                .with_progress(offset, weight);
            let traversal = GraphWalker::new(scene.graph, &options).traverse(
                &root,
                self.progress.as_mut(),
                &self.cancel,
            )?;
            debug!(
                "Scene {}: {} nodes, {} records",
                scene.path,
                traversal.nodes_visited,
                traversal.errors.len()
            );
            self.publish(&traversal);
            outcome.cancelled = traversal.cancelled;
            outcome.errors.merge(traversal.errors);
            offset += weight;
            if outcome.cancelled {
                break;
            }
        }

        Ok((outcome, offset))
    }

    /// One template asset tree, walked depth-first for missing components and
    /// references. Nested instances are inspected like any other node.
    pub fn scan_template(&mut self, path: &str) -> Result<ScanOutcome> {
        let host = self.host;
        let mut outcome = ScanOutcome::default();
        let asset = match host.load_asset(path)? {
            Some(asset) => asset,
            None => {
                return Err(RefScanError::AssetLoad {
                    path: path.to_string(),
                    reason: "asset has no node tree".to_string(),
                })
            }
        };

        let options =
            self.walker_options(NodeChecks::references_only(), true, TraversalOrder::DepthFirst);
        let traversal = GraphWalker::new(asset.graph, &options).traverse(
            &WalkRoot::tree(asset.path.clone(), asset.root),
            self.progress.as_mut(),
            &self.cancel,
        )?;
        self.publish(&traversal);
        outcome.cancelled = traversal.cancelled;
        outcome.errors = traversal.errors;
        Ok(outcome)
    }

    pub fn scan_assets(&mut self) -> Result<ScanOutcome> {
        self.scan_assets_weighted(0.0, 1.0)
    }

    /// Root node of every project asset, under the `Project` context.
    pub fn scan_assets_weighted(&mut self, start: f32, weight: f32) -> Result<ScanOutcome> {
        let paths: Vec<String> = self
            .host
            .asset_paths()
            .into_iter()
            .filter(|p| is_project_asset(p))
            .collect();
        info!("Scanning {} project assets", paths.len());

        let options =
            self.walker_options(NodeChecks::references_only(), false, self.settings.traversal);
        let per_asset = if paths.is_empty() {
            0.0
        } else {
            weight / paths.len() as f32
        };

        let host = self.host;
        let mut outcome = ScanOutcome::default();
        for (i, path) in paths.iter().enumerate() {
            let asset = match host.load_asset(path) {
                Ok(Some(asset)) => asset,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping asset {}: {}", path, e);
                    outcome.skipped_roots.push(path.clone());
                    continue;
                }
            };

            if self.cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            let fraction = start + (i as f32 / paths.len() as f32) * weight;
            self.progress
                .report("Searching missing references in assets.", path, fraction);

            let root =
                WalkRoot::tree(PROJECT_CONTEXT, asset.root).with_progress(fraction, per_asset);
            let traversal = GraphWalker::new(asset.graph, &options).traverse(
                &root,
                self.progress.as_mut(),
                &self.cancel,
            )?;
            self.publish(&traversal);
            outcome.cancelled = traversal.cancelled;
            outcome.errors.merge(traversal.errors);
            if outcome.cancelled {
                break;
            }
        }

        Ok(outcome)
    }

    /// Every build scene, then every asset, each share `1/(scenes + 1)`.
    pub fn scan_everywhere(&mut self) -> Result<ScanOutcome> {
        let scenes: Vec<String> = self
            .host
            .build_scenes()
            .into_iter()
            .map(|scene| scene.path)
            .collect();
        let weight = 1.0 / (scenes.len() + 1) as f32;
        let weights = vec![weight; scenes.len()];

        let (mut outcome, offset) = self.scan_scenes(&scenes, Some(&weights), 0.0)?;
        if !outcome.cancelled {
            let assets = self.scan_assets_weighted(offset, weight)?;
            outcome.merge(assets);
        }
        Ok(outcome)
    }

    /// Instantiates every template asset and reports broken template links inside it.
    pub fn scan_missing_templates(&mut self) -> Result<ScanOutcome> {
        let extension = self.settings.template_extension.clone();
        let templates: Vec<String> = self
            .host
            .asset_paths()
            .into_iter()
            .filter(|p| p.contains(extension.as_str()))
            .collect();
        info!("Checking {} templates for missing links", templates.len());

        let options =
            self.walker_options(NodeChecks::templates_only(), true, TraversalOrder::DepthFirst);
        let share = if templates.is_empty() {
            0.0
        } else {
            1.0 / templates.len() as f32
        };

        let mut outcome = ScanOutcome::default();
        for (count, path) in templates.iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let instance = match TransientInstance::acquire(self.host, path) {
                Ok(instance) => instance,
                Err(e) => {
                    error!("Template {} could not be instantiated: {}", path, e);
                    outcome.skipped_roots.push(path.clone());
                    continue;
                }
            };
            self.progress
                .report("Processing...", path, count as f32 * share);

            let root = WalkRoot::tree(instance.source().to_string(), instance.root())
                .with_progress(count as f32 * share, share);
            let traversal = GraphWalker::new(instance.graph(), &options).traverse(
                &root,
                self.progress.as_mut(),
                &self.cancel,
            )?;
            drop(instance);

            self.publish(&traversal);
            outcome.cancelled = traversal.cancelled;
            outcome.errors.merge(traversal.errors);
            if outcome.cancelled {
                break;
            }
        }

        Ok(outcome)
    }

    /// Missing templates followed by the flat asset pass.
    pub fn scan_all(&mut self) -> Result<ScanOutcome> {
        let mut outcome = self.scan_missing_templates()?;
        if !outcome.cancelled {
            let assets = self.scan_assets()?;
            outcome.merge(assets);
        }
        Ok(outcome)
    }
}
