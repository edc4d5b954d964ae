//! Typed experiment configuration
//!
//! These types are the output of validation. They are only ever produced by
//! [`super::validate_document`] (or by deserializing a previously validated
//! dump) and are never mutated afterwards.

use super::registry::{OptimizerKind, SchedulerKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Free-form constructor parameters handed to the external framework
pub type Params = BTreeMap<String, serde_json::Value>;

/// Complete, resolved experiment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Rich console output in the training framework
    #[serde(default = "default_true")]
    pub use_rich_text: bool,

    /// Model graph with attached losses, metrics and visualizers
    pub model: ModelSpec,

    /// Dataset selection
    pub dataset: DatasetSpec,

    /// Experiment tracking backends
    #[serde(default)]
    pub tracker: TrackerSpec,

    /// Run hyperparameters
    pub trainer: TrainerSpec,

    /// Model export settings
    #[serde(default)]
    pub exporter: ExportSpec,
}

impl ExperimentConfig {
    /// Human-readable multi-line summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let model = &self.model;
        let trainer = &self.trainer;

        let _ = writeln!(out, "Experiment: {}", model.name);
        let _ = writeln!(out, "  Dataset: {}", self.dataset.name);
        let _ = writeln!(out, "  Nodes:");
        for node in &model.nodes {
            let mut line = format!("    - {}", node.effective_name());
            if node.alias.is_some() {
                let _ = write!(line, " ({})", node.name);
            }
            if let Some(variant) = &node.variant {
                let _ = write!(line, " variant={variant}");
            }
            if !node.inputs.is_empty() {
                let _ = write!(line, " <- [{}]", node.inputs.join(", "));
            }
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out, "  Outputs: [{}]", model.outputs.join(", "));
        for loss in &model.losses {
            let _ = writeln!(
                out,
                "  Loss: {} on {} (weight={})",
                loss.effective_name(),
                loss.attached_to,
                loss.weight
            );
        }
        for metric in &model.metrics {
            let main = if metric.is_main_metric { " [main]" } else { "" };
            let _ = writeln!(
                out,
                "  Metric: {} on {}{main}",
                metric.effective_name(),
                metric.attached_to
            );
        }
        for visualizer in &model.visualizers {
            let _ = writeln!(
                out,
                "  Visualizer: {} on {}",
                visualizer.effective_name(),
                visualizer.attached_to
            );
        }
        let [height, width] = trainer.preprocessing.train_image_size;
        let _ = writeln!(
            out,
            "  Trainer: batch_size={} epochs={} num_workers={} validation_interval={}",
            trainer.batch_size, trainer.epochs, trainer.num_workers, trainer.validation_interval
        );
        let _ = writeln!(out, "  Image size: {height}x{width}");
        let _ = writeln!(
            out,
            "  Optimizer: {} {}",
            trainer.optimizer.name,
            render_params(&trainer.optimizer.params)
        );
        let _ = writeln!(
            out,
            "  Scheduler: {} {}",
            trainer.scheduler.name,
            render_params(&trainer.scheduler.params)
        );
        let callbacks: Vec<&str> = trainer
            .active_callbacks()
            .map(|c| c.name.as_str())
            .collect();
        let _ = writeln!(out, "  Callbacks: [{}]", callbacks.join(", "));
        let _ = writeln!(
            out,
            "  Tracking: {} -> {}",
            self.tracker.backends().join(", "),
            self.tracker.save_directory
        );
        let _ = writeln!(
            out,
            "  Export: {} ({}) -> {}",
            self.exporter.export_model_name,
            self.exporter.data_type,
            self.exporter.export_save_directory
        );
        out
    }
}

fn render_params(params: &Params) -> String {
    let parts: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", parts.join(", "))
}

// ============================================================================
// MODEL
// ============================================================================

/// Model graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Experiment identifier
    pub name: String,

    /// Pretrained weights to load before training
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<PathBuf>,

    /// Building blocks in declaration order
    pub nodes: Vec<NodeSpec>,

    #[serde(default)]
    pub losses: Vec<LossSpec>,

    #[serde(default)]
    pub metrics: Vec<MetricSpec>,

    #[serde(default)]
    pub visualizers: Vec<VisualizerSpec>,

    /// Output nodes; inferred from the graph when not written explicitly
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl ModelSpec {
    /// The designated main metric
    pub fn main_metric(&self) -> Option<&MetricSpec> {
        self.metrics.iter().find(|m| m.is_main_metric)
    }

    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.effective_name() == name)
    }

    /// Losses attached to the given node
    pub fn losses_for<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a LossSpec> + 'a {
        self.losses.iter().filter(move |l| l.attached_to == node)
    }

    /// Nodes that are not an input of any other node, in declaration order
    pub fn infer_outputs(nodes: &[NodeSpec]) -> Vec<String> {
        let consumed: BTreeSet<&str> = nodes
            .iter()
            .flat_map(|n| n.inputs.iter().map(String::as_str))
            .collect();
        nodes
            .iter()
            .map(NodeSpec::effective_name)
            .filter(|name| !consumed.contains(name))
            .map(str::to_string)
            .collect()
    }
}

/// One graph building block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Component identifier (registry key)
    pub name: String,

    /// Unique name used for references when the same component appears twice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Sub-configuration selector, e.g. ResNet depth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    /// Upstream nodes feeding this one
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Loader outputs feeding this node directly
    #[serde(default)]
    pub loader_inputs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_weights: Option<bool>,

    #[serde(default)]
    pub freezing: FreezingSpec,

    #[serde(default)]
    pub params: Params,
}

impl NodeSpec {
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Parameters for the component constructor, including `variant` and
    /// `download_weights`
    pub fn construction_params(&self) -> Params {
        let mut params = self.params.clone();
        if let Some(variant) = &self.variant {
            params.insert("variant".into(), variant.clone().into());
        }
        if let Some(download) = self.download_weights {
            params.insert("download_weights".into(), download.into());
        }
        params
    }
}

/// Node freezing schedule
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FreezingSpec {
    #[serde(default)]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfreeze_after: Option<UnfreezeAfter>,
}

/// When a frozen node becomes trainable again
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnfreezeAfter {
    /// Absolute epoch
    Epoch(u64),
    /// Fraction of the total epoch count, in `[0, 1]`
    Fraction(f64),
}

impl FreezingSpec {
    /// Epoch at which the node is unfrozen, `None` when freezing is inactive
    pub fn unfreeze_epoch(&self, epochs: usize) -> Option<usize> {
        if !self.active {
            return None;
        }
        Some(match self.unfreeze_after {
            None => epochs,
            Some(UnfreezeAfter::Epoch(epoch)) => usize::try_from(epoch).unwrap_or(usize::MAX),
            Some(UnfreezeAfter::Fraction(fraction)) => (fraction * epochs as f64).floor() as usize,
        })
    }
}

/// Loss bound to one node output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub attached_to: String,

    /// Contribution to the total loss
    #[serde(default = "default_loss_weight")]
    pub weight: f64,

    #[serde(default)]
    pub params: Params,
}

impl LossSpec {
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Evaluation metric bound to one node output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub attached_to: String,

    /// Metric used for model selection
    #[serde(default)]
    pub is_main_metric: bool,

    #[serde(default)]
    pub params: Params,
}

impl MetricSpec {
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Debug renderer bound to one node output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizerSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    pub attached_to: String,

    #[serde(default)]
    pub params: Params,
}

impl VisualizerSpec {
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

// ============================================================================
// DATASET
// ============================================================================

/// Dataset selection, resolved by the external dataset registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Registry key
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,

    #[serde(default)]
    pub bucket_type: BucketType,

    #[serde(default)]
    pub bucket_storage: BucketStorage,

    #[serde(default = "default_train_view")]
    pub train_view: String,

    #[serde(default = "default_val_view")]
    pub val_view: String,

    #[serde(default = "default_test_view")]
    pub test_view: String,

    #[serde(default)]
    pub json_mode: bool,

    /// Load through the dataset registry rather than a custom loader
    #[serde(default = "default_true")]
    pub use_ldf: bool,

    /// Extra arguments for custom loaders
    #[serde(default)]
    pub custom_dataset_params: Params,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_train_loader: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_val_loader: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_test_loader: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketType {
    #[default]
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketStorage {
    #[default]
    Local,
    S3,
    Gcs,
    Azure,
}

// ============================================================================
// TRAINER
// ============================================================================

/// Run hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSpec {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Validate every N epochs
    #[serde(default = "default_validation_interval")]
    pub validation_interval: usize,

    #[serde(default = "default_num_log_images")]
    pub num_log_images: usize,

    #[serde(default = "default_accumulate_grad_batches")]
    pub accumulate_grad_batches: usize,

    /// Number of best checkpoints kept
    #[serde(default = "default_save_top_k")]
    pub save_top_k: usize,

    #[serde(default)]
    pub accelerator: Accelerator,

    #[serde(default)]
    pub devices: Devices,

    #[serde(default)]
    pub strategy: Strategy,

    /// Validation batches run before training, `-1` for all
    #[serde(default = "default_num_sanity_val_steps")]
    pub num_sanity_val_steps: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiler: Option<Profiler>,

    #[serde(default = "default_true")]
    pub verbose: bool,

    #[serde(default)]
    pub use_weighted_sampler: bool,

    /// Compute metrics on the train split every N epochs, `-1` to never
    #[serde(default = "default_train_metrics_interval")]
    pub train_metrics_interval: i64,

    #[serde(default = "default_true")]
    pub skip_last_batch: bool,

    /// Log every loss term separately
    #[serde(default = "default_true")]
    pub log_sub_losses: bool,

    #[serde(default)]
    pub preprocessing: PreprocessingSpec,

    #[serde(default)]
    pub callbacks: Vec<CallbackSpec>,

    #[serde(default)]
    pub optimizer: OptimizerSpec,

    #[serde(default)]
    pub scheduler: SchedulerSpec,
}

impl TrainerSpec {
    /// Callbacks the framework should instantiate
    pub fn active_callbacks(&self) -> impl Iterator<Item = &CallbackSpec> {
        self.callbacks.iter().filter(|c| c.active)
    }

    /// Whether train-split metrics are computed after the 0-based `epoch`
    pub fn is_train_eval_epoch(&self, epoch: usize) -> bool {
        match usize::try_from(self.train_metrics_interval) {
            Ok(interval) if interval > 0 => (epoch + 1) % interval == 0,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    #[default]
    Auto,
    Cpu,
    Gpu,
}

/// Devices used by the accelerator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Devices {
    /// Number of devices, `-1` for all
    Count(i64),
    /// Explicit device indices
    Indices(Vec<usize>),
    /// Named selection such as `auto`
    Named(String),
}

impl Default for Devices {
    fn default() -> Self {
        Devices::Named("auto".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Auto,
    Ddp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profiler {
    Simple,
    Advanced,
}

/// Input transform pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingSpec {
    /// `[height, width]`
    #[serde(default = "default_train_image_size")]
    pub train_image_size: [usize; 2],

    #[serde(default = "default_true")]
    pub keep_aspect_ratio: bool,

    #[serde(default = "default_true")]
    pub train_rgb: bool,

    #[serde(default)]
    pub normalize: NormalizeSpec,

    #[serde(default)]
    pub augmentations: Vec<AugmentationSpec>,
}

impl Default for PreprocessingSpec {
    fn default() -> Self {
        Self {
            train_image_size: default_train_image_size(),
            keep_aspect_ratio: true,
            train_rgb: true,
            normalize: NormalizeSpec::default(),
            augmentations: Vec::new(),
        }
    }
}

impl PreprocessingSpec {
    pub fn height(&self) -> usize {
        self.train_image_size[0]
    }

    pub fn width(&self) -> usize {
        self.train_image_size[1]
    }

    /// Augmentations in application order, with `Normalize` last when active
    pub fn augmentation_pipeline(&self) -> Vec<AugmentationSpec> {
        let mut pipeline = self.augmentations.clone();
        if self.normalize.active {
            pipeline.push(AugmentationSpec {
                name: "Normalize".to_string(),
                params: self.normalize.params.clone(),
            });
        }
        pipeline
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeSpec {
    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default = "default_normalize_params")]
    pub params: Params,
}

impl Default for NormalizeSpec {
    fn default() -> Self {
        Self {
            active: true,
            params: default_normalize_params(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationSpec {
    pub name: String,

    #[serde(default)]
    pub params: Params,
}

/// Lifecycle hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackSpec {
    pub name: String,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizerSpec {
    #[serde(default)]
    pub name: OptimizerKind,

    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchedulerSpec {
    #[serde(default)]
    pub name: SchedulerKind,

    #[serde(default)]
    pub params: Params,
}

// ============================================================================
// TRACKER
// ============================================================================

/// Experiment tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    #[serde(default = "default_save_directory")]
    pub save_directory: String,

    #[serde(default = "default_true")]
    pub is_tensorboard: bool,

    #[serde(default)]
    pub is_wandb: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wandb_entity: Option<String>,

    #[serde(default)]
    pub is_mlflow: bool,
}

impl Default for TrackerSpec {
    fn default() -> Self {
        Self {
            project_name: None,
            project_id: None,
            run_name: None,
            run_id: None,
            save_directory: default_save_directory(),
            is_tensorboard: true,
            is_wandb: false,
            wandb_entity: None,
            is_mlflow: false,
        }
    }
}

impl TrackerSpec {
    /// Enabled tracking backends
    pub fn backends(&self) -> Vec<&'static str> {
        [
            (self.is_tensorboard, "tensorboard"),
            (self.is_wandb, "wandb"),
            (self.is_mlflow, "mlflow"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

// ============================================================================
// EXPORTER
// ============================================================================

/// Model export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSpec {
    #[serde(default = "default_export_save_directory")]
    pub export_save_directory: String,

    /// Input shape override, `[batch, channels, height, width]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Vec<usize>>,

    #[serde(default = "default_export_model_name")]
    pub export_model_name: String,

    #[serde(default)]
    pub data_type: DataType,

    #[serde(default = "default_true")]
    pub reverse_input_channels: bool,

    /// Per-channel scale; a single number is repeated for all three channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_values: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_values: Option<Vec<f64>>,

    /// Names of the exported graph outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_names: Option<Vec<String>>,

    #[serde(default)]
    pub onnx: OnnxSpec,

    #[serde(default)]
    pub blobconverter: BlobconverterSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
}

impl Default for ExportSpec {
    fn default() -> Self {
        Self {
            export_save_directory: default_export_save_directory(),
            input_shape: None,
            export_model_name: default_export_model_name(),
            data_type: DataType::default(),
            reverse_input_channels: true,
            scale_values: None,
            mean_values: None,
            output_names: None,
            onnx: OnnxSpec::default(),
            blobconverter: BlobconverterSpec::default(),
            upload_url: None,
        }
    }
}

impl ExportSpec {
    /// Names for the exported outputs
    ///
    /// The configured names are used only when there is one per output;
    /// otherwise the generated `defaults` are returned.
    pub fn resolved_output_names(&self, defaults: Vec<String>) -> Vec<String> {
        match &self.output_names {
            Some(names) if names.len() == defaults.len() => names.clone(),
            Some(names) => {
                tracing::warn!(
                    provided = names.len(),
                    outputs = defaults.len(),
                    "output name count does not match the model outputs, using default names"
                );
                defaults
            }
            None => defaults,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "INT8")]
    Int8,
    #[default]
    #[serde(rename = "FP16")]
    Fp16,
    #[serde(rename = "FP32")]
    Fp32,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataType::Int8 => "INT8",
            DataType::Fp16 => "FP16",
            DataType::Fp32 => "FP32",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnnxSpec {
    #[serde(default = "default_opset_version")]
    pub opset_version: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_axes: Option<Params>,
}

impl Default for OnnxSpec {
    fn default() -> Self {
        Self {
            opset_version: default_opset_version(),
            dynamic_axes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobconverterSpec {
    #[serde(default)]
    pub active: bool,

    #[serde(default = "default_shaves")]
    pub shaves: usize,
}

impl Default for BlobconverterSpec {
    fn default() -> Self {
        Self {
            active: false,
            shaves: default_shaves(),
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_loss_weight() -> f64 {
    1.0
}

pub(crate) fn default_train_view() -> String {
    "train".to_string()
}

pub(crate) fn default_val_view() -> String {
    "val".to_string()
}

pub(crate) fn default_test_view() -> String {
    "test".to_string()
}

pub(crate) fn default_batch_size() -> usize {
    32
}

pub(crate) fn default_epochs() -> usize {
    100
}

pub(crate) fn default_num_sanity_val_steps() -> i64 {
    2
}

pub(crate) fn default_train_metrics_interval() -> i64 {
    -1
}

pub(crate) fn default_save_directory() -> String {
    "output".to_string()
}

pub(crate) fn default_export_save_directory() -> String {
    "output_export".to_string()
}

pub(crate) fn default_export_model_name() -> String {
    "model".to_string()
}

pub(crate) fn default_opset_version() -> usize {
    12
}

pub(crate) fn default_shaves() -> usize {
    6
}

pub(crate) fn default_num_workers() -> usize {
    2
}

pub(crate) fn default_validation_interval() -> usize {
    1
}

pub(crate) fn default_num_log_images() -> usize {
    4
}

pub(crate) fn default_accumulate_grad_batches() -> usize {
    1
}

pub(crate) fn default_save_top_k() -> usize {
    3
}

pub(crate) fn default_train_image_size() -> [usize; 2] {
    [256, 256]
}

pub(crate) fn default_normalize_params() -> Params {
    let mut params = Params::new();
    params.insert("mean".into(), serde_json::json!([0.485, 0.456, 0.406]));
    params.insert("std".into(), serde_json::json!([0.229, 0.224, 0.225]));
    params
}
