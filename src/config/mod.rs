//! Declarative experiment configuration
//!
//! One YAML document describes a complete supervised-learning experiment.
//! Anchors (`&name`) and aliases (`*name`) let a value such as the epoch
//! count be written once and reused.
//!
//! # Example
//!
//! ```yaml
//! model:
//!   name: resnet_classification
//!   nodes:
//!     - name: ResNet
//!       params:
//!         variant: "50"
//!     - name: ClassificationHead
//!       inputs: [ResNet]
//!   losses:
//!     - name: CrossEntropyLoss
//!       attached_to: ClassificationHead
//!   metrics:
//!     - name: Accuracy
//!       attached_to: ClassificationHead
//!       is_main_metric: true
//!
//! dataset:
//!   name: cifar10_test
//!
//! trainer:
//!   batch_size: 4
//!   epochs: &epochs 200
//!   optimizer:
//!     name: SGD
//!     params:
//!       lr: 0.02
//!   scheduler:
//!     name: ConstantLR
//!     params:
//!       total_iters: *epochs
//! ```

mod anchors;
mod cli;
mod loader;
mod overrides;
mod registry;
mod schema;
mod validate;



pub use anchors::{resolve_anchors, scan_anchors, AnchorTable, Marker};
pub use cli::{parse_args, Cli, Command, InfoArgs, OutputFormat, ResolveArgs, ValidateArgs};
pub use loader::{load_config, load_config_str, Loader};
pub use overrides::{apply_overrides, parse_overrides, Override};
pub use registry::{Category, OptimizerKind, Registry, SchedulerKind};
pub use schema::{
    Accelerator, AugmentationSpec, BlobconverterSpec, BucketStorage, BucketType, CallbackSpec,
    DataType, DatasetSpec, Devices, ExperimentConfig, ExportSpec, FreezingSpec, LossSpec,
    MetricSpec, ModelSpec, NodeSpec, NormalizeSpec, OnnxSpec, OptimizerSpec, Params,
    PreprocessingSpec, Profiler, SchedulerSpec, Strategy, TrackerSpec, TrainerSpec,
    UnfreezeAfter, VisualizerSpec,
};
pub use validate::{validate_document, ConfigError, ValidationErrors};
