//! Known identifier vocabularies
//!
//! Node, loss, metric, visualizer and callback names are open vocabularies:
//! the training framework may register its own components, so they are
//! checked against a [`Registry`] allow-list supplied by the caller.
//! Optimizers and schedulers are closed sets modelled as enums, each with
//! the parameter names it accepts.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier category, used for registry lookups and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Node,
    Loss,
    Metric,
    Visualizer,
    Callback,
    Optimizer,
    Scheduler,
}

impl Category {
    /// Categories whose vocabulary lives in a [`Registry`]
    pub const OPEN: [Category; 5] = [
        Category::Node,
        Category::Loss,
        Category::Metric,
        Category::Visualizer,
        Category::Callback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Node => "node",
            Category::Loss => "loss",
            Category::Metric => "metric",
            Category::Visualizer => "visualizer",
            Category::Callback => "callback",
            Category::Optimizer => "optimizer",
            Category::Scheduler => "scheduler",
        }
    }

    /// Whether the vocabulary is an enum rather than a registry allow-list
    pub fn is_closed(self) -> bool {
        matches!(self, Category::Optimizer | Category::Scheduler)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BUILTIN_NODES: &[&str] = &[
    "BiSeNetHead",
    "ClassificationHead",
    "EfficientBBoxHead",
    "EfficientNet",
    "EfficientRep",
    "ImplicitKeypointBBoxHead",
    "MicroNet",
    "MobileNetV2",
    "MobileOne",
    "RepPANNeck",
    "ReXNetV1_lite",
    "ResNet",
    "SegmentationHead",
];

const BUILTIN_LOSSES: &[&str] = &[
    "AdaptiveDetectionLoss",
    "BCEWithLogitsLoss",
    "CrossEntropyLoss",
    "ImplicitKeypointBBoxLoss",
    "KeypointLoss",
    "SigmoidFocalLoss",
    "SmoothBCEWithLogitsLoss",
    "SoftmaxFocalLoss",
];

const BUILTIN_METRICS: &[&str] = &[
    "Accuracy",
    "F1Score",
    "JaccardIndex",
    "MeanAveragePrecision",
    "MeanAveragePrecisionKeypoints",
    "ObjectKeypointSimilarity",
    "Precision",
    "Recall",
];

const BUILTIN_VISUALIZERS: &[&str] = &[
    "BBoxVisualizer",
    "ClassificationVisualizer",
    "KeypointVisualizer",
    "MultiVisualizer",
    "SegmentationVisualizer",
];

const BUILTIN_CALLBACKS: &[&str] = &[
    "DeviceStatsMonitor",
    "EarlyStopping",
    "ExportOnTrainEnd",
    "LearningRateMonitor",
    "MetadataLogger",
    "ModelCheckpoint",
    "RichModelSummary",
    "TestOnTrainEnd",
    "UploadCheckpoint",
];

/// Allow-list of identifiers understood by the external training framework
///
/// The registry only answers membership questions; it does not know what a
/// `ResNet` or an `ExportOnTrainEnd` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<Category, BTreeSet<String>>,
}

impl Registry {
    /// A registry with no open-vocabulary names at all
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The default vocabulary shipped with the crate
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (category, names) in [
            (Category::Node, BUILTIN_NODES),
            (Category::Loss, BUILTIN_LOSSES),
            (Category::Metric, BUILTIN_METRICS),
            (Category::Visualizer, BUILTIN_VISUALIZERS),
            (Category::Callback, BUILTIN_CALLBACKS),
        ] {
            for name in names {
                registry.register(category, *name);
            }
        }
        registry
    }

    /// Add a name to an open vocabulary
    ///
    /// Returns `true` if the name was newly added. Optimizer and scheduler
    /// vocabularies are closed, registering under them never succeeds.
    pub fn register(&mut self, category: Category, name: impl Into<String>) -> bool {
        if category.is_closed() {
            return false;
        }
        self.entries.entry(category).or_default().insert(name.into())
    }

    /// Builder-style [`Registry::register`]
    pub fn with(mut self, category: Category, name: impl Into<String>) -> Self {
        self.register(category, name);
        self
    }

    /// Whether `name` is a known identifier of `category`
    pub fn contains(&self, category: Category, name: &str) -> bool {
        match category {
            Category::Optimizer => name.parse::<OptimizerKind>().is_ok(),
            Category::Scheduler => name.parse::<SchedulerKind>().is_ok(),
            _ => self
                .entries
                .get(&category)
                .is_some_and(|names| names.contains(name)),
        }
    }

    /// Known names of an open category, sorted
    pub fn names(&self, category: Category) -> Vec<&str> {
        match category {
            Category::Optimizer => OptimizerKind::ALL.iter().map(|k| k.as_str()).collect(),
            Category::Scheduler => SchedulerKind::ALL.iter().map(|k| k.as_str()).collect(),
            _ => self
                .entries
                .get(&category)
                .map(|names| names.iter().map(String::as_str).collect())
                .unwrap_or_default(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Optimization algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OptimizerKind {
    Adadelta,
    Adagrad,
    #[default]
    Adam,
    AdamW,
    Adamax,
    #[serde(rename = "ASGD")]
    Asgd,
    #[serde(rename = "LBFGS")]
    Lbfgs,
    NAdam,
    RAdam,
    RMSprop,
    Rprop,
    #[serde(rename = "SGD")]
    Sgd,
    SparseAdam,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 13] = [
        OptimizerKind::Adadelta,
        OptimizerKind::Adagrad,
        OptimizerKind::Adam,
        OptimizerKind::AdamW,
        OptimizerKind::Adamax,
        OptimizerKind::Asgd,
        OptimizerKind::Lbfgs,
        OptimizerKind::NAdam,
        OptimizerKind::RAdam,
        OptimizerKind::RMSprop,
        OptimizerKind::Rprop,
        OptimizerKind::Sgd,
        OptimizerKind::SparseAdam,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptimizerKind::Adadelta => "Adadelta",
            OptimizerKind::Adagrad => "Adagrad",
            OptimizerKind::Adam => "Adam",
            OptimizerKind::AdamW => "AdamW",
            OptimizerKind::Adamax => "Adamax",
            OptimizerKind::Asgd => "ASGD",
            OptimizerKind::Lbfgs => "LBFGS",
            OptimizerKind::NAdam => "NAdam",
            OptimizerKind::RAdam => "RAdam",
            OptimizerKind::RMSprop => "RMSprop",
            OptimizerKind::Rprop => "Rprop",
            OptimizerKind::Sgd => "SGD",
            OptimizerKind::SparseAdam => "SparseAdam",
        }
    }

    /// Parameter names the optimizer constructor accepts
    pub fn accepted_params(self) -> &'static [&'static str] {
        match self {
            OptimizerKind::Adadelta => &[
                "lr",
                "rho",
                "eps",
                "weight_decay",
                "foreach",
                "capturable",
                "maximize",
                "differentiable",
            ],
            OptimizerKind::Adagrad => &[
                "lr",
                "lr_decay",
                "weight_decay",
                "initial_accumulator_value",
                "eps",
                "foreach",
                "maximize",
                "differentiable",
                "fused",
            ],
            OptimizerKind::Adam | OptimizerKind::AdamW => &[
                "lr",
                "betas",
                "eps",
                "weight_decay",
                "amsgrad",
                "foreach",
                "maximize",
                "capturable",
                "differentiable",
                "fused",
            ],
            OptimizerKind::Adamax => &[
                "lr",
                "betas",
                "eps",
                "weight_decay",
                "foreach",
                "maximize",
                "differentiable",
                "capturable",
            ],
            OptimizerKind::Asgd => &[
                "lr",
                "lambd",
                "alpha",
                "t0",
                "weight_decay",
                "foreach",
                "maximize",
                "differentiable",
                "capturable",
            ],
            OptimizerKind::Lbfgs => &[
                "lr",
                "max_iter",
                "max_eval",
                "tolerance_grad",
                "tolerance_change",
                "history_size",
                "line_search_fn",
            ],
            OptimizerKind::NAdam => &[
                "lr",
                "betas",
                "eps",
                "weight_decay",
                "momentum_decay",
                "decoupled_weight_decay",
                "foreach",
                "maximize",
                "capturable",
                "differentiable",
            ],
            OptimizerKind::RAdam => &[
                "lr",
                "betas",
                "eps",
                "weight_decay",
                "decoupled_weight_decay",
                "foreach",
                "maximize",
                "capturable",
                "differentiable",
            ],
            OptimizerKind::RMSprop => &[
                "lr",
                "alpha",
                "eps",
                "weight_decay",
                "momentum",
                "centered",
                "capturable",
                "foreach",
                "maximize",
                "differentiable",
            ],
            OptimizerKind::Rprop => &[
                "lr",
                "etas",
                "step_sizes",
                "capturable",
                "foreach",
                "maximize",
                "differentiable",
            ],
            OptimizerKind::Sgd => &[
                "lr",
                "momentum",
                "dampening",
                "weight_decay",
                "nesterov",
                "maximize",
                "foreach",
                "differentiable",
                "fused",
            ],
            OptimizerKind::SparseAdam => &["lr", "betas", "eps", "maximize"],
        }
    }

    pub fn accepts(self, param: &str) -> bool {
        self.accepted_params().contains(&param)
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptimizerKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown optimizer: {s}"))
    }
}

/// Learning-rate schedule
///
/// Schedules that take callables (`LambdaLR`, `MultiplicativeLR`) or nested
/// schedulers (`SequentialLR`, `ChainedScheduler`) cannot be written as plain
/// data and are not part of the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SchedulerKind {
    #[default]
    ConstantLR,
    CosineAnnealingLR,
    CosineAnnealingWarmRestarts,
    CyclicLR,
    ExponentialLR,
    LinearLR,
    MultiStepLR,
    OneCycleLR,
    PolynomialLR,
    ReduceLROnPlateau,
    StepLR,
}

impl SchedulerKind {
    pub const ALL: [SchedulerKind; 11] = [
        SchedulerKind::ConstantLR,
        SchedulerKind::CosineAnnealingLR,
        SchedulerKind::CosineAnnealingWarmRestarts,
        SchedulerKind::CyclicLR,
        SchedulerKind::ExponentialLR,
        SchedulerKind::LinearLR,
        SchedulerKind::MultiStepLR,
        SchedulerKind::OneCycleLR,
        SchedulerKind::PolynomialLR,
        SchedulerKind::ReduceLROnPlateau,
        SchedulerKind::StepLR,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchedulerKind::ConstantLR => "ConstantLR",
            SchedulerKind::CosineAnnealingLR => "CosineAnnealingLR",
            SchedulerKind::CosineAnnealingWarmRestarts => "CosineAnnealingWarmRestarts",
            SchedulerKind::CyclicLR => "CyclicLR",
            SchedulerKind::ExponentialLR => "ExponentialLR",
            SchedulerKind::LinearLR => "LinearLR",
            SchedulerKind::MultiStepLR => "MultiStepLR",
            SchedulerKind::OneCycleLR => "OneCycleLR",
            SchedulerKind::PolynomialLR => "PolynomialLR",
            SchedulerKind::ReduceLROnPlateau => "ReduceLROnPlateau",
            SchedulerKind::StepLR => "StepLR",
        }
    }

    /// Parameter names the scheduler constructor accepts
    pub fn accepted_params(self) -> &'static [&'static str] {
        match self {
            SchedulerKind::ConstantLR => &["factor", "total_iters", "last_epoch"],
            SchedulerKind::CosineAnnealingLR => &["T_max", "eta_min", "last_epoch"],
            SchedulerKind::CosineAnnealingWarmRestarts => {
                &["T_0", "T_mult", "eta_min", "last_epoch"]
            }
            SchedulerKind::CyclicLR => &[
                "base_lr",
                "max_lr",
                "step_size_up",
                "step_size_down",
                "mode",
                "gamma",
                "scale_mode",
                "cycle_momentum",
                "base_momentum",
                "max_momentum",
                "last_epoch",
            ],
            SchedulerKind::ExponentialLR => &["gamma", "last_epoch"],
            SchedulerKind::LinearLR => {
                &["start_factor", "end_factor", "total_iters", "last_epoch"]
            }
            SchedulerKind::MultiStepLR => &["milestones", "gamma", "last_epoch"],
            SchedulerKind::OneCycleLR => &[
                "max_lr",
                "total_steps",
                "epochs",
                "steps_per_epoch",
                "pct_start",
                "anneal_strategy",
                "cycle_momentum",
                "base_momentum",
                "max_momentum",
                "div_factor",
                "final_div_factor",
                "three_phase",
                "last_epoch",
            ],
            SchedulerKind::PolynomialLR => &["total_iters", "power", "last_epoch"],
            SchedulerKind::ReduceLROnPlateau => &[
                "mode",
                "factor",
                "patience",
                "threshold",
                "threshold_mode",
                "cooldown",
                "min_lr",
                "eps",
            ],
            SchedulerKind::StepLR => &["step_size", "gamma", "last_epoch"],
        }
    }

    pub fn accepts(self, param: &str) -> bool {
        self.accepted_params().contains(&param)
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchedulerKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown scheduler: {s}"))
    }
}
