//! Binary classification of feature vectors
//!
//! The pipeline only sees the `Classifier` trait: feed it `FEATURE_SIZE`
//! values, get back 0 or 1. The shipped implementation is a random forest
//! exported to JSON: each tree is a flat node list where split nodes send
//! `x[feature] <= threshold` left and everything else right, and leaves
//! carry a class. The forest votes; ties go to class 0.
//!
//! A default forest is compiled into the binary. `--model` swaps in another
//! export with the same feature count.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_MODEL: &str = include_str!("../../models/default_forest.json");

/// Maps a feature vector to a binary label.
///
/// Implementations must be deterministic and side-effect free.
pub trait Classifier {
    fn predict(&self, features: &[f32]) -> u8;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        class: u8,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict(&self, features: &[f32]) -> u8 {
        let mut idx = 0;
        // Children always point forward, so this walk terminates
        loop {
            match self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
                Node::Leaf { class } => return class,
            }
        }
    }
}

/// Only built through `from_json`, `from_file` or `builtin`, so every
/// instance has passed `validate` and the tree walk cannot index out of
/// bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn from_json(json: &str) -> Result<Self> {
        let forest: RandomForest = serde_json::from_str(json)?;
        forest.validate()?;
        Ok(forest)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The forest compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_MODEL)
    }

    fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::InvalidModel("forest has no trees".into()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(Error::InvalidModel(format!("tree {} has no nodes", t)));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match *node {
                    Node::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if feature >= self.n_features {
                            return Err(Error::InvalidModel(format!(
                                "tree {} node {}: feature {} out of range (n_features = {})",
                                t, i, feature, self.n_features
                            )));
                        }
                        for child in [left, right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(Error::InvalidModel(format!(
                                    "tree {} node {}: bad child index {}",
                                    t, i, child
                                )));
                            }
                        }
                    }
                    Node::Leaf { class } => {
                        if class > 1 {
                            return Err(Error::InvalidModel(format!(
                                "tree {} node {}: class {} is not binary",
                                t, i, class
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn predict(&self, features: &[f32]) -> u8 {
        if features.len() < self.n_features {
            debug!(
                "feature vector has {} values, model needs {}",
                features.len(),
                self.n_features
            );
            return 0;
        }
        let mut votes = [0u32; 2];
        for tree in &self.trees {
            votes[tree.predict(features) as usize] += 1;
        }
        if votes[1] > votes[0] {
            1
        } else {
            0
        }
    }
}

/// Wraps the model and answers 0 until a model has been installed.
///
/// A 0 from an uninitialized engine means "no prediction", not a true
/// negative.
#[derive(Debug, Default)]
pub struct PredictionEngine {
    model: Option<RandomForest>,
}

impl PredictionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the built-in forest
    pub fn initialize(&mut self) -> Result<()> {
        self.install(RandomForest::builtin()?);
        Ok(())
    }

    pub fn install(&mut self, model: RandomForest) {
        info!(
            "classifier ready: {} trees over {} features",
            model.trees.len(),
            model.n_features
        );
        self.model = Some(model);
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    /// Feature count the installed model expects
    pub fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.n_features)
    }
}

impl Classifier for PredictionEngine {
    fn predict(&self, features: &[f32]) -> u8 {
        match &self.model {
            Some(model) => model.predict(features),
            None => 0,
        }
    }
}
