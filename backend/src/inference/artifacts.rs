//! Fitted preprocessing and classifier artifacts exported to JSON by the
//! offline training step.
//!
//! Layouts mirror the fitted attributes of the training library: a standard
//! scaler keeps `mean`/`scale` per feature, a label encoder keeps its sorted
//! `classes`, and a random forest keeps the flat node arrays of every tree.

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{InferenceError, ModelLoadError};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelLoadError> {
    if !path.exists() {
        return Err(ModelLoadError::Missing(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ModelLoadError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        let n = self.feature_names.len();
        if self.mean.len() != n || self.scale.len() != n {
            return Err(ModelLoadError::Inconsistent(format!(
                "scaler has {} features but {} means and {} scales",
                n,
                self.mean.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// `(x - mean) / scale`; a zero scale (constant feature) divides by one.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, InferenceError> {
        if x.ncols() != self.mean.len() {
            return Err(InferenceError::Preprocessing(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                x.ncols()
            )));
        }
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for (j, value) in row.iter_mut().enumerate() {
                let scale = if self.scale[j] == 0.0 { 1.0 } else { self.scale[j] };
                *value = (*value - self.mean[j]) / scale;
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.classes.is_empty() {
            return Err(ModelLoadError::Inconsistent(
                "label encoder has no classes".to_string(),
            ));
        }
        Ok(())
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str, InferenceError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(InferenceError::UnknownClass(index))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    RandomForest(RandomForest),
    Logistic(LogisticRegression),
}

impl Classifier {
    pub fn n_features(&self) -> usize {
        match self {
            Classifier::RandomForest(forest) => forest.n_features,
            Classifier::Logistic(model) => model.coef.first().map_or(0, Vec::len),
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            Classifier::RandomForest(forest) => forest.n_classes,
            Classifier::Logistic(model) => model.n_classes(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelLoadError> {
        match self {
            Classifier::RandomForest(forest) => forest.validate(),
            Classifier::Logistic(model) => model.validate(),
        }
    }

    /// One probability row per input row, `n_classes` columns.
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, InferenceError> {
        if x.ncols() != self.n_features() {
            return Err(InferenceError::Model(format!(
                "classifier expects {} features, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        let n_classes = self.n_classes();
        let mut out = Array2::<f64>::zeros((x.nrows(), n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let probs = match self {
                Classifier::RandomForest(forest) => forest.row_proba(row)?,
                Classifier::Logistic(model) => model.row_proba(row),
            };
            for (j, p) in probs.into_iter().enumerate() {
                out[[i, j]] = p;
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

/// Flat node arrays; a negative `children_left` marks a leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl RandomForest {
    fn validate(&self) -> Result<(), ModelLoadError> {
        if self.trees.is_empty() {
            return Err(ModelLoadError::Inconsistent(
                "random forest has no trees".to_string(),
            ));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|msg| ModelLoadError::Inconsistent(format!("tree {}: {}", t, msg)))?;
        }
        Ok(())
    }

    fn row_proba(&self, row: ArrayView1<f64>) -> Result<Vec<f64>, InferenceError> {
        let mut acc = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf_distribution(row)?;
            for (a, p) in acc.iter_mut().zip(leaf) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(acc.into_iter().map(|a| a / n).collect())
    }
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("empty tree".to_string());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err("node arrays differ in length".to_string());
        }
        for node in 0..n {
            if self.value[node].len() != n_classes {
                return Err(format!("node {} has {} class values", node, self.value[node].len()));
            }
            if self.children_left[node] < 0 {
                continue;
            }
            let in_range = |child: i64| child > 0 && (child as usize) < n;
            if !in_range(self.children_left[node]) || !in_range(self.children_right[node]) {
                return Err(format!("node {} points outside the tree", node));
            }
            if self.feature[node] < 0 || self.feature[node] as usize >= n_features {
                return Err(format!("node {} splits on unknown feature", node));
            }
        }
        Ok(())
    }

    /// Normalised class distribution of the leaf `row` falls into.
    fn leaf_distribution(&self, row: ArrayView1<f64>) -> Result<Vec<f64>, InferenceError> {
        let mut node = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.children_left.len() {
            let left = self.children_left[node];
            if left < 0 {
                let counts = &self.value[node];
                let total: f64 = counts.iter().sum();
                if total <= 0.0 {
                    return Err(InferenceError::Model(format!("leaf {} is empty", node)));
                }
                return Ok(counts.iter().map(|c| c / total).collect());
            }
            let feature = self.feature[node] as usize;
            let x = *row.get(feature).ok_or_else(|| {
                InferenceError::Model(format!("feature {} out of range", feature))
            })?;
            node = if x <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
        Err(InferenceError::Model("tree traversal did not terminate".to_string()))
    }
}

/// Multinomial logistic regression; a single coefficient row is the binary
/// case and yields `[1 - p, p]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LogisticRegression {
    fn n_classes(&self) -> usize {
        if self.coef.len() == 1 { 2 } else { self.coef.len() }
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        let width = self.coef.first().map_or(0, Vec::len);
        if width == 0 || self.coef.iter().any(|row| row.len() != width) {
            return Err(ModelLoadError::Inconsistent(
                "logistic coefficients are ragged or empty".to_string(),
            ));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(ModelLoadError::Inconsistent(format!(
                "{} coefficient rows but {} intercepts",
                self.coef.len(),
                self.intercept.len()
            )));
        }
        Ok(())
    }

    fn row_proba(&self, row: ArrayView1<f64>) -> Vec<f64> {
        let logits: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| w.iter().zip(row.iter()).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect();

        if logits.len() == 1 {
            let p = 1.0 / (1.0 + (-logits[0]).exp());
            return vec![1.0 - p, p];
        }
        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / sum).collect()
    }
}
