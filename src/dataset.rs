//! Dataset container for labeled arrays.
//!
//! A [`Dataset`] collects named [`DataArray`]s plus file-level attributes,
//! and enforces the naming invariant that makes blockwise dispatch safe:
//! the same dimension name always refers to the same extent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataarray::DataArray;
use crate::error::{CoriolisError, Result};

/// Possible attribute values on datasets and variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String attribute
    Text(String),
    /// Numeric attribute (stored as f64 for simplicity)
    Number(f64),
    /// Array of numbers
    NumberArray(Vec<f64>),
}

/// A named collection of labeled arrays.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// File-level attributes
    pub attrs: HashMap<String, AttributeValue>,
    variables: HashMap<String, DataArray>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, checking dimension-size consistency against the
    /// variables already present.
    pub fn insert(&mut self, name: &str, var: DataArray) -> Result<()> {
        let dims = self.dims();
        for (dim, &size) in var.dims().iter().zip(var.shape()) {
            if let Some(&existing) = dims.get(dim) {
                if existing != size {
                    return Err(CoriolisError::Dimension {
                        message: format!(
                            "variable {} has dimension {} of size {}, but it is already defined with size {}",
                            name, dim, size, existing
                        ),
                    });
                }
            }
        }
        self.variables.insert(name.to_string(), var);
        Ok(())
    }

    /// Get a variable's array
    pub fn get_variable(&self, name: &str) -> Option<&DataArray> {
        self.variables.get(name)
    }

    /// Get a variable's array with error handling
    pub fn get_variable_checked(&self, name: &str) -> Result<&DataArray> {
        self.variables
            .get(name)
            .ok_or_else(|| CoriolisError::DataNotFound {
                message: format!("Variable not found: {}", name),
            })
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &String> {
        self.variables.keys()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &DataArray)> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Map of every dimension name to its extent.
    pub fn dims(&self) -> HashMap<&String, usize> {
        let mut out = HashMap::new();
        for var in self.variables.values() {
            for (dim, &size) in var.dims().iter().zip(var.shape()) {
                out.entry(dim).or_insert(size);
            }
        }
        out
    }

    /// Validate that the dataset is consistent and ready for use.
    pub fn validate(&self) -> Result<()> {
        if self.variables.is_empty() {
            return Err(CoriolisError::DataNotFound {
                message: "Dataset contains no variables".to_string(),
            });
        }
        let mut dims: HashMap<&String, usize> = HashMap::new();
        for (name, var) in &self.variables {
            for (dim, &size) in var.dims().iter().zip(var.shape()) {
                match dims.get(dim) {
                    Some(&existing) if existing != size => {
                        return Err(CoriolisError::Dimension {
                            message: format!(
                                "variable {} has inconsistent size for dimension {}: {} vs {}",
                                name, dim, size, existing
                            ),
                        });
                    }
                    Some(_) => {}
                    None => {
                        dims.insert(dim, size);
                    }
                }
            }
        }
        Ok(())
    }
}
