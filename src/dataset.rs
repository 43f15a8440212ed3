//! In-memory datasets: variables, coordinates, dimensions and global attributes

use crate::errors::{AutoQcError, Result};
use crate::field::{Coordinate, GriddedField};
use crate::metadata::{AttrValue, MetadataDict};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// A collection of gridded fields sharing dimensions and coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    dims: BTreeMap<String, usize>,
    coords: BTreeMap<String, Coordinate>,
    variables: BTreeMap<String, GriddedField>,
    attributes: MetadataDict,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    fn register_dim(&mut self, dim: &str, len: usize) -> Result<()> {
        match self.dims.get(dim) {
            Some(&existing) if existing != len => Err(AutoQcError::DimensionMismatch {
                message: format!(
                    "dimension '{}' has length {} but {} was already registered",
                    dim, len, existing
                ),
            }),
            Some(_) => Ok(()),
            None => {
                self.dims.insert(dim.to_string(), len);
                Ok(())
            }
        }
    }

    /// Register a dimension without any variable on it
    pub fn add_dimension(&mut self, dim: &str, len: usize) -> Result<()> {
        self.register_dim(dim, len)
    }

    /// Add a dataset-level coordinate
    pub fn add_coord(&mut self, name: &str, coord: Coordinate) -> Result<()> {
        for (dim, len) in coord.dims.iter().zip(coord.shape()) {
            self.register_dim(dim, len)?;
        }
        self.coords.insert(name.to_string(), coord);
        Ok(())
    }

    /// Add a variable; its dimensions and coordinates are registered on the dataset
    pub fn add_field(&mut self, field: GriddedField) -> Result<()> {
        for (dim, &len) in field.dims().iter().zip(field.data().shape()) {
            self.register_dim(dim, len)?;
        }
        for (name, coord) in field.coords() {
            if !self.coords.contains_key(name) {
                self.add_coord(name, coord.clone())?;
            }
        }
        self.variables.insert(field.name().to_string(), field);
        Ok(())
    }

    #[must_use]
    pub fn dims(&self) -> &BTreeMap<String, usize> {
        &self.dims
    }

    #[must_use]
    pub fn coords(&self) -> &BTreeMap<String, Coordinate> {
        &self.coords
    }

    #[must_use]
    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    #[must_use]
    pub fn variables(&self) -> &BTreeMap<String, GriddedField> {
        &self.variables
    }

    /// Look up a variable by name
    pub fn field(&self, name: &str) -> Result<&GriddedField> {
        self.variables
            .get(name)
            .ok_or_else(|| AutoQcError::VariableNotFound {
                var: name.to_string(),
            })
    }

    #[must_use]
    pub fn attributes(&self) -> &MetadataDict {
        &self.attributes
    }

    #[must_use]
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(AttrValue::as_str)
    }

    /// Decoded timestamps of the named time coordinate
    #[must_use]
    pub fn times(&self, time: &str) -> Option<&[NaiveDateTime]> {
        self.coords.get(time).and_then(Coordinate::as_times)
    }
}
