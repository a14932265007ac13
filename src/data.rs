//! Feature data
//!
//! The feature vectors that decision nodes are evaluated against, and the
//! feature definition that maps feature names to positions.
use crate::errors::CartError;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Read access to the engineered features of one data point.
///
/// Categorical features are stored as integer codes.
/// `None` and `NaN` both mean the value is missing.
pub trait FeatureVector {
    fn value(&self, feature: usize) -> Option<f64>;
}

impl FeatureVector for [f64] {
    fn value(&self, feature: usize) -> Option<f64> {
        self.get(feature).copied()
    }
}

impl FeatureVector for Vec<f64> {
    fn value(&self, feature: usize) -> Option<f64> {
        self.as_slice().value(feature)
    }
}

impl FeatureVector for HashMap<usize, f64> {
    fn value(&self, feature: usize) -> Option<f64> {
        self.get(&feature).copied()
    }
}

impl<T: FeatureVector + ?Sized> FeatureVector for &T {
    fn value(&self, feature: usize) -> Option<f64> {
        (**self).value(feature)
    }
}

/// Ordered feature names. A feature's number is its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureDefinition {
    names: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FeatureDefinition {
    /// Names must be unique, non-empty, and free of whitespace.
    pub fn new(names: Vec<String>) -> Result<Self, CartError> {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(CartError::UnknownFeature(format!("'{}' is not a valid feature name", name)));
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(CartError::UnknownFeature(format!("'{}' is defined twice", name)));
            }
        }
        Ok(FeatureDefinition { names, index })
    }

    pub fn from_names(names: &[&str]) -> Result<Self, CartError> {
        Self::new(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn index_of(&self, name: &str) -> Result<usize, CartError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| CartError::UnknownFeature(name.to_string()))
    }

    pub fn name(&self, feature: usize) -> Option<&str> {
        self.names.get(feature).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TryFrom<Vec<String>> for FeatureDefinition {
    type Error = CartError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        FeatureDefinition::new(names)
    }
}

impl From<FeatureDefinition> for Vec<String> {
    fn from(def: FeatureDefinition) -> Self {
        def.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_feature_vector() {
        let v = vec![1.0, f64::NAN, 3.0];
        assert_eq!(v.value(0), Some(1.0));
        assert!(v.value(1).unwrap().is_nan());
        assert_eq!(v.value(3), None);
        let s: &[f64] = &v;
        assert_eq!(s.value(2), Some(3.0));
    }

    #[test]
    fn test_map_feature_vector() {
        let mut m: HashMap<usize, f64> = HashMap::new();
        m.insert(4, 2.0);
        assert_eq!(m.value(4), Some(2.0));
        assert_eq!(m.value(0), None);
    }

    #[test]
    fn test_feature_definition_lookup() {
        let def = FeatureDefinition::from_names(&["phone", "accent", "pos_in_syl"]).unwrap();
        assert_eq!(def.len(), 3);
        assert_eq!(def.index_of("accent").unwrap(), 1);
        assert_eq!(def.name(2), Some("pos_in_syl"));
        assert!(matches!(def.index_of("stress"), Err(CartError::UnknownFeature(_))));
    }

    #[test]
    fn test_feature_definition_rejects_bad_names() {
        assert!(FeatureDefinition::from_names(&["a", "a"]).is_err());
        assert!(FeatureDefinition::from_names(&["has space"]).is_err());
        assert!(FeatureDefinition::from_names(&[""]).is_err());
    }

    #[test]
    fn test_feature_definition_json() {
        let def = FeatureDefinition::from_names(&["a", "b"]).unwrap();
        let json = serde_json::to_string(&def).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
        let def2: FeatureDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(def2.index_of("b").unwrap(), 1);
        assert!(serde_json::from_str::<FeatureDefinition>(r#"["a","a"]"#).is_err());
    }
}
