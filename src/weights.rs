//! Weight vectors and per-asset weight bounds.

use std::fmt;

use crate::error::{AllocError, Result};

/// An ordered mapping from asset name to portfolio weight.
///
/// Insertion order is preserved so that results read in the same column
/// order as the [`ReturnsMatrix`](crate::ReturnsMatrix) they came from.
/// Inserting an asset twice overwrites the earlier weight.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightVector {
    entries: Vec<(String, f64)>,
}

impl WeightVector {
    /// An empty weight vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(asset, weight)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut out = Self::new();
        for (asset, weight) in pairs {
            out.insert(asset, weight);
        }
        out
    }

    /// Zip asset names with weights. Both slices must have the same length.
    pub(crate) fn from_parts(assets: &[String], weights: &[f64]) -> Self {
        debug_assert_eq!(assets.len(), weights.len());
        Self {
            entries: assets.iter().cloned().zip(weights.iter().copied()).collect(),
        }
    }

    /// Set the weight of `asset`, replacing any previous value.
    pub fn insert(&mut self, asset: impl Into<String>, weight: f64) {
        let asset = asset.into();
        match self.entries.iter_mut().find(|(name, _)| *name == asset) {
            Some(entry) => entry.1 = weight,
            None => self.entries.push((asset, weight)),
        }
    }

    /// Weight of `asset`, if present.
    pub fn get(&self, asset: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == asset)
            .map(|(_, w)| *w)
    }

    /// Number of assets.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterator over `(asset, weight)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, w)| (name.as_str(), *w))
    }

    /// Weights in insertion order.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, w)| *w).collect()
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    pub fn as_slice(&self) -> &[(String, f64)] {
        &self.entries
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl fmt::Display for WeightVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (asset, w)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{asset}: {:.2}%", w * 100.0)?;
        }
        Ok(())
    }
}

/// Minimum/maximum weight per asset (box constraints).
///
/// A default pair applies to every asset; individual assets can override it.
///
/// ```
/// use nanoalloc::WeightBounds;
///
/// let bounds = WeightBounds::new(0.0, 0.4).with_asset("Cash", 0.0, 0.1);
/// assert_eq!(bounds.for_asset("Cash"), (0.0, 0.1));
/// assert_eq!(bounds.for_asset("Equity"), (0.0, 0.4));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightBounds {
    /// Default lower bound (0.0 = no short sales)
    pub min: f64,
    /// Default upper bound (1.0 = no leverage)
    pub max: f64,
    overrides: Vec<(String, f64, f64)>,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl WeightBounds {
    /// The same `[min, max]` pair for every asset.
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            overrides: Vec::new(),
        }
    }

    /// Override the pair for a single asset.
    pub fn with_asset(mut self, asset: impl Into<String>, min: f64, max: f64) -> Self {
        let asset = asset.into();
        self.overrides.retain(|(name, _, _)| *name != asset);
        self.overrides.push((asset, min, max));
        self
    }

    /// The effective `(min, max)` for `asset`.
    pub fn for_asset(&self, asset: &str) -> (f64, f64) {
        self.overrides
            .iter()
            .find(|(name, _, _)| name == asset)
            .map(|(_, lo, hi)| (*lo, *hi))
            .unwrap_or((self.min, self.max))
    }

    /// Resolve one `(min, max)` pair per asset, in column order.
    ///
    /// Fails if an override names an asset outside `assets` or if any pair
    /// is non-finite or inverted.
    pub(crate) fn resolve(&self, assets: &[String]) -> Result<Vec<(f64, f64)>> {
        if let Some((name, _, _)) = self
            .overrides
            .iter()
            .find(|(name, _, _)| !assets.contains(name))
        {
            return Err(AllocError::UnknownAsset(name.clone()));
        }

        assets
            .iter()
            .map(|asset| {
                let (min, max) = self.for_asset(asset);
                if !min.is_finite() || !max.is_finite() || min > max {
                    return Err(AllocError::InvalidBounds {
                        asset: asset.clone(),
                        min,
                        max,
                    });
                }
                Ok((min, max))
            })
            .collect()
    }
}
