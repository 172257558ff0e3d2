//! Morphological feature strings
//!
//! CoNLL-U packs morphology into `Feature=Value` pairs separated by `|`,
//! with `,`-separated alternatives when a feature carries more than one
//! value. This module converts between that string form and a structured
//! mapping, and fuses mappings across several tokens while keeping value
//! multiplicity.

use rustc_hash::FxHashMap;

/// The CoNLL-U marker for an underspecified field.
pub const UNSPECIFIED: &str = "_";

const FEATURE_SEP: char = '|';
const VALUE_SEP: char = '=';
const INNER_SEP: char = ',';

/// A decoded feature mapping: feature name to one or more values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features {
    map: FxHashMap<String, Vec<String>>,
}

/// Multiplicity of values observed for one feature.
pub type ValueCounts = FxHashMap<String, usize>;

/// The result of fusing several feature mappings: feature name to the
/// multiset of values seen across the inputs.
pub type FusedFeatures = FxHashMap<String, ValueCounts>;

impl Features {
    /// Create an empty feature mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a feature string.
    ///
    /// Fragments without a `=` separator are dropped; faulty annotation is
    /// common enough that downstream counts just tolerate sparse morphology.
    /// The `_` marker decodes to an empty mapping.
    pub fn decode(text: &str) -> Self {
        let mut feats = Self::new();

        if text == UNSPECIFIED {
            return feats;
        }

        for fragment in text.split(FEATURE_SEP) {
            if fragment == UNSPECIFIED {
                continue;
            }
            if let Some((name, values)) = fragment.split_once(VALUE_SEP) {
                feats.map.insert(
                    name.to_string(),
                    values.split(INNER_SEP).map(str::to_string).collect(),
                );
            }
        }

        feats
    }

    /// Encode back to string form.
    ///
    /// Names are sorted case-insensitively and values are sorted within each
    /// feature, so the output is canonical regardless of input order. A
    /// mapping with no (non-empty) values encodes to `_`: feature names
    /// without values mean the morphology is simply not annotated.
    pub fn encode(&self) -> String {
        let mut entries: Vec<(&String, &Vec<String>)> =
            self.map.iter().filter(|(_, values)| !values.is_empty()).collect();

        if entries.is_empty() {
            return UNSPECIFIED.to_string();
        }

        entries.sort_by(|a, b| {
            let (ka, kb) = (a.0.to_lowercase(), b.0.to_lowercase());
            ka.cmp(&kb).then_with(|| a.0.cmp(b.0))
        });

        entries
            .into_iter()
            .map(|(name, values)| {
                let mut values: Vec<&str> = values.iter().map(String::as_str).collect();
                values.sort_unstable();
                format!("{}{}{}", name, VALUE_SEP, values.join(","))
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Set the values of a feature, replacing any previous ones.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.map.insert(name.into(), values);
    }

    /// The values of a feature, if present.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.map.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Iterate over `(name, values)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.map.iter()
    }
}

/// Fuse several feature mappings into one, counting repeated values.
///
/// `Polarity=Neg` seen twice is not the same datum as seen once, so the
/// fusion keeps a multiset per feature instead of a plain union.
pub fn fuse<'a, I>(mappings: I) -> FusedFeatures
where
    I: IntoIterator<Item = &'a Features>,
{
    let mut fusion = FusedFeatures::default();

    for feats in mappings {
        for (name, values) in feats.iter() {
            let counts = fusion.entry(name.clone()).or_default();
            for value in values {
                *counts.entry(value.clone()).or_insert(0) += 1;
            }
        }
    }

    fusion
}
