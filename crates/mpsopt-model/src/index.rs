//! Index tuples for variable and constraint groups.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Range;

use itertools::Itertools;

/// One component of an index tuple
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Int(i) => write!(f, "{}", i),
            IndexValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        IndexValue::Int(value)
    }
}

impl From<i32> for IndexValue {
    fn from(value: i32) -> Self {
        IndexValue::Int(i64::from(value))
    }
}

impl From<usize> for IndexValue {
    fn from(value: usize) -> Self {
        IndexValue::Int(value as i64)
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        IndexValue::Str(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        IndexValue::Str(value)
    }
}

/// A full index tuple, e.g. `(0, "a")`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey(pub Vec<IndexValue>);

impl IndexKey {
    pub fn values(&self) -> &[IndexValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Member name for this key under a group prefix: `prefix[i,j]`
    pub fn member_name(&self, prefix: &str) -> String {
        format!("{}[{}]", prefix, self)
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

impl From<IndexValue> for IndexKey {
    fn from(value: IndexValue) -> Self {
        IndexKey(vec![value])
    }
}

impl From<Vec<IndexValue>> for IndexKey {
    fn from(values: Vec<IndexValue>) -> Self {
        IndexKey(values)
    }
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        IndexKey(vec![value.into()])
    }
}

impl From<i32> for IndexKey {
    fn from(value: i32) -> Self {
        IndexKey(vec![value.into()])
    }
}

impl From<usize> for IndexKey {
    fn from(value: usize) -> Self {
        IndexKey(vec![value.into()])
    }
}

impl From<&str> for IndexKey {
    fn from(value: &str) -> Self {
        IndexKey(vec![value.into()])
    }
}

impl From<String> for IndexKey {
    fn from(value: String) -> Self {
        IndexKey(vec![value.into()])
    }
}

impl<A: Into<IndexValue>, B: Into<IndexValue>> From<(A, B)> for IndexKey {
    fn from((a, b): (A, B)) -> Self {
        IndexKey(vec![a.into(), b.into()])
    }
}

impl<A: Into<IndexValue>, B: Into<IndexValue>, C: Into<IndexValue>> From<(A, B, C)> for IndexKey {
    fn from((a, b, c): (A, B, C)) -> Self {
        IndexKey(vec![a.into(), b.into(), c.into()])
    }
}

/// The values one index position ranges over
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexSource(Vec<IndexValue>);

impl IndexSource {
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<IndexValue>,
    {
        IndexSource(values.into_iter().map(Into::into).collect())
    }

    /// `0..count`
    pub fn count(count: usize) -> Self {
        Self::new(0..count)
    }

    /// Keys of a mapping, in the mapping's iteration order
    pub fn keys_of<K, V>(map: &BTreeMap<K, V>) -> Self
    where
        K: Clone + Into<IndexValue>,
    {
        Self::new(map.keys().cloned())
    }

    /// Keys of a hash map, sorted so that the order is reproducible
    pub fn sorted_keys_of<K, V>(map: &HashMap<K, V>) -> Self
    where
        K: Clone + Into<IndexValue>,
    {
        let mut values: Vec<IndexValue> = map.keys().cloned().map(Into::into).collect();
        values.sort();
        IndexSource(values)
    }

    pub fn values(&self) -> &[IndexValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Range<i64>> for IndexSource {
    fn from(range: Range<i64>) -> Self {
        IndexSource::new(range)
    }
}

impl From<Range<usize>> for IndexSource {
    fn from(range: Range<usize>) -> Self {
        IndexSource::new(range)
    }
}

impl From<Vec<&str>> for IndexSource {
    fn from(values: Vec<&str>) -> Self {
        IndexSource::new(values)
    }
}

impl From<Vec<String>> for IndexSource {
    fn from(values: Vec<String>) -> Self {
        IndexSource::new(values)
    }
}

impl From<Vec<i64>> for IndexSource {
    fn from(values: Vec<i64>) -> Self {
        IndexSource::new(values)
    }
}

/// Every index tuple of the Cartesian product, first source varying slowest
pub fn product(sources: &[IndexSource]) -> Vec<IndexKey> {
    if sources.is_empty() {
        return Vec::new();
    }
    sources
        .iter()
        .map(|s| s.0.iter().cloned())
        .multi_cartesian_product()
        .map(IndexKey)
        .collect()
}

/// A filter on one index position
#[derive(Debug, Clone, PartialEq)]
pub enum IndexPattern {
    /// `*`: any value
    Any,
    Is(IndexValue),
    OneOf(Vec<IndexValue>),
}

impl IndexPattern {
    pub fn is<V: Into<IndexValue>>(value: V) -> Self {
        IndexPattern::Is(value.into())
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<IndexValue>,
    {
        IndexPattern::OneOf(values.into_iter().map(Into::into).collect())
    }

    fn matches(&self, value: &IndexValue) -> bool {
        match self {
            IndexPattern::Any => true,
            IndexPattern::Is(v) => v == value,
            IndexPattern::OneOf(vs) => vs.contains(value),
        }
    }
}

/// Whether `key` is selected by `pattern`; positions past the pattern match anything
pub fn matches(key: &IndexKey, pattern: &[IndexPattern]) -> bool {
    key.0
        .iter()
        .zip(pattern)
        .all(|(value, p)| p.matches(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_order() {
        let keys = product(&[IndexSource::count(2), IndexSource::from(vec!["a", "b"])]);
        let names: Vec<String> = keys.iter().map(|k| k.member_name("z")).collect();
        assert_eq!(names, vec!["z[0,a]", "z[0,b]", "z[1,a]", "z[1,b]"]);
    }

    #[test]
    fn test_product_with_empty_source() {
        assert!(product(&[IndexSource::count(3), IndexSource::default()]).is_empty());
        assert!(product(&[]).is_empty());
    }

    #[test]
    fn test_key_conversions() {
        assert_eq!(IndexKey::from(3), IndexKey(vec![IndexValue::Int(3)]));
        assert_eq!(
            IndexKey::from((1, "b")),
            IndexKey(vec![IndexValue::Int(1), IndexValue::Str("b".to_string())])
        );
        assert_eq!(IndexKey::from("Period1").to_string(), "Period1");
    }

    #[test]
    fn test_keys_of_mapping() {
        let mut demand = BTreeMap::new();
        demand.insert("west".to_string(), 10.0);
        demand.insert("east".to_string(), 5.0);
        let source = IndexSource::keys_of(&demand);
        assert_eq!(source.values(), &[IndexValue::from("east"), IndexValue::from("west")]);
    }

    #[test]
    fn test_pattern_matching() {
        let key = IndexKey::from((1, "a"));
        assert!(matches(&key, &[IndexPattern::Any, IndexPattern::is("a")]));
        assert!(matches(&key, &[IndexPattern::one_of([0, 1])]));
        assert!(!matches(&key, &[IndexPattern::is(0), IndexPattern::Any]));
    }
}
