use std::collections::{BTreeMap, HashMap};

/// Query parameters appended to a request URL.
///
/// Pairs are encoded in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn pair(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.push((key.into(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<()> for QueryParams {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

impl<K, V> From<Vec<(K, V)>> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V, S> From<HashMap<K, V, S>> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from(map: HashMap<K, V, S>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V> From<BTreeMap<K, V>> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::QueryParams;

    #[test]
    fn from_array_keeps_order() {
        let params: QueryParams = [("b", 2), ("a", 1)].into();
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1")]);
    }

    #[test]
    fn builder_appends_pairs() {
        let params = QueryParams::new().pair("page", 3).pair("q", "rust lang");
        assert_eq!(params.len(), 2);
        assert!(!params.is_empty());
    }

    #[test]
    fn unit_is_empty() {
        let params: QueryParams = ().into();
        assert!(params.is_empty());
    }

    #[test]
    fn from_btree_map() {
        let map = BTreeMap::from([("limit", 10), ("offset", 20)]);
        let params = QueryParams::from(map);
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("limit", "10"), ("offset", "20")]);
    }
}
