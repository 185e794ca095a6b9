use crate::VersionKey;
use hive2hive_base::{kind_err, Kind, Result};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
struct TupleHistory {
    based_on: BTreeMap<VersionKey, VersionKey>,
    order: BTreeMap<VersionKey, u64>,
    next_seq: u64,
}

/// A version-lineage DAG, one independent instance per DHT tuple `K`
/// (typically `(locationKey, domainKey, contentKey)`). `VersionGraph` is
/// generic over the tuple key so it doesn't need to know the wire shape of
/// the overlay addressing scheme (that lives in hive2hive-net/hive2hive-dht).
#[derive(Clone, Debug, Default)]
pub struct VersionGraph<K: Ord + Clone> {
    tuples: BTreeMap<K, TupleHistory>,
}

impl<K: Ord + Clone> VersionGraph<K> {
    pub fn new() -> Self {
        VersionGraph {
            tuples: BTreeMap::new(),
        }
    }

    /// Records that `version` was created with lineage reference `based_on`.
    /// Rejects: a version recorded twice, and a non-ZERO `based_on` that
    /// hasn't itself been recorded (you can't base a version on a version
    /// that was never created).
    pub fn record(&mut self, tuple: K, version: VersionKey, based_on: VersionKey) -> Result<()> {
        let history = self.tuples.entry(tuple).or_default();
        if history.based_on.contains_key(&version) {
            return Err(kind_err(
                Kind::Other,
                "version already recorded in lineage graph",
            ));
        }
        if !based_on.is_zero() && !history.based_on.contains_key(&based_on) {
            return Err(kind_err(
                Kind::Other,
                "basedOn references a version that does not exist",
            ));
        }
        let seq = history.next_seq;
        history.next_seq += 1;
        history.order.insert(version, seq);
        history.based_on.insert(version, based_on);
        Ok(())
    }

    pub fn contains(&self, tuple: &K, version: VersionKey) -> bool {
        self.tuples
            .get(tuple)
            .map(|h| h.based_on.contains_key(&version))
            .unwrap_or(false)
    }

    pub fn based_on(&self, tuple: &K, version: VersionKey) -> Option<VersionKey> {
        self.tuples.get(tuple)?.based_on.get(&version).copied()
    }

    /// The full lineage of `version`, oldest first, ending with `version`
    /// itself. Does not include the ZERO sentinel.
    pub fn lineage(&self, tuple: &K, version: VersionKey) -> Vec<VersionKey> {
        let mut chain = Vec::new();
        let mut cur = version;
        loop {
            if cur.is_zero() {
                break;
            }
            chain.push(cur);
            match self.based_on(tuple, cur) {
                Some(next) => cur = next,
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    /// Versions in `(from, to]` order by insertion sequence, i.e. every
    /// version recorded strictly after `from` and at or before `to`. `from
    /// == ZERO` means "from the beginning". Matches the half-open interval
    /// of the top-level spec's `removeRange`, read as excluding the
    /// already-superseded `from` endpoint and including `to`.
    pub fn range(&self, tuple: &K, from: VersionKey, to: VersionKey) -> Result<Vec<VersionKey>> {
        let history = match self.tuples.get(tuple) {
            Some(h) => h,
            None => return Ok(Vec::new()),
        };
        let from_seq = if from.is_zero() {
            None
        } else {
            Some(*history.order.get(&from).ok_or_else(|| {
                kind_err(Kind::Other, "range `from` version not in lineage graph")
            })?)
        };
        let to_seq = *history
            .order
            .get(&to)
            .ok_or_else(|| kind_err(Kind::Other, "range `to` version not in lineage graph"))?;
        let mut versions: Vec<(u64, VersionKey)> = history
            .order
            .iter()
            .filter(|(_, &seq)| from_seq.map(|f| seq > f).unwrap_or(true) && seq <= to_seq)
            .map(|(&v, &seq)| (seq, v))
            .collect();
        versions.sort_by_key(|(seq, _)| *seq);
        Ok(versions.into_iter().map(|(_, v)| v).collect())
    }
}
