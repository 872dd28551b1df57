//! Scripted `FeatureSource` double with call recording and release gates.
//!
//! Each call pops the next scripted response for its operation; an empty
//! script answers with empty data. A response pushed with a gate is held
//! until the test opens the gate, which lets suites finish requests in any
//! order they choose.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{Notify, watch};

use crate::domain::ports::{FeatureSource, FeatureSourceError};
use crate::domain::{
    ArrondissementRef, FeatureCollection, FeatureKind, FeatureQuery, LngLat, Zonage,
};

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCall {
    /// `fetch_features`.
    Features(FeatureKind, FeatureQuery),
    /// `zonage_at_point`.
    ZonageAtPoint(LngLat),
    /// `zone_codes`.
    ZoneCodes(String),
    /// `arrondissement_names`.
    ArrondissementNames,
    /// `arrondissement_refs`.
    ArrondissementRefs,
    /// `admin_boundaries`.
    AdminBoundaries,
}

/// Handle releasing one held response.
#[derive(Debug, Clone, Default)]
pub struct Gate(Arc<Notify>);

impl Gate {
    /// Let the held response complete. Opening before the call arrives is
    /// remembered.
    pub fn open(&self) {
        self.0.notify_one();
    }

    async fn wait(&self) {
        self.0.notified().await;
    }
}

struct Scripted<T> {
    result: Result<T, FeatureSourceError>,
    gate: Option<Gate>,
}

type Script<T> = Mutex<VecDeque<Scripted<T>>>;

/// Scripted data service.
pub struct ScriptedFeatureSource {
    features: Mutex<BTreeMap<FeatureKind, VecDeque<Scripted<FeatureCollection>>>>,
    zonage: Script<Option<Zonage>>,
    zone_codes: Script<Vec<String>>,
    names: Script<Vec<String>>,
    refs: Script<Vec<ArrondissementRef>>,
    boundaries: Script<FeatureCollection>,
    calls: Mutex<Vec<SourceCall>>,
    call_count: watch::Sender<usize>,
}

impl Default for ScriptedFeatureSource {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("scripted source mutex poisoned"),
    }
}

fn push<T>(script: &Script<T>, result: Result<T, FeatureSourceError>, gated: bool) -> Option<Gate> {
    let gate = gated.then(Gate::default);
    lock(script).push_back(Scripted {
        result,
        gate: gate.clone(),
    });
    gate
}

async fn answer<T: Default>(next: Option<Scripted<T>>) -> Result<T, FeatureSourceError> {
    match next {
        None => Ok(T::default()),
        Some(Scripted { result, gate }) => {
            if let Some(held) = gate {
                held.wait().await;
            }
            result
        }
    }
}

impl ScriptedFeatureSource {
    /// Source with empty scripts.
    pub fn new() -> Self {
        let (call_count, _) = watch::channel(0);
        Self {
            features: Mutex::new(BTreeMap::new()),
            zonage: Mutex::new(VecDeque::new()),
            zone_codes: Mutex::new(VecDeque::new()),
            names: Mutex::new(VecDeque::new()),
            refs: Mutex::new(VecDeque::new()),
            boundaries: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            call_count,
        }
    }

    fn push_features_inner(
        &self,
        kind: FeatureKind,
        result: Result<FeatureCollection, FeatureSourceError>,
        gated: bool,
    ) -> Option<Gate> {
        let gate = gated.then(Gate::default);
        lock(&self.features)
            .entry(kind)
            .or_default()
            .push_back(Scripted {
                result,
                gate: gate.clone(),
            });
        gate
    }

    /// Queue the next `fetch_features` answer for `kind`.
    pub fn push_features(
        &self,
        kind: FeatureKind,
        result: Result<FeatureCollection, FeatureSourceError>,
    ) {
        self.push_features_inner(kind, result, false);
    }

    /// Queue a held `fetch_features` answer for `kind`.
    pub fn push_gated_features(
        &self,
        kind: FeatureKind,
        result: Result<FeatureCollection, FeatureSourceError>,
    ) -> Gate {
        self.push_features_inner(kind, result, true)
            .unwrap_or_default()
    }

    /// Queue the next `zonage_at_point` answer.
    pub fn push_zonage(&self, result: Result<Option<Zonage>, FeatureSourceError>) {
        push(&self.zonage, result, false);
    }

    /// Queue a held `zonage_at_point` answer.
    pub fn push_gated_zonage(&self, result: Result<Option<Zonage>, FeatureSourceError>) -> Gate {
        push(&self.zonage, result, true).unwrap_or_default()
    }

    /// Queue the next `zone_codes` answer.
    pub fn push_zone_codes(&self, result: Result<Vec<String>, FeatureSourceError>) {
        push(&self.zone_codes, result, false);
    }

    /// Queue a held `zone_codes` answer.
    pub fn push_gated_zone_codes(&self, result: Result<Vec<String>, FeatureSourceError>) -> Gate {
        push(&self.zone_codes, result, true).unwrap_or_default()
    }

    /// Queue the next `arrondissement_names` answer.
    pub fn push_arrondissement_names(&self, result: Result<Vec<String>, FeatureSourceError>) {
        push(&self.names, result, false);
    }

    /// Queue the next `arrondissement_refs` answer.
    pub fn push_arrondissement_refs(
        &self,
        result: Result<Vec<ArrondissementRef>, FeatureSourceError>,
    ) {
        push(&self.refs, result, false);
    }

    /// Queue the next `admin_boundaries` answer.
    pub fn push_admin_boundaries(&self, result: Result<FeatureCollection, FeatureSourceError>) {
        push(&self.boundaries, result, false);
    }

    /// Every call so far, in arrival order.
    pub fn calls(&self) -> Vec<SourceCall> {
        lock(&self.calls).clone()
    }

    /// Feature queries issued for `kind`, in arrival order.
    pub fn feature_queries(&self, kind: FeatureKind) -> Vec<FeatureQuery> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                SourceCall::Features(called, query) if *called == kind => Some(query.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&SourceCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| predicate(call)).count()
    }

    /// Wait until at least `count` calls have arrived.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut receiver = self.call_count.subscribe();
        if receiver.wait_for(|seen| *seen >= count).await.is_err() {
            panic!("scripted source dropped while waiting for calls");
        }
    }

    fn record(&self, call: SourceCall) {
        let total = {
            let mut calls = lock(&self.calls);
            calls.push(call);
            calls.len()
        };
        self.call_count.send_replace(total);
    }

    fn next<T>(script: &Script<T>) -> Option<Scripted<T>> {
        lock(script).pop_front()
    }
}

#[async_trait]
impl FeatureSource for ScriptedFeatureSource {
    async fn fetch_features(
        &self,
        kind: FeatureKind,
        query: &FeatureQuery,
    ) -> Result<FeatureCollection, FeatureSourceError> {
        self.record(SourceCall::Features(kind, query.clone()));
        let next = lock(&self.features)
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        answer(next).await
    }

    async fn zonage_at_point(&self, at: LngLat) -> Result<Option<Zonage>, FeatureSourceError> {
        self.record(SourceCall::ZonageAtPoint(at));
        let next = Self::next(&self.zonage);
        answer(next).await
    }

    async fn zone_codes(&self, code3l: &str) -> Result<Vec<String>, FeatureSourceError> {
        self.record(SourceCall::ZoneCodes(code3l.to_owned()));
        let next = Self::next(&self.zone_codes);
        answer(next).await
    }

    async fn arrondissement_names(&self) -> Result<Vec<String>, FeatureSourceError> {
        self.record(SourceCall::ArrondissementNames);
        let next = Self::next(&self.names);
        answer(next).await
    }

    async fn arrondissement_refs(&self) -> Result<Vec<ArrondissementRef>, FeatureSourceError> {
        self.record(SourceCall::ArrondissementRefs);
        let next = Self::next(&self.refs);
        answer(next).await
    }

    async fn admin_boundaries(&self) -> Result<FeatureCollection, FeatureSourceError> {
        self.record(SourceCall::AdminBoundaries);
        let next = Self::next(&self.boundaries);
        answer(next).await
    }
}
