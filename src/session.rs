use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::Result;
use crate::experience::ExperienceRangeTable;
use crate::filter::{FilterPipeline, FilterState};
use crate::models::{Record, View};
use crate::paginate::{PageItem, Paginator};
use crate::store::{FilterStore, StoreBackend};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Editing,
    Applied,
}

/// Last-write-wins delay: every touch pushes the deadline out.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

pub struct FilterSession<B> {
    view: View,
    pipeline: FilterPipeline,
    records: Vec<Record>,
    filtered: Vec<Record>,
    state: FilterState,
    pager: Paginator,
    phase: Phase,
    debounce: Debouncer,
    store: FilterStore<B>,
}

impl<B: StoreBackend> FilterSession<B> {
    pub fn open(
        view: View,
        records: Vec<Record>,
        store: FilterStore<B>,
        items_per_page: usize,
        debounce: Duration,
    ) -> Result<Self> {
        let state = store.load(view)?;
        let mut session = Self {
            view,
            pipeline: FilterPipeline::new(view.fields(), ExperienceRangeTable::shared()),
            records,
            filtered: Vec::new(),
            state,
            pager: Paginator::new(items_per_page),
            phase: Phase::Idle,
            debounce: Debouncer::new(debounce),
            store,
        };
        session.recompute();
        Ok(session)
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn filtered(&self) -> &[Record] {
        &self.filtered
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pager(&self) -> &Paginator {
        &self.pager
    }

    pub fn store(&self) -> &FilterStore<B> {
        &self.store
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debounce
    }

    pub fn page(&self) -> &[Record] {
        self.pager.slice(&self.filtered)
    }

    pub fn visible_pages(&self) -> Vec<PageItem> {
        self.pager.visible_pages()
    }

    pub fn edit(&mut self, now: Instant, f: impl FnOnce(&mut FilterState)) {
        f(&mut self.state);
        self.phase = Phase::Editing;
        self.debounce.touch(now);
    }

    /// Run a debounced recompute if its deadline passed. Never persists.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.debounce.fire(now) {
            return false;
        }
        self.recompute();
        true
    }

    pub fn update(&mut self, f: impl FnOnce(&mut FilterState)) {
        f(&mut self.state);
        self.debounce.cancel();
        self.recompute();
    }

    pub fn search(&mut self) -> Result<()> {
        self.debounce.cancel();
        self.recompute();
        self.store.save(self.view, &self.state)?;
        info!(view = %self.view, matches = self.filtered.len(), "Search applied");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.debounce.cancel();
        self.state = FilterState::default();
        self.store.clear(self.view)?;
        self.recompute();
        Ok(())
    }

    pub fn replace_records(&mut self, records: Vec<Record>) {
        self.records = records;
        self.recompute();
    }

    pub fn next_page(&mut self) -> bool {
        self.pager.next()
    }

    pub fn prev_page(&mut self) -> bool {
        self.pager.prev()
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.pager.go_to(page)
    }

    fn recompute(&mut self) {
        self.filtered = self.pipeline.apply(&self.records, &self.state);
        self.pager.reset(self.filtered.len());
        self.phase = if self.state.is_empty() {
            Phase::Idle
        } else {
            Phase::Applied
        };
        debug!(
            view = %self.view,
            total = self.records.len(),
            matches = self.filtered.len(),
            "Filters applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CookieJar;
    use serde_json::json;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let title = if i % 2 == 0 { "Registered Nurse" } else { "Carer" };
                Record::from(json!({"id": i, "title": title, "maxPay": (30 + i).to_string()}))
            })
            .collect()
    }

    fn session(n: usize) -> FilterSession<CookieJar> {
        FilterSession::open(
            View::Jobs,
            records(n),
            FilterStore::new(CookieJar::in_memory()),
            10,
            DEFAULT_DEBOUNCE,
        )
        .unwrap()
    }

    #[test]
    fn test_opens_idle_with_everything() {
        let s = session(25);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.filtered().len(), 25);
        assert_eq!(s.pager().total_pages(), 3);
        assert_eq!(s.page().len(), 10);
    }

    #[test]
    fn test_typing_waits_for_debounce() {
        let mut s = session(25);
        let t0 = Instant::now();
        s.edit(t0, |f| f.search = "carer".to_string());
        assert_eq!(s.phase(), Phase::Editing);
        assert_eq!(s.filtered().len(), 25);

        assert!(!s.tick(t0 + Duration::from_millis(100)));
        s.edit(t0 + Duration::from_millis(200), |f| f.search = "care".to_string());
        // The second keystroke pushed the deadline out.
        assert!(!s.tick(t0 + Duration::from_millis(350)));
        assert!(s.tick(t0 + Duration::from_millis(500)));

        assert_eq!(s.phase(), Phase::Applied);
        assert_eq!(s.filtered().len(), 12);
        assert!(!s.tick(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_debounced_pass_does_not_persist() {
        let mut s = session(5);
        let t0 = Instant::now();
        s.edit(t0, |f| f.search = "nurse".to_string());
        s.tick(t0 + DEFAULT_DEBOUNCE);
        assert!(s.store().backend().is_empty());

        s.search().unwrap();
        assert_eq!(s.store().load(View::Jobs).unwrap().search, "nurse");
    }

    #[test]
    fn test_recompute_resets_page() {
        let mut s = session(25);
        assert!(s.next_page());
        assert!(s.next_page());
        assert_eq!(s.pager().current_page(), 3);

        s.update(|f| f.pay_rate = 40.0);
        assert_eq!(s.pager().current_page(), 1);
        assert_eq!(s.filtered().len(), 15);
    }

    #[test]
    fn test_clear_restores_everything() {
        let mut s = session(25);
        s.update(|f| {
            f.search = "rn".to_string();
            f.pay_rate = 35.0;
            f.shifts.insert("Night".to_string());
        });
        s.search().unwrap();
        s.go_to_page(1);
        assert!(s.filtered().is_empty());

        s.clear().unwrap();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.filtered(), s.records());
        assert_eq!(s.pager().current_page(), 1);
        assert!(s.store().backend().is_empty());
    }

    #[test]
    fn test_stored_filters_apply_on_open() {
        let mut store = FilterStore::new(CookieJar::in_memory());
        let state = FilterState {
            pay_rate: 50.0,
            ..Default::default()
        };
        store.save(View::Jobs, &state).unwrap();

        let s = FilterSession::open(View::Jobs, records(25), store, 10, DEFAULT_DEBOUNCE).unwrap();
        assert_eq!(s.phase(), Phase::Applied);
        assert_eq!(s.filtered().len(), 5);
    }

    #[test]
    fn test_replace_records_keeps_filters() {
        let mut s = session(25);
        s.update(|f| f.search = "carer".to_string());
        assert_eq!(s.filtered().len(), 12);
        s.replace_records(records(4));
        assert_eq!(s.filtered().len(), 2);
        assert_eq!(s.pager().current_page(), 1);
    }

    #[test]
    fn test_debouncer_fires_once() {
        let mut d = Debouncer::new(Duration::from_millis(250));
        let t0 = Instant::now();
        assert!(!d.fire(t0));
        d.touch(t0);
        assert_eq!(d.remaining(t0), Some(Duration::from_millis(250)));
        assert!(d.fire(t0 + Duration::from_millis(250)));
        assert!(!d.fire(t0 + Duration::from_millis(500)));
        assert_eq!(d.remaining(t0), None);
    }

    #[test]
    fn test_search_persists_without_records() {
        let mut s = session(0);
        s.update(|f| f.location = "Darwin".to_string());
        assert!(s.filtered().is_empty());
        s.search().unwrap();
        assert_eq!(s.store().load(View::Jobs).unwrap().location, "Darwin");
    }
}
