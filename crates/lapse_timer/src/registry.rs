use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

static GLOBAL_TIMER_REGISTRY: Lazy<TimerRegistry> = Lazy::new(TimerRegistry::default);

#[derive(Default)]
struct Counters {
    /// Timers currently running, across every instance using this
    /// registry. Read as the indentation depth for new labels.
    active: usize,
    /// Advances once per timer construction; mints anonymous names.
    sequence: u64,
}

/// Shared bookkeeping behind every [`crate::Timer`].
///
/// Holds the accumulated rendered text per timer name, the
/// most-recent-first completion log, and the counters driving label
/// indentation and anonymous naming. The counters move only through
/// the registry's own operations, never directly.
#[derive(Default)]
pub struct TimerRegistry {
    counters: RwLock<Counters>,
    accumulated: RwLock<AHashMap<String, String>>,
    completion_log: RwLock<Vec<String>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry, used by timers constructed
    /// without an explicit one.
    pub fn global() -> &'static TimerRegistry {
        &GLOBAL_TIMER_REGISTRY
    }

    /// Number of timers currently running in this registry.
    pub fn active_count(&self) -> usize {
        self.counters.read().active
    }

    /// Advances the construction sequence, returning the value just
    /// consumed. Consumed values are never reused.
    pub(crate) fn next_sequence(&self) -> u64 {
        let mut counters = self.counters.write();
        let sequence = counters.sequence;
        counters.sequence += 1;
        sequence
    }

    pub(crate) fn on_start(&self) {
        self.counters.write().active += 1;
    }

    pub(crate) fn on_stop(&self) {
        let mut counters = self.counters.write();
        counters.active = counters.active.saturating_sub(1);
    }

    /// Ensures `name` has an accumulated-text entry, empty if new.
    pub(crate) fn register_name(&self, name: &str) {
        self.accumulated.write().entry(name.to_owned()).or_default();
    }

    /// Records one completed cycle: appends `rendered` under `name` and
    /// pushes the substituted label line onto the front of the
    /// completion log.
    pub(crate) fn record(&self, name: &str, rendered: &str, line: String) {
        self.accumulated
            .write()
            .entry(name.to_owned())
            .or_default()
            .push_str(rendered);
        self.completion_log.write().insert(0, line);
    }

    /// Concatenation of every rendered duration ever recorded under
    /// `name`, or `None` for a name no timer was constructed with.
    pub fn accumulated(&self, name: &str) -> Option<String> {
        self.accumulated.read().get(name).cloned()
    }

    /// Snapshot of the completion log, most recently completed cycle
    /// first. The log itself is left intact.
    pub fn completion_log(&self) -> Vec<String> {
        self.completion_log.read().clone()
    }

    /// Feeds every completion-log line to `sink`, most recent first.
    pub fn report(&self, mut sink: impl FnMut(&str)) {
        for line in self.completion_log.read().iter() {
            sink(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_registered_without_running_have_empty_text() {
        let registry = TimerRegistry::new();
        registry.register_name("idle");
        assert_eq!(registry.accumulated("idle"), Some(String::new()));
        assert_eq!(registry.accumulated("unknown"), None);
    }

    #[test]
    fn sequence_values_are_never_reused() {
        let registry = TimerRegistry::new();
        assert_eq!(registry.next_sequence(), 0);
        assert_eq!(registry.next_sequence(), 1);
        assert_eq!(registry.next_sequence(), 2);
    }

    #[test]
    fn record_accumulates_and_prepends() {
        let registry = TimerRegistry::new();
        registry.register_name("job");
        registry.record("job", "  10ms", "first".to_owned());
        registry.record("job", "  20ms", "second".to_owned());

        assert_eq!(registry.accumulated("job").unwrap(), "  10ms  20ms");
        assert_eq!(registry.completion_log(), vec!["second", "first"]);
    }

    #[test]
    fn report_walks_most_recent_first() {
        let registry = TimerRegistry::new();
        registry.record("a", "x", "older".to_owned());
        registry.record("a", "y", "newer".to_owned());

        let mut seen = Vec::new();
        registry.report(|line| seen.push(line.to_owned()));
        assert_eq!(seen, vec!["newer", "older"]);

        // Reporting does not drain the log.
        assert_eq!(registry.completion_log().len(), 2);
    }
}
