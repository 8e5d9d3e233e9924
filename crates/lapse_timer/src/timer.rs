use std::time::{Duration, Instant};

use thiserror::Error;

use lapse_format::{FormatError, Template, format_duration_default};

use crate::registry::TimerRegistry;

/// Errors from driving a [`Timer`] out of order, or from a malformed
/// render template surfacing at stop time.
///
/// The state variants are programming errors at the call site; they are
/// never auto-corrected and a failed measurement is not retried.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer \"{0}\" is already running")]
    AlreadyRunning(String),
    #[error("timer \"{0}\" is not running")]
    NotRunning(String),
    #[error(transparent)]
    Format(#[from] FormatError),
}

type LoggerSink = Box<dyn FnMut(&str)>;

/// A single named stopwatch.
///
/// Construction registers the name with the registry and fixes the
/// label's indentation to the number of timers running *at that moment*;
/// starting later, under a different nesting depth, does not re-indent.
/// Each completed stop renders the elapsed time (through the configured
/// template or [`lapse_format::DEFAULT_TEMPLATE`]), hands the label line
/// to the logger sink if one is set, and publishes both into the
/// registry.
pub struct Timer<'r> {
    registry: &'r TimerRegistry,
    name: String,
    label: String,
    logger: Option<LoggerSink>,
    template: Option<String>,
    running: Option<Instant>,
}

impl Timer<'static> {
    /// An anonymous timer (`block_<n>`) on the global registry.
    pub fn new() -> Self {
        Self::anonymous_in(TimerRegistry::global())
    }

    /// A named timer on the global registry.
    pub fn named(name: impl Into<String>) -> Self {
        Self::named_in(TimerRegistry::global(), name)
    }
}

impl Default for Timer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Timer<'r> {
    /// An anonymous timer (`block_<n>`) on `registry`.
    pub fn anonymous_in(registry: &'r TimerRegistry) -> Self {
        let sequence = registry.next_sequence();
        Self::build(registry, format!("block_{sequence}"))
    }

    /// A named timer on `registry`. The construction sequence advances
    /// even though the minted name goes unused.
    pub fn named_in(registry: &'r TimerRegistry, name: impl Into<String>) -> Self {
        registry.next_sequence();
        Self::build(registry, name.into())
    }

    fn build(registry: &'r TimerRegistry, name: String) -> Self {
        registry.register_name(&name);
        let depth = registry.active_count();
        let label = format!("{}block \"{name}\": {{}}", "\t".repeat(depth));
        Timer {
            registry,
            name,
            label,
            logger: None,
            template: None,
            running: None,
        }
    }

    /// Sets the render template used at stop time. A malformed template
    /// is reported by [`Timer::stop`], not here.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Sets the sink that receives the substituted label line on every
    /// stop. The core writes nowhere else.
    pub fn with_logger(mut self, logger: impl FnMut(&str) + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The label line with its `{}` placeholder still unsubstituted.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn registry(&self) -> &'r TimerRegistry {
        self.registry
    }

    /// Begins a cycle. The registry's active count moves only after the
    /// state check passes, so a double start cannot skew it.
    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.running.is_some() {
            return Err(TimerError::AlreadyRunning(self.name.clone()));
        }
        self.registry.on_start();
        self.running = Some(Instant::now());
        Ok(())
    }

    /// Ends the cycle, returning the rendered elapsed time.
    ///
    /// Publishes into the registry and invokes the logger sink. A
    /// malformed render template surfaces here as
    /// [`TimerError::Format`]; the cycle is still over at that point and
    /// nothing is recorded for it.
    pub fn stop(&mut self) -> Result<String, TimerError> {
        let Some(started) = self.running.take() else {
            return Err(TimerError::NotRunning(self.name.clone()));
        };
        self.registry.on_stop();
        let elapsed = started.elapsed();
        let rendered = self.render(elapsed)?;
        let line = self.label.replacen("{}", &rendered, 1);
        if let Some(logger) = self.logger.as_mut() {
            logger(&line);
        }
        self.registry.record(&self.name, &rendered, line);
        Ok(rendered)
    }

    /// Starts a scoped region; the timer stops when the guard is
    /// finished or dropped.
    pub fn scope(&mut self) -> Result<ScopedTimer<'_, 'r>, TimerError> {
        self.start()?;
        Ok(ScopedTimer {
            timer: self,
            finished: false,
        })
    }

    /// Runs `f` inside one scoped cycle, forwarding its output
    /// unchanged. A panic in `f` still stops the timer on the way out.
    pub fn time<T>(&mut self, f: impl FnOnce() -> T) -> Result<T, TimerError> {
        let scope = self.scope()?;
        let output = f();
        scope.finish()?;
        Ok(output)
    }

    fn render(&self, elapsed: Duration) -> Result<String, FormatError> {
        match &self.template {
            Some(template) => Ok(Template::parse(template)?.render(elapsed)),
            None => Ok(format_duration_default(elapsed)),
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, by: Duration) {
        if let Some(started) = self.running.as_mut() {
            *started -= by;
        }
    }
}

/// Region guard produced by [`Timer::scope`]; the timer runs for
/// exactly as long as this guard lives.
pub struct ScopedTimer<'t, 'r> {
    timer: &'t mut Timer<'r>,
    finished: bool,
}

impl ScopedTimer<'_, '_> {
    /// Stops the timer, returning the rendered elapsed time.
    pub fn finish(mut self) -> Result<String, TimerError> {
        self.finished = true;
        self.timer.stop()
    }
}

impl Drop for ScopedTimer<'_, '_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Unwinding path: the stop must still happen, but its own
        // failure cannot propagate out of drop.
        if let Err(err) = self.timer.stop() {
            tracing::warn!("timer \"{}\" failed to stop cleanly: {err}", self.timer.name);
        }
    }
}
