use crate::timer::{Timer, TimerError};

/// Wraps a callable so every invocation runs inside one timer's
/// start/stop cycle.
///
/// A single [`Timer`] backs every call: repeated invocations keep
/// accumulating under the same name. That also means the wrapped
/// callable must not invoke itself back through this wrapper; a
/// re-entrant cycle trips the double-start rule by contract rather than
/// being silently tolerated.
pub struct TimedFn<'r, F> {
    timer: Timer<'r>,
    func: F,
}

impl<'r, F> TimedFn<'r, F> {
    pub fn new(timer: Timer<'r>, func: F) -> Self {
        Self { timer, func }
    }

    /// Runs the wrapped callable inside a scoped cycle, forwarding its
    /// input and output unchanged. Multi-argument callables take a
    /// tuple.
    pub fn call<I, O>(&mut self, input: I) -> Result<O, TimerError>
    where
        F: FnMut(I) -> O,
    {
        let scope = self.timer.scope()?;
        let output = (self.func)(input);
        scope.finish()?;
        Ok(output)
    }

    pub fn timer(&self) -> &Timer<'r> {
        &self.timer
    }

    pub fn into_timer(self) -> Timer<'r> {
        self.timer
    }
}
