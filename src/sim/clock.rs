/// Counts the generated ticks of a headless run.
///
/// Yields step indices `0..total` as an iterator; [`Clock::run`] calls a
/// closure once per remaining step.
///
/// # Examples
///
/// ```
/// use smart_ems::sim::clock::Clock;
///
/// let mut clock = Clock::new(3);
/// assert_eq!(clock.next(), Some(0));
/// assert_eq!(clock.remaining(), 2);
///
/// let mut steps = Vec::new();
/// clock.run(|step| steps.push(step));
/// assert_eq!(steps, vec![1, 2]);
/// assert!(clock.is_finished());
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    next: usize,
    total: usize,
}

impl Clock {
    /// Creates a clock that will hand out `total` steps.
    pub fn new(total: usize) -> Self {
        Self { next: 0, total }
    }

    /// Steps not yet handed out.
    pub fn remaining(&self) -> usize {
        self.total - self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.total
    }

    /// Calls `f` with every remaining step index.
    pub fn run(&mut self, mut f: impl FnMut(usize)) {
        for step in self.by_ref() {
            f(step);
        }
    }
}

impl Iterator for Clock {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.is_finished() {
            return None;
        }
        let step = self.next;
        self.next += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ExactSizeIterator for Clock {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_each_step_once() {
        let steps: Vec<usize> = Clock::new(4).collect();
        assert_eq!(steps, vec![0, 1, 2, 3]);
    }

    #[test]
    fn remaining_counts_down() {
        let mut clock = Clock::new(2);
        assert_eq!(clock.len(), 2);
        clock.next();
        assert_eq!(clock.remaining(), 1);
        clock.next();
        assert!(clock.is_finished());
        assert_eq!(clock.next(), None);
    }

    #[test]
    fn zero_step_clock_never_runs() {
        let mut clock = Clock::new(0);
        let mut called = false;
        clock.run(|_| called = true);
        assert!(!called);
        assert!(clock.is_finished());
    }
}
