//! Progress accounting for the mutation pass.

/// Processed units out of a precomputed total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Start at zero out of `total`.
    pub fn new(total: usize) -> Self {
        Self {
            processed: 0,
            total,
        }
    }

    /// Move the cursor forward by one unit. Never passes `total`.
    pub fn advance(&mut self) {
        if self.processed < self.total {
            self.processed += 1;
        }
    }

    /// Fraction in `[0.0, 1.0]`. An empty document is complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Receives progress updates, e.g. to drive a progress bar.
pub trait ProgressObserver {
    fn update(&mut self, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: FnMut(Progress),
{
    fn update(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Observer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn update(&mut self, _progress: Progress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let mut progress = Progress::new(4);
        assert_eq!(progress.fraction(), 0.0);
        progress.advance();
        assert_eq!(progress.fraction(), 0.25);
        for _ in 0..10 {
            progress.advance();
        }
        assert_eq!(progress.processed, 4);
        assert_eq!(progress.fraction(), 1.0);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_empty_document_is_complete() {
        let progress = Progress::new(0);
        assert_eq!(progress.fraction(), 1.0);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |p: Progress| seen.push(p.processed);
            observer.update(Progress { processed: 1, total: 2 });
            observer.update(Progress { processed: 2, total: 2 });
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
