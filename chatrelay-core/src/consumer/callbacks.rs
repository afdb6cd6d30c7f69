//! Callbacks through which the consumer reports progress

/// Receives the progress of one stream.
///
/// `on_completing` gets the full text accumulated so far, so a caller can
/// replace what it displays rather than append to it. `on_completed` is
/// called exactly once per stream, whether it finished, failed or was
/// cancelled.
pub trait CompletionCallbacks: Send + Sync {
    fn on_completing(&self, text: &str);

    fn on_completed(&self);
}

/// [`CompletionCallbacks`] built from a pair of closures
pub struct FnCallbacks<C, D> {
    on_completing: C,
    on_completed: D,
}

impl<C, D> FnCallbacks<C, D>
where
    C: Fn(&str) + Send + Sync,
    D: Fn() + Send + Sync,
{
    pub fn new(on_completing: C, on_completed: D) -> Self {
        Self {
            on_completing,
            on_completed,
        }
    }
}

impl<C, D> CompletionCallbacks for FnCallbacks<C, D>
where
    C: Fn(&str) + Send + Sync,
    D: Fn() + Send + Sync,
{
    fn on_completing(&self, text: &str) {
        (self.on_completing)(text)
    }

    fn on_completed(&self) {
        (self.on_completed)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fn_callbacks_forward() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicUsize::new(0));

        let callbacks = {
            let seen = seen.clone();
            let done = done.clone();
            FnCallbacks::new(
                move |text: &str| seen.lock().unwrap().push(text.to_string()),
                move || {
                    done.fetch_add(1, Ordering::SeqCst);
                },
            )
        };

        callbacks.on_completing("a");
        callbacks.on_completing("ab");
        callbacks.on_completed();

        assert_eq!(*seen.lock().unwrap(), vec!["a", "ab"]);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
