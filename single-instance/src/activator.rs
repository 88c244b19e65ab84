//! Helper for raising the primary instance's window when another launch is
//! detected.

use std::sync::Weak;

/// Window or surface of the host application. Only called on the context
/// that owns the surface, through a [`Dispatcher`].
pub trait Surface {
    fn is_minimized(&self) -> bool;

    /// Brings a minimized surface back to its normal state
    fn restore(&self);

    fn is_always_on_top(&self) -> bool;

    fn set_always_on_top(&self, on_top: bool);
}

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on the execution context that owns a [`Surface`], e.g. the UI
/// thread
pub trait Dispatcher {
    fn dispatch(&self, job: Job);
}

impl<F> Dispatcher for F
where
    F: Fn(Job),
{
    fn dispatch(&self, job: Job) {
        self(job)
    }
}

/// Runs the job right away, for hosts that already receive notifications on
/// the owning context
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Dispatcher for Inline {
    fn dispatch(&self, job: Job) {
        job()
    }
}

/// Returns a callback that brings `surface` to the front, suitable for
/// [`Coordinator::on_attempt_detected`](crate::Coordinator::on_attempt_detected).
///
/// The callback can be invoked from any thread. If the surface has already
/// been dropped it does nothing. A minimized surface is restored first, then
/// always-on-top is switched on and back to its previous value so the
/// surface gets raised once without changing that setting.
pub fn make_activator<S, D>(surface: Weak<S>, dispatcher: D) -> impl Fn() + Send + Sync + 'static
where
    S: Surface + Send + Sync + 'static,
    D: Dispatcher + Send + Sync + 'static,
{
    move || {
        if surface.strong_count() == 0 {
            return;
        }
        let surface = surface.clone();
        dispatcher.dispatch(Box::new(move || {
            if let Some(surface) = surface.upgrade() {
                bring_to_front(&*surface);
            }
        }));
    }
}

fn bring_to_front(surface: &impl Surface) {
    if surface.is_minimized() {
        surface.restore();
    }

    let on_top = surface.is_always_on_top();
    surface.set_always_on_top(true);
    surface.set_always_on_top(on_top);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeWindow {
        minimized: Mutex<bool>,
        on_top: Mutex<bool>,
        // Every value set_always_on_top was called with
        on_top_history: Mutex<Vec<bool>>,
    }

    impl Surface for FakeWindow {
        fn is_minimized(&self) -> bool {
            *self.minimized.lock().unwrap()
        }

        fn restore(&self) {
            *self.minimized.lock().unwrap() = false;
        }

        fn is_always_on_top(&self) -> bool {
            *self.on_top.lock().unwrap()
        }

        fn set_always_on_top(&self, on_top: bool) {
            *self.on_top.lock().unwrap() = on_top;
            self.on_top_history.lock().unwrap().push(on_top);
        }
    }

    #[test]
    fn restores_minimized_window_and_keeps_on_top_flag() {
        let window = Arc::new(FakeWindow::default());
        *window.minimized.lock().unwrap() = true;

        let activate = make_activator(Arc::downgrade(&window), Inline);
        activate();

        assert!(!window.is_minimized());
        assert!(!window.is_always_on_top());
        assert_eq!(*window.on_top_history.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn on_top_window_stays_on_top() {
        let window = Arc::new(FakeWindow::default());
        *window.on_top.lock().unwrap() = true;

        let activate = make_activator(Arc::downgrade(&window), Inline);
        activate();
        activate();

        assert!(window.is_always_on_top());
        assert_eq!(
            *window.on_top_history.lock().unwrap(),
            vec![true, true, true, true]
        );
    }

    #[test]
    fn dropped_window_is_a_no_op() {
        let window = Arc::new(FakeWindow::default());
        let weak = Arc::downgrade(&window);
        drop(window);

        let dispatched = Arc::new(Mutex::new(0));
        let dispatched_ = dispatched.clone();
        let activate = make_activator(weak, move |job: Job| {
            *dispatched_.lock().unwrap() += 1;
            job();
        });
        activate();

        assert_eq!(*dispatched.lock().unwrap(), 0);
    }

    #[test]
    fn runs_on_the_dispatcher_context() {
        let window = Arc::new(FakeWindow::default());
        *window.minimized.lock().unwrap() = true;
        let (sender, mut jobs) = tokio::sync::mpsc::unbounded_channel::<Job>();

        let activate = make_activator(Arc::downgrade(&window), move |job: Job| {
            let _ = sender.send(job);
        });
        std::thread::spawn(move || activate()).join().unwrap();

        // Nothing happens until the owning context runs the job
        assert!(window.is_minimized());
        let job = jobs.try_recv().unwrap();
        job();
        assert!(!window.is_minimized());
    }
}
