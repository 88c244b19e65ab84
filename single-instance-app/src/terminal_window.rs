use single_instance::Surface;
use std::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WindowState {
    pub minimized: bool,
    pub always_on_top: bool,
    /// How many times the window has been raised above other windows
    pub raised: u32,
}

/// Stand-in for a real window: keeps the state a window manager would and
/// reports changes on the terminal
#[derive(Debug)]
pub struct TerminalWindow {
    title: String,
    state: Mutex<WindowState>,
}

impl TerminalWindow {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            state: Mutex::new(WindowState::default()),
        }
    }

    pub fn state(&self) -> WindowState {
        self.state.lock().unwrap().clone()
    }

    pub fn minimize(&self) {
        self.state.lock().unwrap().minimized = true;
        println!("[{}] minimized", self.title);
    }

    pub fn toggle_always_on_top(&self) {
        let on_top = !self.is_always_on_top();
        self.set_always_on_top(on_top);
        println!("[{}] always on top: {}", self.title, on_top);
    }
}

impl Surface for TerminalWindow {
    fn is_minimized(&self) -> bool {
        self.state.lock().unwrap().minimized
    }

    fn restore(&self) {
        self.state.lock().unwrap().minimized = false;
        println!("[{}] restored", self.title);
    }

    fn is_always_on_top(&self) -> bool {
        self.state.lock().unwrap().always_on_top
    }

    fn set_always_on_top(&self, on_top: bool) {
        let mut state = self.state.lock().unwrap();
        // Switching on-top on is what raises a window
        if on_top {
            state.raised += 1;
        }
        state.always_on_top = on_top;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use single_instance::Inline;
    use single_instance::make_activator;
    use std::sync::Arc;

    #[test]
    fn activation_restores_and_raises_once() {
        let window = Arc::new(TerminalWindow::new("test"));
        window.minimize();

        make_activator(Arc::downgrade(&window), Inline)();

        assert_eq!(
            window.state(),
            WindowState {
                minimized: false,
                always_on_top: false,
                raised: 1,
            }
        );
    }

    #[test]
    fn activation_keeps_always_on_top() {
        let window = Arc::new(TerminalWindow::new("test"));
        window.toggle_always_on_top();

        make_activator(Arc::downgrade(&window), Inline)();

        let state = window.state();
        assert!(state.always_on_top);
        assert!(!state.minimized);
    }
}
