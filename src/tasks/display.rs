//! Task Display
//!
//! Interface for rendering task progress. Implemented by UI collaborators.

use log::{debug, info};

/// Receives progress for the task currently owned by a bridge
pub trait TaskDisplay {
    /// A task with this title started
    fn start(&mut self, title: &str);

    /// `percent_done` is a fraction in `[0, 1]`
    fn report_progress(&mut self, percent_done: f32, message: &str);

    /// Remove any progress indication
    fn clear(&mut self);
}

/// Fans the same stream out to several displays, in insertion order
#[derive(Default)]
pub struct MultiDisplay {
    displays: Vec<Box<dyn TaskDisplay>>,
}

impl MultiDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, display: impl TaskDisplay + 'static) -> Self {
        self.push(display);
        self
    }

    pub fn push(&mut self, display: impl TaskDisplay + 'static) {
        self.displays.push(Box::new(display));
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }
}

impl TaskDisplay for MultiDisplay {
    fn start(&mut self, title: &str) {
        for display in &mut self.displays {
            display.start(title);
        }
    }

    fn report_progress(&mut self, percent_done: f32, message: &str) {
        for display in &mut self.displays {
            display.report_progress(percent_done, message);
        }
    }

    fn clear(&mut self) {
        for display in &mut self.displays {
            display.clear();
        }
    }
}

/// Writes progress to the log. Only whole-percent changes are logged.
#[derive(Debug, Default)]
pub struct LogDisplay {
    title: Option<String>,
    last_percent: Option<u32>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskDisplay for LogDisplay {
    fn start(&mut self, title: &str) {
        info!("{}: started", title);
        self.title = Some(title.to_string());
        self.last_percent = None;
    }

    fn report_progress(&mut self, percent_done: f32, message: &str) {
        let percent = (percent_done.clamp(0.0, 1.0) * 100.0).round() as u32;
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);

        let title = self.title.as_deref().unwrap_or("task");
        debug!("{}: {}% {}", title, percent, message);
    }

    fn clear(&mut self) {
        self.last_percent = None;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::TaskDisplay;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Call recorded by `RecordingDisplay`
    #[derive(Debug, Clone, PartialEq)]
    pub enum DisplayCall {
        Start(String),
        Progress(f32, String),
        Clear,
    }

    /// Display that records every call, shareable with the test body
    #[derive(Clone, Default)]
    pub struct RecordingDisplay {
        pub calls: Arc<Mutex<Vec<DisplayCall>>>,
    }

    impl RecordingDisplay {
        pub fn calls(&self) -> Vec<DisplayCall> {
            self.calls.lock().clone()
        }
    }

    impl TaskDisplay for RecordingDisplay {
        fn start(&mut self, title: &str) {
            self.calls.lock().push(DisplayCall::Start(title.to_string()));
        }

        fn report_progress(&mut self, percent_done: f32, message: &str) {
            self.calls
                .lock()
                .push(DisplayCall::Progress(percent_done, message.to_string()));
        }

        fn clear(&mut self) {
            self.calls.lock().push(DisplayCall::Clear);
        }
    }
}
