use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Animated terminal spinner shown while a blocking call runs.
///
/// The animation runs on its own thread. The only state shared with that
/// thread is the `running` flag; [`Spinner::stop`] clears it and joins.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Starts animating `message` immediately.
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{msg}... {spinner}") {
            bar.set_style(style.tick_chars("|/-\\ "));
        }
        bar.set_message(message.to_string());

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || {
            while flag.load(Ordering::Relaxed) {
                bar.tick();
                thread::sleep(TICK_INTERVAL);
            }
            bar.finish_and_clear();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stops the animation, clears the line and waits for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::Spinner;

    #[test]
    fn start_and_stop_joins_thread() {
        let spinner = Spinner::start("Rewriting authors");
        std::thread::sleep(std::time::Duration::from_millis(30));
        spinner.stop();
    }

    #[test]
    fn drop_stops_spinner() {
        let spinner = Spinner::start("Rewriting dates");
        drop(spinner);
    }
}
