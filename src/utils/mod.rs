use std::time::Instant;
use tracing::info;

/// Logs the wall-clock duration of a scrape run when dropped.
pub struct RunTimer {
    what: String,
    started: Instant,
}

impl RunTimer {
    pub fn start(what: impl Into<String>) -> Self {
        let what = what.into();
        info!("{} started", what);
        Self {
            what,
            started: Instant::now(),
        }
    }
}

impl Drop for RunTimer {
    fn drop(&mut self) {
        info!("{} finished in {:.2?}", self.what, self.started.elapsed());
    }
}

/// Thousands-separated count for the stats output.
pub fn fmt_count(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    let lead = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
