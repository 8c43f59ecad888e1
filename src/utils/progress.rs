use std::io::Write;

/// Above this many rows the bar is replaced by a bare percentage.
const MAX_BAR_WIDTH: usize = 50;

/// Single-line progress indicator redrawn on stderr with `\r`.
pub struct Progress {
    max: usize,
    current: usize,
    text: String,
    enabled: bool,
}

impl Progress {
    pub fn new(max: usize, text: impl Into<String>, enabled: bool) -> Self {
        Self {
            max,
            current: 0,
            text: text.into(),
            enabled,
        }
    }

    pub fn start(&self) {
        self.draw();
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1).min(self.max);
        self.draw();
    }

    pub fn finish(&self) {
        if self.enabled {
            eprintln!();
        }
    }

    pub fn render(&self) -> String {
        let percentage = if self.max == 0 {
            100
        } else {
            (self.current * 100 + self.max / 2) / self.max
        };

        if self.max > MAX_BAR_WIDTH {
            return format!("{}{}%", self.text, percentage);
        }

        format!(
            "{}[{}{}] {}%",
            self.text,
            "#".repeat(self.current),
            " ".repeat(self.max - self.current),
            percentage
        )
    }

    fn draw(&self) {
        if !self.enabled {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", self.render());
        let _ = stderr.flush();
    }
}
