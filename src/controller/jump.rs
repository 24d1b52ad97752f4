use std::time::{Duration, Instant};

pub const DEFAULT_THRESHOLD: f32 = 5.0;

/**
 * Minimum time (milliseconds) between two jumps.
 */
pub const DEBOUNCE_WINDOW: u64 = 300;

/// Fires when a reading reaches the threshold, at most once per debounce window. There
/// is no hysteresis: a weight held above the threshold fires again every window.
#[derive(Debug, Clone)]
pub struct JumpTrigger {
    threshold: f32,
    debounce: Duration,
    last_jump: Option<Instant>,
}

impl JumpTrigger {
    pub fn new(threshold: f32, debounce: Duration) -> Self {
        JumpTrigger {
            threshold,
            debounce,
            last_jump: None,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn last_jump(&self) -> Option<Instant> {
        self.last_jump
    }

    /// Returns true if a jump should fire for `weight` arriving at `now`, in which case
    /// `now` becomes the new trigger time.
    pub fn evaluate(&mut self, weight: f32, now: Instant) -> bool {
        if weight < self.threshold {
            return false;
        }

        let debounced = match self.last_jump {
            None => true,
            Some(last_jump) => now.saturating_duration_since(last_jump) > self.debounce,
        };

        if debounced {
            self.last_jump = Some(now);
        }
        debounced
    }
}

impl Default for JumpTrigger {
    fn default() -> Self {
        JumpTrigger::new(DEFAULT_THRESHOLD, Duration::from_millis(DEBOUNCE_WINDOW))
    }
}

/// Length of the decimal number at the start of `text`: an optional sign, digits with an
/// optional fraction, and an optional exponent.
fn number_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let digits_from = |start: usize| bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let integer = digits_from(end);
    end += integer;

    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits_from(end + 1);
        if integer > 0 || fraction > 0 {
            end += 1 + fraction;
        }
    }

    if integer == 0 && fraction == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_digits = digits_from(exponent);
        if exponent_digits > 0 {
            end = exponent + exponent_digits;
        }
    }

    end
}

/// Parses threshold input text the way a browser reads a number field: leading
/// whitespace is skipped and the longest numeric prefix is used, so "6kg" is 6.
/// `Infinity` is recognised, other words are not. No number, zero or NaN falls back to
/// [`DEFAULT_THRESHOLD`].
pub fn parse_threshold(text: &str) -> f32 {
    let text = text.trim_start();
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);

    let value = if unsigned.starts_with("Infinity") {
        match text.starts_with('-') {
            true => f32::NEG_INFINITY,
            false => f32::INFINITY,
        }
    }
    else {
        text[..number_prefix_len(text)].parse::<f32>().unwrap_or(f32::NAN)
    };

    if value == 0.0 || value.is_nan() {
        DEFAULT_THRESHOLD
    }
    else {
        value
    }
}
