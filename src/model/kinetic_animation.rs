//! Damped scroll animation started when a drag gesture is released.

const MAX_START_DELAY_MS: f64 = 50.0;

pub const MIN_SCROLL_SPEED: f64 = 0.2;
pub const MAX_SCROLL_SPEED: f64 = 7.0;
pub const DAMPING_COEFF: f64 = 0.997;
pub const SCROLL_MIN_MOVE: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    position: f64,
    time: f64,
}

/// Tracks the last four drag samples and, once started, extrapolates the
/// position with an exponentially decaying speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KineticAnimation {
    samples: [Option<Sample>; 4],
    start: Option<Sample>,
    duration_ms: f64,
    speed_per_ms: f64,
    min_speed: f64,
    max_speed: f64,
    damping_coeff: f64,
    min_move: f64,
}

impl KineticAnimation {
    #[must_use]
    pub fn new(min_speed: f64, max_speed: f64, damping_coeff: f64, min_move: f64) -> Self {
        Self {
            samples: [None; 4],
            start: None,
            duration_ms: 0.0,
            speed_per_ms: 0.0,
            min_speed,
            max_speed,
            damping_coeff,
            min_move,
        }
    }

    /// Animation tuned for scrolling a time scale in bar units.
    #[must_use]
    pub fn for_bar_spacing(bar_spacing: f64) -> Self {
        Self::new(
            MIN_SCROLL_SPEED / bar_spacing,
            MAX_SCROLL_SPEED / bar_spacing,
            DAMPING_COEFF,
            SCROLL_MIN_MOVE / bar_spacing,
        )
    }

    pub fn add_position(&mut self, position: f64, time: f64) {
        if let Some(latest) = self.samples[0].as_mut() {
            if latest.time == time {
                latest.position = position;
                return;
            }
            if (latest.position - position).abs() < self.min_move {
                return;
            }
        }
        self.samples.rotate_right(1);
        self.samples[0] = Some(Sample { position, time });
    }

    pub fn start(&mut self, position: f64, time: f64) {
        let (Some(p1), Some(p2)) = (self.samples[0], self.samples[1]) else {
            return;
        };
        if time - p1.time > MAX_START_DELAY_MS {
            return;
        }

        let speed1 = self.segment_speed(p1, p2);
        let mut segments = vec![(speed1, p1.position - p2.position)];
        if let Some(p3) = self.samples[2] {
            let speed2 = self.segment_speed(p2, p3);
            if speed2.signum() == speed1.signum() {
                segments.push((speed2, p2.position - p3.position));
                if let Some(p4) = self.samples[3] {
                    let speed3 = self.segment_speed(p3, p4);
                    if speed3.signum() == speed1.signum() {
                        segments.push((speed3, p3.position - p4.position));
                    }
                }
            }
        }

        let total_distance: f64 = segments.iter().map(|(_, distance)| distance).sum();
        let speed: f64 = segments
            .iter()
            .map(|(speed, distance)| distance / total_distance * speed)
            .sum();
        if speed.abs() < self.min_speed {
            return;
        }

        self.start = Some(Sample { position, time });
        self.speed_per_ms = speed;
        let ln_coeff = self.damping_coeff.ln();
        // Decay time until the speed falls to |ln c| units per ms.
        self.duration_ms = (ln_coeff / -speed.abs()).ln() / ln_coeff;
    }

    #[must_use]
    pub fn position(&self, time: f64) -> f64 {
        let Some(start) = self.start else {
            return self.samples[0].map_or(0.0, |sample| sample.position);
        };
        let elapsed = time - start.time;
        start.position
            + self.speed_per_ms * (self.damping_coeff.powf(elapsed) - 1.0) / self.damping_coeff.ln()
    }

    #[must_use]
    pub fn finished(&self, time: f64) -> bool {
        match self.start {
            None => true,
            Some(start) => (time - start.time).min(self.duration_ms) == self.duration_ms,
        }
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.start.is_some()
    }

    fn segment_speed(&self, newer: Sample, older: Sample) -> f64 {
        let speed = (newer.position - older.position) / (newer.time - older.time);
        speed.signum() * speed.abs().min(self.max_speed)
    }
}

/// Right-offset animation installed on the time scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeScaleAnimation {
    Linear(LinearAnimation),
    Kinetic(KineticAnimation),
}

impl TimeScaleAnimation {
    #[must_use]
    pub fn finished(&self, now: f64) -> bool {
        match self {
            Self::Linear(animation) => animation.finished(now),
            Self::Kinetic(animation) => animation.finished(now),
        }
    }

    #[must_use]
    pub fn position(&self, now: f64) -> f64 {
        match self {
            Self::Linear(animation) => animation.position(now),
            Self::Kinetic(animation) => animation.position(now),
        }
    }
}

/// Linear interpolation of the right offset over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAnimation {
    pub from: f64,
    pub to: f64,
    pub start_time: f64,
    pub duration: f64,
}

impl LinearAnimation {
    #[must_use]
    pub fn finished(&self, now: f64) -> bool {
        (now - self.start_time) / self.duration >= 1.0
    }

    #[must_use]
    pub fn position(&self, now: f64) -> f64 {
        let progress = (now - self.start_time) / self.duration;
        if progress >= 1.0 {
            return self.to;
        }
        self.from + (self.to - self.from) * progress
    }
}
