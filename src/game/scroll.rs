use std::fmt;

/// Geometry and speed of the falling-note playfield.
///
/// Notes enter at the top and move down at a constant pixel speed. They reach
/// the hit line after `spawn_distance` pixels and are dropped as misses once
/// they pass `terminal_distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playfield {
    pub note_speed: f64,
    pub pixels_per_second_unit: f64,
    pub spawn_distance: f64,
    pub terminal_distance: f64,
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            note_speed: 7.0,
            pixels_per_second_unit: 60.0,
            spawn_distance: 600.0,
            terminal_distance: 650.0,
        }
    }
}

impl fmt::Display for Playfield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.note_speed - self.note_speed.round()).abs() < f64::EPSILON {
            write!(f, "Speed {}", self.note_speed.round() as i64)?;
        } else {
            write!(f, "Speed {:.2}", self.note_speed)?;
        }
        write!(
            f,
            " ({:.0}px/s, travel {:.3}s)",
            self.pixels_per_second(),
            self.travel_time_seconds()
        )
    }
}

impl Playfield {
    pub fn pixels_per_second(&self) -> f64 {
        let pps = self.note_speed * self.pixels_per_second_unit;
        if !pps.is_finite() || pps <= 0.0 {
            0.0
        } else {
            pps
        }
    }

    /// Seconds a note needs to fall from the spawn edge to the hit line.
    pub fn travel_time_seconds(&self) -> f64 {
        let speed = self.pixels_per_second();
        if speed <= 0.0 {
            0.0
        } else {
            self.spawn_distance / speed
        }
    }

    #[inline(always)]
    pub fn position_px(&self, elapsed_sec: f64) -> f64 {
        elapsed_sec * self.pixels_per_second()
    }

    #[inline(always)]
    pub fn is_past_terminal(&self, elapsed_sec: f64) -> bool {
        self.position_px(elapsed_sec) > self.terminal_distance
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.note_speed.is_finite() || self.note_speed <= 0.0 {
            return Err(format!("NoteSpeed must be greater than zero, got {}", self.note_speed));
        }
        if !self.pixels_per_second_unit.is_finite() || self.pixels_per_second_unit <= 0.0 {
            return Err(format!(
                "PixelsPerSecondUnit must be greater than zero, got {}",
                self.pixels_per_second_unit
            ));
        }
        if !self.spawn_distance.is_finite() || self.spawn_distance <= 0.0 {
            return Err(format!(
                "SpawnDistance must be greater than zero, got {}",
                self.spawn_distance
            ));
        }
        if !self.terminal_distance.is_finite() || self.terminal_distance < self.spawn_distance {
            return Err(format!(
                "TerminalDistance ({}) must not be shorter than SpawnDistance ({})",
                self.terminal_distance, self.spawn_distance
            ));
        }
        Ok(())
    }
}
