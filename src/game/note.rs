use serde::{Deserialize, Serialize};

/// A single tap target in a beatmap.
///
/// `time` is the hit instant in seconds from track start, `lane` the input
/// channel it belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub time: f64,
    pub lane: usize,
}

/// Which generation step produced a note.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoteKind {
    Primary,
    OffBeat,
    Chord,
}

/// A note that has been spawned onto the playfield and is still in flight.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ActiveNote {
    pub note_index: usize,
    pub note: Note,
    pub spawn_time: f64,
}

impl ActiveNote {
    pub fn new(note_index: usize, note: Note, travel_time: f64) -> Self {
        Self {
            note_index,
            note,
            spawn_time: note.time - travel_time,
        }
    }

    #[inline(always)]
    pub fn elapsed(&self, music_time_sec: f64) -> f64 {
        music_time_sec - self.spawn_time
    }

    /// Signed error of a press at `music_time_sec`; positive means late.
    #[inline(always)]
    pub fn time_error(&self, music_time_sec: f64) -> f64 {
        music_time_sec - self.note.time
    }
}
