use crate::error::Error;
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct SongData {
    pub title: String,
    pub music_path: PathBuf,
    pub bpm: f64,
    pub description: String,
}

/// What the beatmap generator needs once the audio collaborator knows the track length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SongDescriptor {
    pub bpm: f64,
    pub duration_seconds: f64,
}

impl SongData {
    /// Pairs the catalog tempo with the duration reported by the audio backend.
    pub fn with_duration(&self, duration_seconds: f64) -> Result<SongDescriptor, Error> {
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "'{}' reported an unusable duration: {}",
                self.title, duration_seconds
            )));
        }
        Ok(SongDescriptor {
            bpm: self.bpm,
            duration_seconds,
        })
    }

    pub fn formatted_bpm(&self) -> String {
        if (self.bpm - self.bpm.round()).abs() < 1e-6 {
            format!("{}", self.bpm.round() as i64)
        } else {
            format!("{:.2}", self.bpm)
        }
    }
}

static CATALOG: Lazy<Vec<Arc<SongData>>> = Lazy::new(|| {
    vec![
        Arc::new(SongData {
            title: "Get Over If You Can".to_string(),
            music_path: PathBuf::from("audio_mp3/Get Over If You Can.mp3"),
            bpm: 102.0,
            description: "Climb the mountain of this song. If you can, that is.".to_string(),
        }),
        Arc::new(SongData {
            title: "Overtake".to_string(),
            music_path: PathBuf::from("audio_mp3/overtake.mp3"),
            bpm: 110.0,
            description: "Easily the most intense track in the game. Probably.".to_string(),
        }),
        Arc::new(SongData {
            title: "Starlight Fever".to_string(),
            music_path: PathBuf::from("audio_mp3/Starlight Fever.mp3"),
            bpm: 120.0,
            description: "Need we say more? The legend starts here.".to_string(),
        }),
    ]
});

/// The built-in song list, in display order.
pub fn catalog() -> &'static [Arc<SongData>] {
    CATALOG.as_slice()
}

pub fn find_song(title: &str) -> Option<Arc<SongData>> {
    catalog()
        .iter()
        .find(|song| song.title.eq_ignore_ascii_case(title.trim()))
        .cloned()
}
