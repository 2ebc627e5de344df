use crate::core::input::KeyMap;
use crate::error::Error;
use crate::game::beatmap::BeatmapParams;
use crate::game::judgment::TimingWindows;
use crate::game::scroll::Playfield;
use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

pub const CONFIG_INI_PATH: &str = "beatfall.ini";

const BEATMAP_SECTION: &str = "Beatmap";
const PLAYFIELD_SECTION: &str = "Playfield";
const JUDGEMENT_SECTION: &str = "Judgement";
const INPUT_SECTION: &str = "Input";

/// Every tunable of the generator and the judgement engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameConfig {
    pub beatmap: BeatmapParams,
    pub playfield: Playfield,
    pub windows: TimingWindows,
    pub key_map: KeyMap,
    /// Fixed generator seed. `None` draws a fresh seed per beatmap.
    pub seed: Option<u64>,
}

fn read_value<T: FromStr>(conf: &Ini, section: &str, key: &str, default: T) -> Result<T, Error> {
    match conf.get(section, key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            Error::Config(format!("[{}] {} = '{}' is not a valid value", section, key, raw.trim()))
        }),
    }
}

impl GameConfig {
    pub fn from_ini(conf: &Ini) -> Result<Self, Error> {
        let GameConfig { beatmap: bm, playfield: pf, windows: win, .. } = GameConfig::default();
        let beatmap = BeatmapParams {
            lane_count: read_value(conf, BEATMAP_SECTION, "LaneCount", bm.lane_count)?,
            lead_in_offset: read_value(conf, BEATMAP_SECTION, "LeadInSeconds", bm.lead_in_offset)?,
            offbeat_chance: read_value(conf, BEATMAP_SECTION, "OffbeatChance", bm.offbeat_chance)?,
            chord_chance: read_value(conf, BEATMAP_SECTION, "ChordChance", bm.chord_chance)?,
            offbeat_after_beat: read_value(
                conf,
                BEATMAP_SECTION,
                "OffbeatAfterBeat",
                bm.offbeat_after_beat,
            )?,
            chord_after_beat: read_value(
                conf,
                BEATMAP_SECTION,
                "ChordAfterBeat",
                bm.chord_after_beat,
            )?,
        };
        let seed = match conf.get(BEATMAP_SECTION, "Seed") {
            Some(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "[{}] Seed = '{}' is not a valid value",
                    BEATMAP_SECTION,
                    raw.trim()
                ))
            })?),
            _ => None,
        };
        let playfield = Playfield {
            note_speed: read_value(conf, PLAYFIELD_SECTION, "NoteSpeed", pf.note_speed)?,
            pixels_per_second_unit: read_value(
                conf,
                PLAYFIELD_SECTION,
                "PixelsPerSecondUnit",
                pf.pixels_per_second_unit,
            )?,
            spawn_distance: read_value(
                conf,
                PLAYFIELD_SECTION,
                "SpawnDistance",
                pf.spawn_distance,
            )?,
            terminal_distance: read_value(
                conf,
                PLAYFIELD_SECTION,
                "TerminalDistance",
                pf.terminal_distance,
            )?,
        };
        let windows = TimingWindows {
            perfect: read_value(conf, JUDGEMENT_SECTION, "PerfectWindow", win.perfect)?,
            good: read_value(conf, JUDGEMENT_SECTION, "GoodWindow", win.good)?,
            miss: read_value(conf, JUDGEMENT_SECTION, "MissWindow", win.miss)?,
        };

        let key_map = match conf.get(INPUT_SECTION, "Keys") {
            Some(raw) if !raw.trim().is_empty() => KeyMap::new(raw.trim().chars()),
            _ => KeyMap::default(),
        };

        let config = GameConfig { beatmap, playfield, windows, key_map, seed };
        config.validate()?;
        Ok(config)
    }

    /// Parses INI text. Missing keys keep their defaults.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut conf = Ini::new();
        conf.read(text.to_string()).map_err(Error::Config)?;
        Self::from_ini(&conf)
    }

    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let mut conf = Ini::new();
        conf.load(path)
            .map_err(|e| Error::Config(format!("failed to load '{}': {}", path.display(), e)))?;
        Self::from_ini(&conf)
    }

    pub fn to_ini(&self) -> Ini {
        let mut conf = Ini::new();
        let mut set = |section: &str, key: &str, value: String| {
            conf.set(section, key, Some(value));
        };
        set(BEATMAP_SECTION, "LaneCount", self.beatmap.lane_count.to_string());
        set(BEATMAP_SECTION, "LeadInSeconds", self.beatmap.lead_in_offset.to_string());
        set(BEATMAP_SECTION, "OffbeatChance", self.beatmap.offbeat_chance.to_string());
        set(BEATMAP_SECTION, "ChordChance", self.beatmap.chord_chance.to_string());
        set(BEATMAP_SECTION, "OffbeatAfterBeat", self.beatmap.offbeat_after_beat.to_string());
        set(BEATMAP_SECTION, "ChordAfterBeat", self.beatmap.chord_after_beat.to_string());
        set(BEATMAP_SECTION, "Seed", self.seed.map(|s| s.to_string()).unwrap_or_default());
        set(PLAYFIELD_SECTION, "NoteSpeed", self.playfield.note_speed.to_string());
        let pixels_per_second_unit = self.playfield.pixels_per_second_unit.to_string();
        set(PLAYFIELD_SECTION, "PixelsPerSecondUnit", pixels_per_second_unit);
        set(PLAYFIELD_SECTION, "SpawnDistance", self.playfield.spawn_distance.to_string());
        set(PLAYFIELD_SECTION, "TerminalDistance", self.playfield.terminal_distance.to_string());
        set(JUDGEMENT_SECTION, "PerfectWindow", self.windows.perfect.to_string());
        set(JUDGEMENT_SECTION, "GoodWindow", self.windows.good.to_string());
        set(JUDGEMENT_SECTION, "MissWindow", self.windows.miss.to_string());
        set(INPUT_SECTION, "Keys", self.key_map.to_string());
        conf
    }

    pub fn write_to(&self, path: &Path) -> Result<(), Error> {
        self.to_ini().write(path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.beatmap.validate().map_err(Error::Config)?;
        self.playfield.validate().map_err(Error::Config)?;
        self.windows.validate().map_err(Error::Config)?;
        self.key_map.validate().map_err(Error::Config)?;
        Ok(())
    }
}

// Global static for the active configuration.
static CONFIG: Lazy<Mutex<GameConfig>> = Lazy::new(|| Mutex::new(GameConfig::default()));

/// Loads `path` into the global config, writing a default file first if it is missing.
/// Any failure is logged and the defaults stay in effect.
pub fn load(path: &Path) {
    if !path.exists() {
        info!("Config '{}' not found, creating defaults.", path.display());
        if let Err(e) = GameConfig::default().write_to(path) {
            warn!("Failed to write default config '{}': {}", path.display(), e);
            return;
        }
    }

    match GameConfig::load_from(path) {
        Ok(config) => {
            info!("Loaded config from '{}' ({}).", path.display(), config.playfield);
            *CONFIG.lock().unwrap_or_else(|e| e.into_inner()) = config;
        }
        Err(e) => warn!("{}; using default config.", e),
    }
}

/// Returns a copy of the currently loaded config.
pub fn get() -> GameConfig {
    CONFIG.lock().unwrap_or_else(|e| e.into_inner()).clone()
}
