pub mod beatmap;
pub mod gameplay;
pub mod judgment;
pub mod note;
pub mod scores;
pub mod scroll;
pub mod session;
pub mod song;
