use timeline::Seconds;

const MIN_ZOOM: f32 = 1.0;
const MAX_ZOOM: f32 = 2_000.0;

/// Playhead and viewport state of the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    pub current_time: Seconds,
    /// Pixels per second.
    pub zoom_level: f32,
    pub is_playing: bool,
}

impl Default for Playback {
    fn default() -> Self { Self { current_time: 0.0, zoom_level: 60.0, is_playing: false } }
}

impl Playback {
    /// Moves the playhead, clamped to `[0, duration]`.
    pub fn seek(&mut self, t: Seconds, duration: Seconds) {
        let t = if t.is_finite() { t } else { 0.0 };
        self.current_time = t.clamp(0.0, duration.max(0.0));
    }

    pub fn set_zoom(&mut self, px_per_sec: f32) {
        if px_per_sec.is_finite() { self.zoom_level = px_per_sec.clamp(MIN_ZOOM, MAX_ZOOM); }
    }

    pub fn play(&mut self) { self.is_playing = true; }

    pub fn pause(&mut self) { self.is_playing = false; }

    pub fn toggle(&mut self) { self.is_playing = !self.is_playing; }

    pub fn time_to_px(&self, t: Seconds) -> f32 { (t * self.zoom_level as f64) as f32 }

    pub fn px_to_time(&self, px: f32) -> Seconds { px as f64 / self.zoom_level as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_clamps_to_duration() {
        let mut p = Playback::default();
        p.seek(12.0, 10.0);
        assert_eq!(p.current_time, 10.0);
        p.seek(-3.0, 10.0);
        assert_eq!(p.current_time, 0.0);
        p.seek(f64::NAN, 10.0);
        assert_eq!(p.current_time, 0.0);
    }

    #[test]
    fn zoom_stays_positive() {
        let mut p = Playback::default();
        p.set_zoom(0.0);
        assert_eq!(p.zoom_level, MIN_ZOOM);
        p.set_zoom(f32::NAN);
        assert_eq!(p.zoom_level, MIN_ZOOM);
        p.set_zoom(120.0);
        assert_eq!(p.time_to_px(2.5), 300.0);
        assert_eq!(p.px_to_time(60.0), 0.5);
    }

    #[test]
    fn toggle_flips_play_state() {
        let mut p = Playback::default();
        p.toggle();
        assert!(p.is_playing);
        p.pause();
        assert!(!p.is_playing);
    }
}
