use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

const SAVE_DIR: &str = "save";
const PREFERENCES_INI_PATH: &str = "save/preferences.ini";

#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub perfect_judgment_ms: f64,
    pub good_judgment_ms: f64,
    pub hold_body_tolerance_ms: f64,
    pub hold_tail_tolerance_ms: f64,
    /// Playback rate; judgment deltas are divided by it.
    pub time_scale: f64,
    pub chart_offset_ms: f64,
    pub autoplay: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            perfect_judgment_ms: 80.0,
            good_judgment_ms: 160.0,
            hold_body_tolerance_ms: 100.0,
            hold_tail_tolerance_ms: 100.0,
            time_scale: 1.0,
            chart_offset_ms: 0.0,
            autoplay: false,
        }
    }
}

static PREFERENCES: Lazy<Mutex<Preferences>> = Lazy::new(|| Mutex::new(Preferences::default()));

fn write_defaults(path: &Path) -> Result<(), std::io::Error> {
    let d = Preferences::default();
    let mut conf = Ini::new();
    conf.set("Judgment", "PerfectMs", Some(d.perfect_judgment_ms.to_string()));
    conf.set("Judgment", "GoodMs", Some(d.good_judgment_ms.to_string()));
    conf.set("Judgment", "HoldBodyToleranceMs", Some(d.hold_body_tolerance_ms.to_string()));
    conf.set("Judgment", "HoldTailToleranceMs", Some(d.hold_tail_tolerance_ms.to_string()));
    conf.set("Playback", "TimeScale", Some(d.time_scale.to_string()));
    conf.set("Playback", "ChartOffsetMs", Some(d.chart_offset_ms.to_string()));
    conf.set("Playback", "Autoplay", Some("0".to_string()));
    conf.write(path)
}

fn read_ms(conf: &Ini, section: &str, key: &str, default: f64) -> f64 {
    match conf.get(section, key) {
        None => default,
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                warn!("Ignoring [{}] {} = '{}'; keeping {}.", section, key, raw, default);
                default
            }
        },
    }
}

/// Creates `dir` if needed; failures are logged and reported as `false`.
fn ensure_dir(dir: &Path) -> bool {
    match fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to create {:?}: {}", dir, e);
            false
        }
    }
}

/// Reads preferences from `path`. Missing files are created; bad keys keep their defaults.
pub fn load_from(path: &Path) -> Preferences {
    let defaults = Preferences::default();
    if !path.exists() {
        info!("Preferences not found, writing defaults to {:?}.", path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !ensure_dir(dir) {
                return defaults;
            }
        }
        if let Err(e) = write_defaults(path) {
            warn!("Failed to write default preferences: {}", e);
        }
        return defaults;
    }

    let mut conf = Ini::new();
    if let Err(e) = conf.load(path) {
        warn!("Failed to load {:?} ({}), using default preferences.", path, e);
        return defaults;
    }

    let mut prefs = Preferences {
        perfect_judgment_ms: read_ms(&conf, "Judgment", "PerfectMs", defaults.perfect_judgment_ms),
        good_judgment_ms: read_ms(&conf, "Judgment", "GoodMs", defaults.good_judgment_ms),
        hold_body_tolerance_ms: read_ms(&conf, "Judgment", "HoldBodyToleranceMs", defaults.hold_body_tolerance_ms),
        hold_tail_tolerance_ms: read_ms(&conf, "Judgment", "HoldTailToleranceMs", defaults.hold_tail_tolerance_ms),
        time_scale: read_ms(&conf, "Playback", "TimeScale", defaults.time_scale),
        chart_offset_ms: conf
            .get("Playback", "ChartOffsetMs")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(defaults.chart_offset_ms),
        autoplay: conf
            .get("Playback", "Autoplay")
            .and_then(|v| v.trim().parse::<u8>().ok())
            .map_or(defaults.autoplay, |v| v != 0),
    };

    if prefs.time_scale <= 0.0 {
        warn!("TimeScale must be positive; using 1.");
        prefs.time_scale = 1.0;
    }
    if prefs.good_judgment_ms < prefs.perfect_judgment_ms {
        warn!(
            "GoodMs ({}) is tighter than PerfectMs ({}); widening it.",
            prefs.good_judgment_ms, prefs.perfect_judgment_ms
        );
        prefs.good_judgment_ms = prefs.perfect_judgment_ms;
    }
    prefs
}

pub fn load() {
    ensure_dir(Path::new(SAVE_DIR));
    let prefs = load_from(Path::new(PREFERENCES_INI_PATH));
    info!(
        "Preferences: perfect {}ms, good {}ms, time scale {}, autoplay {}.",
        prefs.perfect_judgment_ms, prefs.good_judgment_ms, prefs.time_scale, prefs.autoplay
    );
    *PREFERENCES.lock().unwrap_or_else(|e| e.into_inner()) = prefs;
}

/// Returns a copy of the currently loaded preferences.
pub fn get() -> Preferences {
    PREFERENCES.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("linesync-prefs-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("preferences.ini")
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = scratch("missing");
        assert_eq!(load_from(&path), Preferences::default());
        assert!(path.exists());
        assert_eq!(load_from(&path), Preferences::default());
    }

    #[test]
    fn bad_keys_keep_defaults() {
        let path = scratch("bad");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "[Judgment]\nPerfectMs = 60\nGoodMs = fast\n[Playback]\nTimeScale = 0\nAutoplay = 1\nChartOffsetMs = -35\n",
        )
        .unwrap();
        let prefs = load_from(&path);
        assert_eq!(prefs.perfect_judgment_ms, 60.0);
        assert_eq!(prefs.good_judgment_ms, 160.0);
        assert_eq!(prefs.time_scale, 1.0);
        assert_eq!(prefs.chart_offset_ms, -35.0);
        assert!(prefs.autoplay);
    }

    #[test]
    fn unwritable_directory_falls_back_to_defaults() {
        let blocker = scratch("blocked");
        fs::create_dir_all(blocker.parent().unwrap()).unwrap();
        fs::write(&blocker, "not a directory").unwrap();
        let nested = blocker.join("save");
        assert!(!ensure_dir(&nested));
        assert_eq!(load_from(&nested.join("preferences.ini")), Preferences::default());
        assert!(!nested.exists());
    }
}
