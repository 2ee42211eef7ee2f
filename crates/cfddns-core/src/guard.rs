//! Optional minimum interval between runs, remembered in a stamp file.
//!
//! Stamp I/O problems never fail a run: an unreadable stamp counts as "no
//! previous run" and a failed write only logs a warning.

use crate::cfg::Settings;
use chrono::{DateTime, Utc};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, warn};

pub struct RunGuard {
    path: PathBuf,
    min_interval: Duration,
}

impl RunGuard {
    pub fn new(path: impl Into<PathBuf>, min_interval: Duration) -> Self {
        Self {
            path: path.into(),
            min_interval,
        }
    }

    /// `None` when the guard is disabled (`min_interval_secs == 0`).
    pub fn from_settings(s: &Settings) -> Option<Self> {
        (s.min_interval_secs > 0)
            .then(|| Self::new(&s.stamp_file, Duration::from_secs(s.min_interval_secs)))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the previous run time if it lies within the interval before
    /// `now`. Otherwise stamps `now` and returns `None`.
    pub fn check(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(last) = self.last_run() {
            // negative elapsed (clock moved back) does not block
            if let Ok(elapsed) = now.signed_duration_since(last).to_std()
                && elapsed < self.min_interval
            {
                return Some(last);
            }
        }
        if let Err(e) = self.stamp(now) {
            warn!("cannot write run stamp {}: {e}", self.path.display());
        }
        None
    }

    fn last_run(&self) -> Option<DateTime<Utc>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("cannot read run stamp {}: {e}", self.path.display());
                return None;
            }
        };
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(e) => {
                warn!("ignoring malformed run stamp {}: {e}", self.path.display());
                None
            }
        }
    }

    fn stamp(&self, now: DateTime<Utc>) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, now.to_rfc3339())?;
        debug!("run stamp {} -> {now}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn guard(dir: &TempDir) -> RunGuard {
        RunGuard::new(dir.path().join("state/.last_run"), Duration::from_secs(55))
    }

    #[test]
    fn first_run_goes_ahead_and_stamps() {
        let dir = TempDir::new().unwrap();
        let g = guard(&dir);
        let now = Utc::now();
        assert_eq!(g.check(now), None);
        let written = fs::read_to_string(g.path()).unwrap();
        assert_eq!(written, now.to_rfc3339());
    }

    #[test]
    fn run_within_interval_is_held_back() {
        let dir = TempDir::new().unwrap();
        let g = guard(&dir);
        let first = Utc::now();
        assert_eq!(g.check(first), None);

        let second = first + TimeDelta::seconds(10);
        assert_eq!(g.check(second), Some(first));
        // held-back runs leave the stamp alone
        assert_eq!(fs::read_to_string(g.path()).unwrap(), first.to_rfc3339());

        let third = first + TimeDelta::seconds(60);
        assert_eq!(g.check(third), None);
        assert_eq!(fs::read_to_string(g.path()).unwrap(), third.to_rfc3339());
    }

    #[test]
    fn malformed_or_future_stamp_does_not_block() {
        let dir = TempDir::new().unwrap();
        let g = guard(&dir);
        fs::create_dir_all(g.path().parent().unwrap()).unwrap();

        fs::write(g.path(), "1718000000.123").unwrap();
        assert_eq!(g.check(Utc::now()), None);

        let now = Utc::now();
        fs::write(g.path(), (now + TimeDelta::hours(1)).to_rfc3339()).unwrap();
        assert_eq!(g.check(now), None);
    }

    #[test]
    fn disabled_by_default() {
        assert!(RunGuard::from_settings(&Settings::default()).is_none());
        let s = Settings {
            min_interval_secs: 55,
            ..Settings::default()
        };
        let g = RunGuard::from_settings(&s).unwrap();
        assert_eq!(g.min_interval(), Duration::from_secs(55));
    }
}
