// Copyright (C) Brian G. Milnes 2025

//! Log root layout: `<root>/<YYYY>/<MM>/<DD>/`.
//!
//! Day directories are created ahead of time so that every user's shutdown
//! hook can drop files in them: year and month directories get `2755`, day
//! directories get `3777` (setgid plus sticky, world-writable).

pub mod layout {
    use std::fs;
    use std::path::{Path, PathBuf};

    use chrono::{Datelike, Duration, NaiveDate};

    use crate::error::error::Result;

    pub const YEAR_MONTH_MODE: u32 = 0o2755;
    pub const DAY_MODE: u32 = 0o3777;

    pub fn date_dir(root: &Path, date: NaiveDate) -> PathBuf {
        root.join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()))
    }

    #[cfg(unix)]
    fn set_mode(path: &Path, mode: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
        Ok(())
    }

    /// Create day directories for `num_days` days starting at `start`.
    pub fn create_date_dirs(root: &Path, start: NaiveDate, num_days: u32) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for offset in 0..num_days {
            let date = start + Duration::days(i64::from(offset));
            let day_dir = date_dir(root, date);
            fs::create_dir_all(&day_dir)?;
            if let Some(month_dir) = day_dir.parent() {
                if let Some(year_dir) = month_dir.parent() {
                    set_mode(year_dir, YEAR_MONTH_MODE)?;
                }
                set_mode(month_dir, YEAR_MONTH_MODE)?;
            }
            set_mode(&day_dir, DAY_MODE)?;
            created.push(day_dir);
        }
        Ok(created)
    }
}
