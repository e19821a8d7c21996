// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use std::io::Write;

static PICO_PER_MILLI: f64 = 1e9;
static PICO_PER_SECOND: f64 = 1e12;
static METERS_PER_KILO: f64 = 1e3;

/// Speed of light in an optical fiber, in m/ps.
static FIBER_LIGHT_SPEED: f64 = 2e-4;

pub fn to_picoseconds(ms: f64) -> u64 {
    (ms * PICO_PER_MILLI).round() as u64
}

pub fn to_seconds(ps: u64) -> f64 {
    ps as f64 / PICO_PER_SECOND
}

pub fn to_meters(km: f64) -> f64 {
    km * METERS_PER_KILO
}

/// Time taken by a photon to cross an optical fiber of the given length, in ps.
pub fn flight_time(distance: f64) -> u64 {
    (distance / FIBER_LIGHT_SPEED).round() as u64
}

pub trait CsvFriend {
    fn header(&self) -> String;
    fn to_csv(&self) -> String;
}

pub fn open_output_file(
    path: &str,
    filename: &str,
    append: bool,
    header: &str,
) -> anyhow::Result<std::fs::File> {
    let full_path = format!("{}{}", path, filename);

    if let Some(parent_path) = std::path::Path::new(&full_path).parent() {
        if parent_path.exists() {
            if !parent_path.is_dir() {
                anyhow::bail!(
                    "parent exists but is not a directory: {}",
                    parent_path.to_string_lossy()
                );
            }
        } else {
            std::fs::create_dir_all(parent_path)?;
        }
    }

    let add_header = !append
        || match std::fs::metadata(&full_path) {
            Ok(metadata) => metadata.len() == 0,
            Err(_) => true,
        };
    let mut f = std::fs::OpenOptions::new()
        .write(true)
        .append(append)
        .create(true)
        .truncate(!append)
        .open(full_path)?;
    if add_header {
        writeln!(&mut f, "{}", header)?;
    }
    Ok(f)
}
