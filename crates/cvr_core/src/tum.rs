//! TUM-format pose log I/O.
//!
//! Each line stores one camera-to-world pose as
//! `id tx ty tz qx qy qz qw` with a zero-padded integer frame id and the
//! rotation as a unit quaternion. Frame ids do not have to be contiguous;
//! gaps simply mean those frames were never written.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use cvr_math::{Pose, Quat, Vec3};
use thiserror::Error;

/// Errors reported by the pose log reader/writer.
#[derive(Error, Debug)]
pub enum PoseLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected 8 fields, found {found}")]
    MalformedLine { line: usize, found: usize },

    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },
}

/// Write poses to a TUM-format file, one line per pose.
///
/// Frame ids are the pose indices, zero-padded to five digits.
pub fn save_tum<P: AsRef<Path>>(path: P, poses: &[Pose]) -> Result<(), PoseLogError> {
    let file = File::create(path)?;
    write_tum(BufWriter::new(file), poses)
}

/// Load (frame id, pose) pairs from a TUM-format file.
pub fn load_tum<P: AsRef<Path>>(path: P) -> Result<Vec<(i32, Pose)>, PoseLogError> {
    let file = File::open(path)?;
    read_tum(BufReader::new(file))
}

fn write_tum<W: Write>(mut writer: W, poses: &[Pose]) -> Result<(), PoseLogError> {
    for (id, pose) in poses.iter().enumerate() {
        let t = pose.t;
        let q = pose.rotation_quat();
        writeln!(
            writer,
            "{:05} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
            id, t.x, t.y, t.z, q.x, q.y, q.z, q.w
        )?;
    }
    Ok(())
}

fn read_tum<R: BufRead>(reader: R) -> Result<Vec<(i32, Pose)>, PoseLogError> {
    let mut poses = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 8 {
            return Err(PoseLogError::MalformedLine {
                line: index + 1,
                found: fields.len(),
            });
        }

        let id = parse_field::<i32>(fields[0], index + 1)?;
        let mut values = [0.0f32; 7];
        for (value, field) in values.iter_mut().zip(&fields[1..]) {
            *value = parse_field::<f32>(field, index + 1)?;
        }

        let t = Vec3::new(values[0], values[1], values[2]);
        // Normalize: six-decimal quantization denormalizes the quaternion
        let q = Quat::from_xyzw(values[3], values[4], values[5], values[6]).normalize();
        poses.push((id, Pose::from_quat(q, t)));
    }

    Ok(poses)
}

fn parse_field<T: std::str::FromStr>(field: &str, line: usize) -> Result<T, PoseLogError> {
    field.parse().map_err(|_| PoseLogError::InvalidNumber {
        line,
        value: field.to_string(),
    })
}
