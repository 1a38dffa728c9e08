//! Set-of-frames files.
//!
//! Each non-empty line names one input frame as `FILENAME [TAG [GROUP]]`.
//! Text after `#` is ignored. `GROUP` is `RAW`, `CALIB`, `PRODUCT` or
//! `NONE` in any case.

use anyhow::{bail, Context, Result};
use plugin_core::{Frame, FrameSet};
use std::fs;
use std::path::Path;

pub fn load_sof(path: &Path) -> Result<FrameSet> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_sof(&content).with_context(|| format!("invalid set of frames in {}", path.display()))
}

pub fn parse_sof(content: &str) -> Result<FrameSet> {
    let mut frames = FrameSet::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(filename) = fields.next() else {
            continue;
        };
        let tag = fields.next().unwrap_or_default();
        let group = match fields.next() {
            Some(group) => parse_group(group)
                .with_context(|| format!("line {}: unknown frame group '{group}'", index + 1))?,
            None => Frame::GROUP_NONE,
        };
        if let Some(extra) = fields.next() {
            bail!("line {}: unexpected field '{extra}'", index + 1);
        }
        frames.push(Frame::new(filename, tag).with_group(group));
    }
    Ok(frames)
}

fn parse_group(text: &str) -> Option<u32> {
    match text.to_ascii_uppercase().as_str() {
        "NONE" => Some(Frame::GROUP_NONE),
        "RAW" => Some(Frame::GROUP_RAW),
        "CALIB" => Some(Frame::GROUP_CALIB),
        "PRODUCT" => Some(Frame::GROUP_PRODUCT),
        _ => None,
    }
}
