use serde::{Deserialize, Serialize};

/// An input or output data file of a recipe.
///
/// Type, group and level are opaque codes; the associated constants list
/// the values recipes commonly use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub filename: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: u32,
    pub group: u32,
    pub level: u32,
}

pub type FrameSet = Vec<Frame>;

impl Frame {
    pub const TYPE_NONE: u32 = 1 << 0;
    pub const TYPE_IMAGE: u32 = 1 << 1;
    pub const TYPE_MATRIX: u32 = 1 << 2;
    pub const TYPE_TABLE: u32 = 1 << 3;
    pub const TYPE_PAPER: u32 = 1 << 4;
    pub const TYPE_ANY: u32 = 1 << 5;

    pub const GROUP_NONE: u32 = 0;
    pub const GROUP_RAW: u32 = 1;
    pub const GROUP_CALIB: u32 = 2;
    pub const GROUP_PRODUCT: u32 = 3;

    pub const LEVEL_NONE: u32 = 0;
    pub const LEVEL_TEMPORARY: u32 = 1;
    pub const LEVEL_INTERMEDIATE: u32 = 2;
    pub const LEVEL_FINAL: u32 = 3;

    pub fn new(filename: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            tag: tag.into(),
            kind: Frame::TYPE_NONE,
            group: Frame::GROUP_NONE,
            level: Frame::LEVEL_NONE,
        }
    }

    pub fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    pub fn group_name(&self) -> &'static str {
        match self.group {
            Frame::GROUP_RAW => "RAW",
            Frame::GROUP_CALIB => "CALIB",
            Frame::GROUP_PRODUCT => "PRODUCT",
            _ => "NONE",
        }
    }
}
