use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 编码器输入工作单元
///
/// 由生产者创建，入队后所有权转移给队列，转发时再交给下游。
#[derive(Debug, Clone)]
pub struct FrameWork {
    pub frame_index: u64,
    pub timestamp_us: i64,
    pub data: Bytes,
}

impl FrameWork {
    pub fn new(frame_index: u64, timestamp_us: i64, data: Bytes) -> Self {
        Self {
            frame_index,
            timestamp_us,
            data,
        }
    }
}

/// 已附带配置更新的工作单元，按入队顺序交给下游
#[derive(Debug)]
pub struct QueuedWork<W> {
    pub work: W,
    pub config_updates: Vec<ConfigUpdate>,
}

/// 数据空间（Android 位布局）
///
/// - standard: bit 16..22
/// - transfer: bit 22..27
/// - range:    bit 27..30
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataspace(pub u32);

impl Dataspace {
    pub const STANDARD_SHIFT: u32 = 16;
    pub const STANDARD_MASK: u32 = 63 << Self::STANDARD_SHIFT;
    pub const TRANSFER_SHIFT: u32 = 22;
    pub const TRANSFER_MASK: u32 = 31 << Self::TRANSFER_SHIFT;
    pub const RANGE_SHIFT: u32 = 27;
    pub const RANGE_MASK: u32 = 7 << Self::RANGE_SHIFT;

    pub const UNKNOWN: Dataspace = Dataspace(0);
    pub const V0_SRGB: Dataspace = Dataspace::compose(
        standard::BT709,
        transfer::SRGB,
        range::FULL,
    );
    pub const V0_BT709: Dataspace = Dataspace::compose(
        standard::BT709,
        transfer::SMPTE_170M,
        range::LIMITED,
    );
    pub const V0_BT601_625: Dataspace = Dataspace::compose(
        standard::BT601_625,
        transfer::SMPTE_170M,
        range::LIMITED,
    );
    pub const V0_BT601_525: Dataspace = Dataspace::compose(
        standard::BT601_525,
        transfer::SMPTE_170M,
        range::LIMITED,
    );
    pub const V0_SCRGB_LINEAR: Dataspace = Dataspace::compose(
        standard::BT709,
        transfer::LINEAR,
        range::EXTENDED,
    );
    pub const BT2020_PQ: Dataspace = Dataspace::compose(
        standard::BT2020,
        transfer::ST2084,
        range::FULL,
    );
    pub const BT2020_HLG: Dataspace = Dataspace::compose(
        standard::BT2020,
        transfer::HLG,
        range::FULL,
    );
    pub const ADOBE_RGB: Dataspace = Dataspace::compose(
        standard::ADOBE_RGB,
        transfer::GAMMA2_2,
        range::FULL,
    );

    pub const fn compose(standard: u32, transfer: u32, range: u32) -> Self {
        Dataspace(
            ((standard << Self::STANDARD_SHIFT) & Self::STANDARD_MASK)
                | ((transfer << Self::TRANSFER_SHIFT) & Self::TRANSFER_MASK)
                | ((range << Self::RANGE_SHIFT) & Self::RANGE_MASK),
        )
    }

    pub fn standard(self) -> u32 {
        (self.0 & Self::STANDARD_MASK) >> Self::STANDARD_SHIFT
    }

    pub fn transfer(self) -> u32 {
        (self.0 & Self::TRANSFER_MASK) >> Self::TRANSFER_SHIFT
    }

    pub fn range(self) -> u32 {
        (self.0 & Self::RANGE_MASK) >> Self::RANGE_SHIFT
    }
}

impl fmt::Display for Dataspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#010x}(standard={}, transfer={}, range={})",
            self.0,
            self.standard(),
            self.transfer(),
            self.range()
        )
    }
}

/// 数据空间 standard 字段取值
pub mod standard {
    pub const UNSPECIFIED: u32 = 0;
    pub const BT709: u32 = 1;
    pub const BT601_625: u32 = 2;
    pub const BT601_625_UNADJUSTED: u32 = 3;
    pub const BT601_525: u32 = 4;
    pub const BT601_525_UNADJUSTED: u32 = 5;
    pub const BT2020: u32 = 6;
    pub const BT2020_CONSTANT_LUMINANCE: u32 = 7;
    pub const BT470M: u32 = 8;
    pub const FILM: u32 = 9;
    pub const DCI_P3: u32 = 10;
    pub const ADOBE_RGB: u32 = 11;
}

/// 数据空间 transfer 字段取值
pub mod transfer {
    pub const UNSPECIFIED: u32 = 0;
    pub const LINEAR: u32 = 1;
    pub const SRGB: u32 = 2;
    pub const SMPTE_170M: u32 = 3;
    pub const GAMMA2_2: u32 = 4;
    pub const GAMMA2_6: u32 = 5;
    pub const GAMMA2_8: u32 = 6;
    pub const ST2084: u32 = 7;
    pub const HLG: u32 = 8;
}

/// 数据空间 range 字段取值
pub mod range {
    pub const UNSPECIFIED: u32 = 0;
    pub const FULL: u32 = 1;
    pub const LIMITED: u32 = 2;
    pub const EXTENDED: u32 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRange {
    Unspecified,
    Full,
    Limited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPrimaries {
    Unspecified,
    Bt709,
    Bt470M,
    Bt601_625,
    Bt601_525,
    GenericFilm,
    Bt2020,
    Rp431,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTransfer {
    Unspecified,
    Linear,
    Srgb,
    Smpte170M,
    Gamma22,
    Gamma28,
    St2084,
    Hlg,
    St428,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMatrix {
    Unspecified,
    Bt709,
    Fcc47_73_682,
    Bt601,
    Smpte240M,
    Bt2020,
    Bt2020Constant,
}

/// 颜色描述（由数据空间推导）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAspects {
    pub range: ColorRange,
    pub primaries: ColorPrimaries,
    pub transfer: ColorTransfer,
    pub matrix: ColorMatrix,
}

/// 单条配置变更记录，附着在下一个入队的工作单元上
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigUpdate {
    Dataspace { stream: u32, dataspace: Dataspace },
    ColorAspects { stream: u32, aspects: ColorAspects },
}

impl ConfigUpdate {
    pub fn stream(&self) -> u32 {
        match self {
            ConfigUpdate::Dataspace { stream, .. } => *stream,
            ConfigUpdate::ColorAspects { stream, .. } => *stream,
        }
    }
}
