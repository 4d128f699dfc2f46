// 数据空间到颜色描述的映射
//
// standard 同时决定色域与矩阵系数；任一字段无法映射时整体失败。

use common::{
    range, standard, transfer, ColorAspects, ColorMatrix, ColorPrimaries, ColorRange,
    ColorTransfer, Dataspace,
};

fn map_standard(value: u32) -> Option<(ColorPrimaries, ColorMatrix)> {
    let mapped = match value {
        standard::UNSPECIFIED => (ColorPrimaries::Unspecified, ColorMatrix::Unspecified),
        standard::BT709 => (ColorPrimaries::Bt709, ColorMatrix::Bt709),
        standard::BT601_625 => (ColorPrimaries::Bt601_625, ColorMatrix::Bt601),
        standard::BT601_625_UNADJUSTED => (ColorPrimaries::Bt601_625, ColorMatrix::Bt709),
        standard::BT601_525 => (ColorPrimaries::Bt601_525, ColorMatrix::Bt601),
        standard::BT601_525_UNADJUSTED => (ColorPrimaries::Bt601_525, ColorMatrix::Smpte240M),
        standard::BT2020 => (ColorPrimaries::Bt2020, ColorMatrix::Bt2020),
        standard::BT2020_CONSTANT_LUMINANCE => {
            (ColorPrimaries::Bt2020, ColorMatrix::Bt2020Constant)
        }
        standard::BT470M => (ColorPrimaries::Bt470M, ColorMatrix::Fcc47_73_682),
        standard::FILM => (ColorPrimaries::GenericFilm, ColorMatrix::Fcc47_73_682),
        standard::DCI_P3 => (ColorPrimaries::Rp431, ColorMatrix::Bt709),
        _ => return None,
    };
    Some(mapped)
}

fn map_transfer(value: u32) -> Option<ColorTransfer> {
    let mapped = match value {
        transfer::UNSPECIFIED => ColorTransfer::Unspecified,
        transfer::LINEAR => ColorTransfer::Linear,
        transfer::SRGB => ColorTransfer::Srgb,
        transfer::SMPTE_170M => ColorTransfer::Smpte170M,
        transfer::GAMMA2_2 => ColorTransfer::Gamma22,
        // gamma 2.6 即 SMPTE ST 428
        transfer::GAMMA2_6 => ColorTransfer::St428,
        transfer::GAMMA2_8 => ColorTransfer::Gamma28,
        transfer::ST2084 => ColorTransfer::St2084,
        transfer::HLG => ColorTransfer::Hlg,
        _ => return None,
    };
    Some(mapped)
}

fn map_range(value: u32) -> Option<ColorRange> {
    match value {
        range::UNSPECIFIED => Some(ColorRange::Unspecified),
        range::FULL => Some(ColorRange::Full),
        range::LIMITED => Some(ColorRange::Limited),
        _ => None,
    }
}

/// 由数据空间推导颜色描述
pub fn color_aspects_from_dataspace(dataspace: Dataspace) -> Option<ColorAspects> {
    let (primaries, matrix) = map_standard(dataspace.standard())?;
    let transfer = map_transfer(dataspace.transfer())?;
    let range = map_range(dataspace.range())?;
    Some(ColorAspects {
        range,
        primaries,
        transfer,
        matrix,
    })
}
