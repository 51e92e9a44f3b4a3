//! 十六进制颜色解析
//!
//! 支持 `#RGB`、`#RGBA`、`#RRGGBB`、`#RRGGBBAA`，输出归一化的 `[r, g, b, a]`。

use crate::error::ColorError;

/// 把十六进制颜色字符串转换为归一化 RGBA
pub fn hex_to_color(s: &str) -> Result<[f32; 4], ColorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ColorError::Empty);
    }
    let Some(hex) = s.strip_prefix('#') else {
        return Err(ColorError::MissingHash);
    };

    let digits = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8).ok_or(ColorError::InvalidHex(c)))
        .collect::<Result<Vec<u8>, _>>()?;

    let bytes: [u8; 4] = match digits.as_slice() {
        // 单位数：每位重复一次（#F80 -> #FF8800）
        [r, g, b] => [r * 17, g * 17, b * 17, 255],
        [r, g, b, a] => [r * 17, g * 17, b * 17, a * 17],
        [r1, r2, g1, g2, b1, b2] => [r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, 255],
        [r1, r2, g1, g2, b1, b2, a1, a2] => {
            [r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, a1 * 16 + a2]
        }
        other => return Err(ColorError::InvalidLength(other.len())),
    };

    Ok(bytes.map(|b| b as f32 / 255.0))
}

/// 字符串是否看起来像十六进制颜色
pub fn looks_like_hex_color(s: &str) -> bool {
    s.trim_start().starts_with('#')
}
