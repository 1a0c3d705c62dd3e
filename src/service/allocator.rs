use crate::models::CellValue;

/// 第一个报表块从 F 列开始
pub const FIRST_BLOCK_COLUMN: usize = 5;
/// 每个报表块占 6 列
pub const BLOCK_WIDTH: usize = 6;
/// 判断空闲时检查的表头单元格数
const HEADER_PROBE: usize = 5;

/// 扫描第 1 行, 返回第一个表头 5 格全空的块的起始列号
///
/// 只会复用真正空着的列或向右扩展, 不会覆盖已有的块。
pub fn next_block_start(existing: &[Vec<CellValue>]) -> usize {
    let Some(header) = existing.first() else {
        return FIRST_BLOCK_COLUMN;
    };

    let mut col = FIRST_BLOCK_COLUMN;
    loop {
        let free = (col..col + HEADER_PROBE)
            .all(|c| header.get(c).map_or(true, CellValue::is_blank));
        if free {
            return col;
        }
        col += BLOCK_WIDTH;
    }
}

/// 写入前表格至少需要的尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetDimensions {
    pub rows: usize,
    pub columns: usize,
}

/// 行: 名单 + 3 行表头/汇总, 至少 10 行; 列: 本块再多留一个块的余量
pub fn required_dimensions(roster_len: usize, start_col: usize) -> SheetDimensions {
    SheetDimensions {
        rows: (roster_len + 3).max(10),
        columns: start_col + BLOCK_WIDTH * 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::column::{column_index, column_letter};

    fn header_row(filled: &[&str]) -> Vec<CellValue> {
        let mut row = vec![CellValue::blank(); 30];
        for letters in filled {
            row[column_index(letters)] = CellValue::text("x");
        }
        row
    }

    #[test]
    fn empty_sheet_starts_at_f() {
        assert_eq!(column_letter(next_block_start(&[])), "F");
        assert_eq!(column_letter(next_block_start(&[vec![]])), "F");
    }

    #[test]
    fn skips_used_blocks() {
        let sheet = vec![header_row(&["F", "G", "H", "I", "J"])];
        assert_eq!(column_letter(next_block_start(&sheet)), "L");
    }

    #[test]
    fn merged_date_header_occupies_block() {
        // 合并后的日期只在块的第一格有值
        let sheet = vec![header_row(&["F", "L"])];
        assert_eq!(column_letter(next_block_start(&sheet)), "R");
    }

    #[test]
    fn reuses_empty_gap() {
        let sheet = vec![header_row(&["F", "R"])];
        assert_eq!(column_letter(next_block_start(&sheet)), "L");
    }

    #[test]
    fn extends_past_sheet_width() {
        let sheet = vec![vec![CellValue::blank(), CellValue::blank(), CellValue::blank(), CellValue::blank(), CellValue::blank(), CellValue::text("2025-01-01")]];
        assert_eq!(next_block_start(&sheet), 11);
    }

    #[test]
    fn dimensions() {
        assert_eq!(
            required_dimensions(2, 5),
            SheetDimensions { rows: 10, columns: 17 }
        );
        assert_eq!(
            required_dimensions(20, 11),
            SheetDimensions { rows: 23, columns: 23 }
        );
    }
}
