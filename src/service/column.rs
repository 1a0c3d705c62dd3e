/// 列字母 -> 从 0 开始的列号 (A=0, Z=25, AA=26)
pub fn column_index(letters: &str) -> usize {
    let n = letters.chars().fold(0usize, |acc, c| {
        let digit = (c.to_ascii_uppercase() as usize).saturating_sub('A' as usize) + 1;
        acc * 26 + digit
    });
    n.saturating_sub(1)
}

/// 列号 -> 列字母, 与 `column_index` 互逆
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index as i64;
    while n >= 0 {
        letters.push((b'A' + (n % 26) as u8) as char);
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_letters() {
        assert_eq!(column_index("A"), 0);
        assert_eq!(column_index("F"), 5);
        assert_eq!(column_index("Z"), 25);
        assert_eq!(column_index("AA"), 26);
        assert_eq!(column_index("ab"), 27);
        assert_eq!(column_letter(5), "F");
        assert_eq!(column_letter(11), "L");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn round_trip() {
        for n in 0..20_000 {
            assert_eq!(column_index(&column_letter(n)), n, "column {}", n);
        }
    }
}
