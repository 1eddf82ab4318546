//! 同一个词中两个 n-gram 的出现位置相互干扰的程度

/// 计算 `a` 的出现与 `b` 的出现互相重叠的位置对所占的比例。
///
/// `a` 长度为 `na`，在词中的起始位置为 `ia`；`b` 同理。
/// 每一对位置 (i1, i2) 计 0 或 1：
///
/// - `a` 落在 `b` 内（含相等）：1；
/// - `b` 严格落在 `a` 内：0，这一方向不计；
/// - 两者部分重叠：1；
/// - 不相交（包括首尾相接）：0。
///
/// 结果是计数除以位置对的总数，取值 [0, 1]。
pub fn overlap(na: usize, ia: &[u32], nb: usize, ib: &[u32]) -> f64 {
    if ia.is_empty() || ib.is_empty() {
        return 0.;
    }
    let hits = ia
        .iter()
        .flat_map(|&i1| ib.iter().map(move |&i2| (i1 as usize, i2 as usize)))
        .filter(|&(i1, i2)| interferes(i1, na, i2, nb))
        .count();
    hits as f64 / (ia.len() * ib.len()) as f64
}

#[inline]
fn interferes(i1: usize, n1: usize, i2: usize, n2: usize) -> bool {
    if i2 <= i1 && i1 + n1 <= i2 + n2 {
        true
    } else if i1 <= i2 && i2 + n2 <= i1 + n1 {
        false
    } else {
        (i1 <= i2 && i2 < i1 + n1) || (i2 <= i1 && i1 < i2 + n2)
    }
}
