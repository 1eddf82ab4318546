//! Reversible whole-text tokenizer.
//!
//! Text is split where the Unicode character class changes. Each space is
//! cut in two halves, one kept by the token on either side, so joining the
//! tokens and halving every run of spaces gives the original text back.
//! Optional decapitalisation moves a leading capital into a marker character.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// 半个空格
pub const HALF: char = ' ';
/// 大写标记，位于 Unicode 私用区
pub const CAP: char = '\u{e302}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenizeOptions {
    /// 将首字母大写的词转为小写并加上 [`CAP`] 标记
    pub decapitalize: bool,
    /// 相邻的标点各自成词
    pub split_punctuation: bool,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            decapitalize: false,
            split_punctuation: true,
        }
    }
}

/// 按 Unicode 大类匹配单个字符，捕获组的序号即类别
static CLASSES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)([\p{L}\p{M}])|(\p{N})|(\p{S})|(\p{P})|(\p{Z})|(.)").unwrap()
});
static HALVES: LazyLock<Regex> = LazyLock::new(|| Regex::new(" +").unwrap());
static CAPITALS: LazyLock<Regex> = LazyLock::new(|| Regex::new("(?s)\u{e302}(.)").unwrap());

/// 各类别的优先级：字母 7，数字 5，符号 3，标点 1，分隔符 -1，其他 -3
const PRIORITY: [i8; 6] = [7, 5, 3, 1, -1, -3];

fn classify(text: &str) -> impl Iterator<Item = (char, i8)> + '_ {
    CLASSES.captures_iter(text).filter_map(|caps| {
        let c = caps.get(0)?.as_str().chars().next()?;
        let group = (1..=PRIORITY.len()).find(|&i| caps.get(i).is_some())?;
        Some((c, PRIORITY[group - 1]))
    })
}

pub fn tokenize(text: &str, options: TokenizeOptions) -> Vec<String> {
    let mut toks = vec![String::new()];
    // None 表示刚经过一个空格
    let mut current = Some(0i8);
    for (c, class) in classify(text) {
        let last = toks.len() - 1;
        if c == HALF {
            toks[last].push(HALF);
            toks.push(HALF.to_string());
            current = None;
            continue;
        }
        match current {
            None => toks[last].push(c),
            Some(cur) if class == cur && (class > 2 || !options.split_punctuation) => {
                toks[last].push(c)
            }
            Some(cur) if class <= 0 && cur <= 0 => toks.push(c.to_string()),
            Some(cur) if class <= cur => {
                toks[last].push(HALF);
                toks.push(c.to_string())
            }
            Some(_) => toks.push(format!("{HALF}{c}")),
        }
        current = Some(class);
    }

    if toks[0].is_empty() {
        toks.remove(0);
    }
    if current.is_some_and(|cur| cur > 0) {
        if let Some(last) = toks.last_mut() {
            last.push(HALF)
        }
    }
    if options.decapitalize {
        toks.iter().map(|tok| decapitalize(tok)).collect()
    } else {
        toks
    }
}

/// `Hello` -> CAP + `hello`; tokens not in title case are kept as they are.
pub fn decapitalize(tok: &str) -> String {
    let (pre, rest) = match tok.strip_prefix(HALF) {
        Some(rest) => (&tok[..HALF.len_utf8()], rest),
        None => ("", tok),
    };
    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return tok.to_string();
    };
    if is_lower(first) {
        return tok.to_string();
    }
    if is_upper(first) && chars.clone().next().is_none_or(|c| !is_upper(c)) {
        let lower = first.to_lowercase().collect::<String>();
        format!("{CAP}{pre}{lower}{}", chars.as_str())
    } else {
        tok.to_string()
    }
}

/// Inverse of [`tokenize`], with or without decapitalisation.
pub fn detokenize<S: AsRef<str>>(tokens: impl IntoIterator<Item = S>) -> String {
    let text = tokens
        .into_iter()
        .fold(String::new(), |mut acc, tok| {
            acc.push_str(tok.as_ref());
            acc
        })
        .replace(&format!("{CAP}{HALF}"), &format!("{HALF}{CAP}"));
    let text = HALVES.replace_all(&text, |caps: &Captures| " ".repeat(caps[0].len() / 2));
    CAPITALS
        .replace_all(&text, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

#[inline]
fn is_lower(c: char) -> bool {
    c.to_lowercase().eq([c])
}

#[inline]
fn is_upper(c: char) -> bool {
    c.to_uppercase().eq([c])
}
