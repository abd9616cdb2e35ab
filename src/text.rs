//! Text normalization and tokenization for the lexical index.
//!
//! The knowledge base is predominantly Chinese legal text with occasional
//! Latin terms. CJK runs are segmented into overlapping character bigrams;
//! ASCII/Latin runs are kept as whole words. Stop words (function particles
//! in Chinese, filler words in English) are removed after segmentation.

/// Chinese function characters that carry no retrieval signal.
const CJK_STOP_CHARS: &str =
    "的了是在我有和就不人都一上也很到说要去你会着看好这那吗呢啊吧嘛与及或被把";

/// Multi-character Chinese stop words checked against whole bigrams.
const CJK_STOP_WORDS: &[&str] = &["一个", "没有", "自己", "什么", "怎么", "可以", "如果"];

/// English stop words, matched against whole lowercase tokens.
const ASCII_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "and", "or", "is", "are", "was", "be", "in", "on", "for",
    "with", "how", "what", "do", "does", "can", "i", "my",
];

/// Lowercase and collapse internal whitespace; the result is the cache key
/// for query vectors and the input to `tokenize`.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'      // CJK Unified Ideographs
        | '\u{3400}'..='\u{4DBF}'    // Extension A
        | '\u{F900}'..='\u{FAFF}'    // Compatibility Ideographs
    )
}

fn is_cjk_stop_char(c: char) -> bool {
    CJK_STOP_CHARS.contains(c)
}

fn is_stop_token(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next(), chars.next()) {
        // Single CJK character
        (Some(c), None, _) if is_cjk(c) => is_cjk_stop_char(c),
        // CJK bigram: drop when both halves are function characters, or the
        // pair is a known stop word
        (Some(a), Some(b), None) if is_cjk(a) && is_cjk(b) => {
            (is_cjk_stop_char(a) && is_cjk_stop_char(b)) || CJK_STOP_WORDS.contains(&token)
        }
        _ => ASCII_STOP_WORDS.contains(&token),
    }
}

/// Segment normalized text into index terms.
///
/// CJK runs become overlapping bigrams (a run of one character stays a
/// unigram); contiguous alphanumeric runs become single tokens; everything
/// else (punctuation, symbols) is a separator. An all-stop-word input
/// produces an empty token list, which the lexical index scores as 0.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut cjk_run: Vec<char> = Vec::new();
    let mut word = String::new();

    let mut flush_cjk = |run: &mut Vec<char>, out: &mut Vec<String>| {
        match run.len() {
            0 => {}
            1 => out.push(run[0].to_string()),
            n => {
                for i in 0..n - 1 {
                    out.push(format!("{}{}", run[i], run[i + 1]));
                }
            }
        }
        run.clear();
    };

    for c in text.chars() {
        if is_cjk(c) {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            cjk_run.push(c);
        } else if c.is_alphanumeric() {
            flush_cjk(&mut cjk_run, &mut tokens);
            word.push(c);
        } else {
            flush_cjk(&mut cjk_run, &mut tokens);
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
        }
    }
    flush_cjk(&mut cjk_run, &mut tokens);
    if !word.is_empty() {
        tokens.push(word);
    }

    tokens.retain(|t| !is_stop_token(t));
    tokens
}

/// Normalize then tokenize in one step.
pub fn terms(text: &str) -> Vec<String> {
    tokenize(&normalize(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Labor   Contract\tDispute "), "labor contract dispute");
    }

    #[test]
    fn test_cjk_bigrams() {
        let tokens = tokenize("劳动合同");
        assert_eq!(tokens, vec!["劳动", "动合", "合同"]);
    }

    #[test]
    fn test_mixed_cjk_and_ascii() {
        let tokens = tokenize("合同law纠纷");
        assert!(tokens.contains(&"合同".to_string()));
        assert!(tokens.contains(&"law".to_string()));
        assert!(tokens.contains(&"纠纷".to_string()));
        // No bigram spans the ASCII boundary
        assert!(!tokens.iter().any(|t| t.contains('l') && t.chars().any(|c| c > '\u{4E00}')));
    }

    #[test]
    fn test_punctuation_breaks_runs() {
        let tokens = tokenize("违约，责任");
        assert_eq!(tokens, vec!["违约", "责任"]);
    }

    #[test]
    fn test_stop_word_only_query_is_empty() {
        assert!(tokenize("的了吗？").is_empty());
        assert!(tokenize("the of and").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_single_cjk_char_run() {
        // Meaningful single character between punctuation survives
        let tokens = tokenize("诉。");
        assert_eq!(tokens, vec!["诉"]);
    }

    #[test]
    fn test_terms_end_to_end() {
        let t = terms("  劳动合同违约怎么办  ");
        assert!(t.contains(&"劳动".to_string()));
        assert!(t.contains(&"违约".to_string()));
        assert!(!t.contains(&"怎么".to_string()));
    }
}
