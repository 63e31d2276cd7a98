//! Keyword sets and the built-in alias dictionary.
//!
//! Callers pass literal keywords, alias names, or a mix. Aliases expand to
//! the literal lists in [`ALIASES`]; everything is matched later as a
//! case-insensitive substring of the normalized headline.

use itertools::Itertools;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Disease surveillance terms (Vietnamese plus common English outbreak terms).
const SEBS: &str = "Bại liệt, cúm gia cầm, dịch hạch, đậu mùa, bệnh tả, tay chân miệng, sốt phát ban, sởi, sốt xuất huyết, bạch hầu, ho gà, viêm não nhật bản, viêm não vi rút, thủy đậu, cúm A, cúm B, cúm mùa, não mô cầu, bệnh lạ, viêm phổi nặng, bệnh mới nổi, chưa rõ tác nhân gây bệnh, bùng phát ca bệnh, gia tăng số ca bệnh, gia tăng số lượng người nhập viện, hàng loạt ca bệnh, ổ dịch, vụ dịch, phản ứng nặng sau tiêm vắc xin, tử vong do bệnh truyền nhiễm, tử vong không rõ nguyên nhân, tử vong sau tiêm vắc xin, động vật ốm chết hàng loạt, gia cầm ốm chết, unknown disease, emerging disease, re-emerging disease, reemerging disease, avian influenza, H5N1, Bird Flu, Ebola, MERS, public health emergency, pandemic threat";

/// Generative AI terms.
const SGAIN: &str = "ChatGPT, OpenAI, trí tuệ nhân tạo sinh, GPT-4, học máy, chatbot, đạo đức trí tuệ nhân tạo, trợ lý ảo, học sâu, mạng nơ-ron, xử lý ngôn ngữ tự nhiên, DALL-E, công cụ trí tuệ nhân tạo, đổi mới trí tuệ nhân tạo, mô hình trí tuệ nhân tạo, Grok, Google Brain, tạo sinh văn bản, nội dung trí tuệ nhân tạo, vận hành bởi trí tuệ nhân tạo, ứng dụng trí tuệ nhân tạo, ngành công nghiệp trí tuệ nhân tạo, công nghệ trò chuyện, nhận diện giọng nói, nghiên cứu trí tuệ nhân tạo, cập nhật trí tuệ nhân tạo, mô hình transformer, học tăng cường, sáng tạo trí tuệ nhân tạo, quy định trí tuệ nhân tạo, quản trị trí tuệ nhân tạo, giáo dục trí tuệ nhân tạo, trí tuệ nhân tạo trong y tế, trí tuệ nhân tạo trong tài chính, an toàn trí tuệ nhân tạo, tạo sinh hình ảnh, mô hình ngôn ngữ, trí tuệ nhân tạo hội thoại, phương tiện tổng hợp, trí tuệ nhân tạo tương tác, doanh nghiệp trí tuệ nhân tạo, giải pháp trí tuệ nhân tạo, phát triển trí tuệ nhân tạo, tự động hóa trí tuệ nhân tạo, trò chuyện trí tuệ nhân tạo, ngôn ngữ trí tuệ nhân tạo, trí tuệ nhân tạo tự trị, mô hình ngôn ngữ lớn, bots trí tuệ nhân tạo, tiến bộ trí tuệ nhân tạo, triển khai trí tuệ nhân tạo, trí tuệ nhân tạo";

/// Alias name (lower-case) → comma-separated keyword list.
pub static ALIASES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("sebs", SEBS), ("sgain", SGAIN)]));

/// Ordered, immutable list of literal keywords for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    /// Caller tokens as given, trimmed, before alias expansion.
    tokens: Vec<String>,
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordSet {
    /// Expand raw caller tokens into literal keywords.
    ///
    /// Alias lookup is case-insensitive. Non-alias tokens keep their original
    /// case (trimmed). Empty tokens are dropped since an empty keyword would
    /// match every headline.
    pub fn expand<I, S>(raw_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens = Vec::new();
        let mut keywords = Vec::new();
        for token in raw_keywords {
            let token = token.as_ref().trim();
            if !token.is_empty() {
                tokens.push(token.to_string());
            }
            match ALIASES.get(token.to_lowercase().as_str()) {
                Some(expansion) => keywords.extend(
                    expansion
                        .split(',')
                        .map(str::trim)
                        .filter(|kw| !kw.is_empty())
                        .map(str::to_string),
                ),
                None if !token.is_empty() => keywords.push(token.to_string()),
                None => {}
            }
        }

        let lowered = keywords.iter().map(|kw| kw.to_lowercase()).collect();
        Self {
            tokens,
            keywords,
            lowered,
        }
    }

    /// The first keyword contained in `normalized_title` (already lower-cased),
    /// in set order. `None` means the headline does not match.
    pub fn first_match(&self, normalized_title: &str) -> Option<&str> {
        self.lowered
            .iter()
            .position(|kw| normalized_title.contains(kw.as_str()))
            .map(|i| self.keywords[i].as_str())
    }

    /// Non-empty caller tokens, aliases unexpanded.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.keywords.iter().map(|kw| format!("'{kw}'")).join(", "))
    }
}

/// Split the `--keywords` argument on commas, trimming and dropping empties.
pub fn split_keyword_arg(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(str::trim)
        .filter(|kw| !kw.is_empty())
        .map(str::to_string)
        .collect()
}
