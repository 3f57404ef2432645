//! Keyword and category frequency counting.
//!
//! A [`KeywordDictionary`] is an ordered mapping from category name to
//! keyword substrings. A [`KeywordCounter`] runs texts against it and
//! keeps one count per (category, keyword) entry:
//!
//! - matching is plain substring containment,
//! - a keyword counts at most once per text,
//! - a keyword listed under two categories is counted under both,
//! - a category total is always the sum of its entries.
//!
//! Rankings are by count, descending, with ties kept in registration order.
//!
//! [`KeywordDictionary::classify`] is the exclusive counterpart: a text goes
//! to the first registered category that matches, or to [`UNCLASSIFIED`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Bucket for texts no category matches.
pub const UNCLASSIFIED: &str = "other";

/// Ordered category → keywords mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordDictionary {
    categories: IndexMap<String, Vec<String>>,
}

impl KeywordDictionary {
    /// Empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category. Keywords for an existing category are appended.
    pub fn category<I, S>(mut self, name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .entry(name.into())
            .or_default()
            .extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Categories in registration order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(name, keywords)| (name.as_str(), keywords.as_slice()))
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether no category is registered.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// First category that registered `keyword`.
    pub fn category_of(&self, keyword: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| k == keyword))
            .map(|(name, _)| name.as_str())
    }

    /// First registered category with a keyword contained in `text`.
    pub fn classify(&self, text: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| !k.is_empty() && text.contains(k.as_str())))
            .map(|(name, _)| name.as_str())
    }

    /// Texts per category when each text goes to one category only.
    ///
    /// Categories keep registration order and appear only when non-empty;
    /// [`UNCLASSIFIED`] comes last.
    pub fn classify_all<'a, I>(&self, texts: I) -> IndexMap<String, usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: IndexMap<String, usize> = self
            .categories
            .keys()
            .map(|name| (name.clone(), 0))
            .chain(std::iter::once((UNCLASSIFIED.to_string(), 0)))
            .collect();
        for text in texts {
            let bucket = self.classify(text).unwrap_or(UNCLASSIFIED);
            if let Some(count) = counts.get_mut(bucket) {
                *count += 1;
            }
        }
        counts.retain(|_, count| *count > 0);
        counts
    }

    /// Per category, how many `texts` contain at least one of its keywords.
    pub fn document_frequency<'a, I>(&self, texts: I) -> IndexMap<String, usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: IndexMap<String, usize> =
            self.categories.keys().map(|name| (name.clone(), 0)).collect();
        for text in texts {
            for (name, keywords) in &self.categories {
                if keywords.iter().any(|k| text.contains(k.as_str())) {
                    counts[name.as_str()] += 1;
                }
            }
        }
        counts
    }

    /// Hook categories for post copy.
    pub fn post_copy() -> Self {
        Self::new()
            .category(
                "emotional resonance",
                ["破防", "泪目", "谁懂", "共情", "emo", "绝了", "宝藏", "惊艳", "救命", "哭了"],
            )
            .category(
                "practical value",
                ["保姆级", "手把手", "小白", "零基础", "避雷", "踩坑", "省钱", "平替", "教程", "攻略"],
            )
            .category(
                "visual appeal",
                ["绝美", "神仙", "氛围感", "高级", "ins风", "治愈", "复古", "颜值", "美哭"],
            )
            .category(
                "controversy",
                ["大胆开麦", "真实评价", "内行人", "揭秘", "争议", "吵起来", "不吐不快"],
            )
            .category(
                "lifestyle sharing",
                ["日常", "碎片", "治愈", "自律", "打卡", "经验", "复盘", "记录", "分享"],
            )
            .category(
                "number hooks",
                ["3个", "5分钟", "7天", "10款", "30秒", "100元", "一招", "三步"],
            )
            .category(
                "benefit promise",
                ["让你", "轻松", "快速", "高效", "简单", "省时", "省钱", "变美", "变瘦"],
            )
    }

    /// Title shapes.
    pub fn title_patterns() -> Self {
        Self::new()
            .category("tutorial", ["教程", "教学", "怎么", "如何"])
            .category("review", ["测评", "试穿", "实测", "开箱"])
            .category("share", ["分享", "推荐", "安利", "种草"])
            .category("question", ["？", "?", "什么", "怎么", "为什么"])
            .category("exclamation", ["！", "!", "绝了", "太", "超"])
    }

    /// Post topics, checked in order against titles.
    pub fn content_types() -> Self {
        Self::new()
            .category("food", ["美食", "吃", "餐厅", "料理"])
            .category("fashion", ["穿搭", "衣服", "时尚", "搭配"])
            .category("travel", ["旅游", "旅行", "景点", "打卡"])
            .category("beauty", ["美妆", "化妆", "护肤", "美容"])
            .category("daily life", ["生活", "日常", "vlog", "记录"])
            .category("know-how", ["学习", "知识", "干货", "教程"])
            .category("relationships", ["情感", "恋爱", "婚姻", "感情"])
            .category("humour", ["搞笑", "幽默", "段子", "笑话"])
    }

    /// Apparel product types, matched against product names.
    pub fn apparel() -> Self {
        Self::new()
            .category("short skirt", ["短裙", "半裙", "迷你裙"])
            .category("long skirt", ["长裙", "连衣裙", "裙装"])
            .category("shorts", ["短裤", "热裤"])
            .category("trousers", ["长裤", "裤子", "牛仔裤", "休闲裤", "运动裤"])
            .category("jacket", ["外套", "夹克", "jacket", "coat"])
            .category("overcoat", ["大衣", "风衣", "羽绒服"])
            .category("hoodie", ["卫衣", "hoodie"])
            .category("t-shirt", ["T恤", "T恤衫", "tee"])
            .category("shirt", ["衬衫", "衬衣", "shirt"])
            .category("sweater", ["毛衣", "针织衫", "毛衫"])
            .category("set", ["套装", "set", "套裝"])
            .category("shoes", ["鞋子", "鞋", "shoe", "sneaker"])
            .category("bag", ["包包", "包", "bag"])
            .category("hat", ["帽子", "帽", "hat", "cap"])
    }
}

/// One ranked keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordHit {
    /// The keyword
    pub keyword: String,
    /// Texts it appeared in, summed over every category listing it
    pub count: usize,
    /// First category that registered it
    pub category: String,
}

#[derive(Debug, Clone)]
struct Entry {
    category: usize,
    keyword: String,
    needle: String,
    count: usize,
}

/// Running keyword/category counts over a stream of texts.
///
/// ```rust
/// use dataprobe::analysis::{KeywordCounter, KeywordDictionary};
///
/// let dictionary = KeywordDictionary::new()
///     .category("food", ["noodle", "rice"])
///     .category("travel", ["beach"]);
/// let mut counter = KeywordCounter::new(dictionary);
/// counter.observe_all(["rice and noodle", "beach noodle noodle"]);
///
/// assert_eq!(counter.keyword_count("noodle"), 2);
/// assert_eq!(counter.category_count("food"), 3);
/// assert_eq!(counter.top_keywords(1)[0].keyword, "noodle");
/// ```
#[derive(Debug, Clone)]
pub struct KeywordCounter {
    dictionary: KeywordDictionary,
    entries: Vec<Entry>,
    case_insensitive: bool,
    documents: usize,
}

impl KeywordCounter {
    /// Counter over `dictionary`, case-sensitive.
    pub fn new(dictionary: KeywordDictionary) -> Self {
        let entries = dictionary
            .categories
            .values()
            .enumerate()
            .flat_map(|(category, keywords)| {
                keywords.iter().map(move |keyword| Entry {
                    category,
                    keyword: keyword.clone(),
                    needle: keyword.clone(),
                    count: 0,
                })
            })
            .collect();
        Self {
            dictionary,
            entries,
            case_insensitive: false,
            documents: 0,
        }
    }

    /// Match ignoring case. Must be set before observing texts.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        for entry in &mut self.entries {
            entry.needle = if enabled {
                entry.keyword.to_lowercase()
            } else {
                entry.keyword.clone()
            };
        }
        self
    }

    /// The dictionary being counted.
    pub fn dictionary(&self) -> &KeywordDictionary {
        &self.dictionary
    }

    /// Number of texts observed.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Count one text.
    pub fn observe(&mut self, text: &str) {
        self.documents += 1;
        let lowered;
        let haystack = if self.case_insensitive {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };
        for entry in &mut self.entries {
            if !entry.needle.is_empty() && haystack.contains(entry.needle.as_str()) {
                entry.count += 1;
            }
        }
    }

    /// Count every text.
    pub fn observe_all<I, S>(&mut self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for text in texts {
            self.observe(text.as_ref());
        }
    }

    /// Total for `keyword` across every category that lists it.
    pub fn keyword_count(&self, keyword: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.keyword == keyword)
            .map(|e| e.count)
            .sum()
    }

    /// Total for `category`: the sum of its keyword entries.
    pub fn category_count(&self, category: &str) -> usize {
        match self.dictionary.categories.get_index_of(category) {
            Some(index) => self
                .entries
                .iter()
                .filter(|e| e.category == index)
                .map(|e| e.count)
                .sum(),
            None => 0,
        }
    }

    /// Keyword counts within one category, in registration order.
    pub fn category_keywords(&self, category: &str) -> Vec<(&str, usize)> {
        let Some(index) = self.dictionary.categories.get_index_of(category) else {
            return Vec::new();
        };
        self.entries
            .iter()
            .filter(|e| e.category == index)
            .map(|e| (e.keyword.as_str(), e.count))
            .collect()
    }

    /// First category that registered `keyword`.
    pub fn category_of(&self, keyword: &str) -> Option<&str> {
        self.dictionary.category_of(keyword)
    }

    /// The `n` most frequent keywords that matched at least once.
    pub fn top_keywords(&self, n: usize) -> Vec<KeywordHit> {
        let mut totals: IndexMap<&str, usize> = IndexMap::new();
        for entry in &self.entries {
            *totals.entry(entry.keyword.as_str()).or_default() += entry.count;
        }

        let mut ranked: Vec<(&str, usize)> =
            totals.into_iter().filter(|(_, count)| *count > 0).collect();
        // stable: ties stay in registration order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(n)
            .map(|(keyword, count)| KeywordHit {
                keyword: keyword.to_string(),
                count,
                category: self.category_of(keyword).unwrap_or_default().to_string(),
            })
            .collect()
    }

    /// Categories that matched at least once, most frequent first.
    pub fn ranked_categories(&self) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .dictionary
            .categories
            .keys()
            .map(|name| (name.clone(), self.category_count(name)))
            .filter(|(_, count)| *count > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Sum over all category totals.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dictionary() -> KeywordDictionary {
        KeywordDictionary::new()
            .category("a", ["x", "yy"])
            .category("b", ["yy", "z"])
    }

    #[test]
    fn presence_counts_once_per_text() {
        let mut counter = KeywordCounter::new(dictionary());
        counter.observe("x x x");
        assert_eq!(counter.keyword_count("x"), 1);
        assert_eq!(counter.documents(), 1);
    }

    #[test]
    fn shared_keyword_counts_in_every_category() {
        let mut counter = KeywordCounter::new(dictionary());
        counter.observe("yy");
        assert_eq!(counter.keyword_count("yy"), 2);
        assert_eq!(counter.category_count("a"), 1);
        assert_eq!(counter.category_count("b"), 1);
        assert_eq!(counter.category_of("yy"), Some("a"));
    }

    #[test]
    fn ties_keep_registration_order() {
        let mut counter = KeywordCounter::new(dictionary());
        counter.observe("z x");
        let top: Vec<String> = counter.top_keywords(10).into_iter().map(|h| h.keyword).collect();
        assert_eq!(top, vec!["x".to_string(), "z".to_string()]);

        let categories = counter.ranked_categories();
        assert_eq!(categories, vec![("a".to_string(), 1), ("b".to_string(), 1)]);
    }

    #[test]
    fn ranking_by_count() {
        let mut counter = KeywordCounter::new(dictionary());
        counter.observe_all(["z", "z", "x"]);
        assert_eq!(counter.top_keywords(1)[0].keyword, "z");
        assert_eq!(counter.ranked_categories()[0], ("b".to_string(), 2));
        assert_eq!(counter.total(), 3);
    }

    #[test]
    fn case_insensitive_matching() {
        let dictionary = KeywordDictionary::new().category("style", ["INS风", "Emo"]);
        let mut strict = KeywordCounter::new(dictionary.clone());
        strict.observe("ins风 emo");
        assert_eq!(strict.total(), 0);

        let mut relaxed = KeywordCounter::new(dictionary).case_insensitive(true);
        relaxed.observe("ins风 emo");
        assert_eq!(relaxed.category_count("style"), 2);
    }

    #[test]
    fn unknown_category_is_zero() {
        let counter = KeywordCounter::new(dictionary());
        assert_eq!(counter.category_count("missing"), 0);
        assert!(counter.category_keywords("missing").is_empty());
        assert!(counter.top_keywords(5).is_empty());
    }

    #[test]
    fn document_frequency_counts_titles() {
        let patterns = KeywordDictionary::title_patterns();
        let counts = patterns.document_frequency(["怎么穿？", "好物分享", "随便"]);
        assert_eq!(counts["tutorial"], 1);
        assert_eq!(counts["question"], 1);
        assert_eq!(counts["share"], 1);
        assert_eq!(counts["review"], 0);
    }

    #[test]
    fn classification_takes_first_category() {
        let types = KeywordDictionary::content_types();
        // matches both fashion and travel
        assert_eq!(types.classify("旅行穿搭合集"), Some("fashion"));
        assert_eq!(types.classify("周末去景点"), Some("travel"));
        assert_eq!(types.classify("随便聊聊"), None);

        let counts = types.classify_all(["旅行穿搭合集", "周末去景点", "随便聊聊", "日常vlog"]);
        let buckets: Vec<(&str, usize)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(
            buckets,
            vec![("fashion", 1), ("travel", 1), ("daily life", 1), (UNCLASSIFIED, 1)]
        );
        assert_eq!(counts.values().sum::<usize>(), 4);
    }

    #[test]
    fn empty_keyword_never_classifies() {
        let dictionary = KeywordDictionary::new().category("blank", [""]).category("x", ["x"]);
        assert_eq!(dictionary.classify("x"), Some("x"));
        assert!(dictionary.classify_all(std::iter::empty::<&str>()).is_empty());
    }

    #[test]
    fn default_dictionaries_are_populated() {
        assert_eq!(KeywordDictionary::post_copy().len(), 7);
        assert_eq!(KeywordDictionary::apparel().category_of("连衣裙"), Some("long skirt"));
        assert_eq!(
            KeywordDictionary::post_copy().category_of("省钱"),
            Some("practical value")
        );
    }
}
