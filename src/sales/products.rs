//! Breakdown of pre-ordered products by day, seller, product type and
//! description.
//!
//! Pre-order products are named `<seller>订<description>`, e.g.
//! `小王订韩版连衣裙M`. The seller is the text before the first `订` when it
//! is one to three CJK characters. Size and colour tokens are noise for
//! grouping and are stripped before a type or description is derived.

use std::collections::BTreeMap;

use chrono::{Datelike, Local, TimeZone};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::db::ProductRecord;
use crate::analysis::keywords::KeywordDictionary;
use crate::analysis::stats;

/// Marker separating the seller from the product description.
pub const ORDER_MARKER: char = '订';

/// Bucket for names that fit no rule.
pub const OTHER: &str = "other";

/// Characters kept in a grouping description.
pub const DESCRIPTION_LEN: usize = 4;

lazy_static! {
    static ref SIZE: Regex = Regex::new(r"[SMLX\d]+码?").expect("valid regex");
    static ref COLOUR: Regex =
        Regex::new(r"[黑白红蓝绿黄紫粉灰棕米咖杏银金]色?").expect("valid regex");
    static ref NON_WORD: Regex = Regex::new(r"[\W_\d]+").expect("valid regex");
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Seller prefix of a pre-order product name, `"other"` when absent.
pub fn seller_of(name: &str) -> String {
    match name.split_once(ORDER_MARKER) {
        Some((prefix, _)) => {
            let seller = prefix.trim();
            let len = seller.chars().count();
            if (1..=3).contains(&len) && seller.chars().all(is_cjk) {
                seller.to_string()
            } else {
                OTHER.to_string()
            }
        },
        None => OTHER.to_string(),
    }
}

fn without_seller(name: &str) -> &str {
    name.split_once(ORDER_MARKER).map_or(name, |(_, rest)| rest)
}

/// `text` without size tokens (`L`, `XL`, `38码`) or colour characters.
fn strip_size_and_colour(text: &str) -> String {
    let sized = SIZE.replace_all(text, "");
    COLOUR.replace_all(&sized, "").into_owned()
}

fn first_apparel_match<'a>(
    description: &str,
    apparel: &'a KeywordDictionary,
) -> Option<(&'a str, &'a str)> {
    apparel.categories().find_map(|(category, keywords)| {
        keywords
            .iter()
            .find(|k| description.contains(k.as_str()))
            .map(|k| (category, k.as_str()))
    })
}

fn cjk_prefix(text: &str) -> Option<String> {
    let prefix: String = text.chars().filter(|c| is_cjk(*c)).take(2).collect();
    (prefix.chars().count() == 2).then_some(prefix)
}

/// Product type of `name`.
///
/// Known apparel keywords win; otherwise the first two CJK characters of
/// the description, after size and colour are stripped, stand in for the
/// type.
pub fn category_of(name: &str, apparel: &KeywordDictionary) -> String {
    let description = without_seller(name);
    if let Some((category, _)) = first_apparel_match(description, apparel) {
        return category.to_string();
    }
    cjk_prefix(&strip_size_and_colour(description)).unwrap_or_else(|| OTHER.to_string())
}

/// Short description used to group near-identical products.
///
/// The matched apparel keyword (or the derived two-character type) is
/// removed along with sizes, colours, digits and punctuation; the first
/// [`DESCRIPTION_LEN`] remaining characters are the description.
pub fn description_of(name: &str, apparel: &KeywordDictionary) -> String {
    let description = without_seller(name);
    let rest = match first_apparel_match(description, apparel) {
        Some((_, keyword)) => description.replacen(keyword, "", 1),
        None => {
            let stripped = strip_size_and_colour(description);
            match cjk_prefix(&stripped) {
                Some(prefix) => stripped.replacen(&prefix, "", 1),
                None => stripped,
            }
        },
    };
    let cleaned: String = NON_WORD
        .replace_all(&strip_size_and_colour(&rest), "")
        .chars()
        .take(DESCRIPTION_LEN)
        .collect();
    if cleaned.is_empty() {
        OTHER.to_string()
    } else {
        cleaned
    }
}

fn ranked(counts: IndexMap<String, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Counts and margins over a product list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductBreakdown {
    /// Products considered
    pub total: usize,
    /// Products per local day of month
    pub by_day: BTreeMap<u32, usize>,
    /// Products per seller, most first
    pub by_seller: Vec<(String, usize)>,
    /// Products per type, most first
    pub by_category: Vec<(String, usize)>,
    /// Products per short description, most first
    pub by_description: Vec<(String, usize)>,
    /// Mean gross margin over products with both prices set
    pub avg_margin: Option<f64>,
    /// Mean margin estimated from the sale price alone
    pub avg_estimated_margin: Option<f64>,
    /// Sum of sale prices
    pub total_sale_value: f64,
}

impl ProductBreakdown {
    /// Build the breakdown with the default apparel dictionary.
    pub fn build(products: &[ProductRecord]) -> Self {
        Self::build_with(products, &KeywordDictionary::apparel())
    }

    /// Build the breakdown with a custom type dictionary.
    pub fn build_with(products: &[ProductRecord], apparel: &KeywordDictionary) -> Self {
        let mut by_day = BTreeMap::new();
        let mut by_seller: IndexMap<String, usize> = IndexMap::new();
        let mut by_category: IndexMap<String, usize> = IndexMap::new();
        let mut by_description: IndexMap<String, usize> = IndexMap::new();
        let mut margins = Vec::new();
        let mut estimated = Vec::new();

        for product in products {
            if let Some(created) = Local.timestamp_millis_opt(product.created_ms).earliest() {
                *by_day.entry(created.day()).or_insert(0) += 1;
            }
            *by_seller.entry(seller_of(&product.name)).or_default() += 1;
            *by_category
                .entry(category_of(&product.name, apparel))
                .or_default() += 1;
            *by_description
                .entry(description_of(&product.name, apparel))
                .or_default() += 1;

            if product.purchase_price > 0.0 {
                margins.extend(stats::gross_margin(product.purchase_price, product.sale_price));
            }
            estimated.extend(stats::estimated_margin(product.sale_price));
        }

        Self {
            total: products.len(),
            by_day,
            by_seller: ranked(by_seller),
            by_category: ranked(by_category),
            by_description: ranked(by_description),
            avg_margin: stats::mean(&margins).map(stats::round2),
            avg_estimated_margin: stats::mean(&estimated).map(stats::round2),
            total_sale_value: stats::round2(products.iter().map(|p| p.sale_price).sum()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn product(name: &str, purchase: f64, sale: f64, created_ms: i64) -> ProductRecord {
        ProductRecord {
            id: name.to_string(),
            code: String::new(),
            name: name.to_string(),
            purchase_price: purchase,
            sale_price: sale,
            created_ms,
        }
    }

    #[rstest]
    #[case("小王订韩版连衣裙", "小王")]
    #[case("欧阳娜订外套", "欧阳娜")]
    #[case("欧阳娜娜订外套", "other")]
    #[case("Amy订卫衣", "other")]
    #[case("连衣裙", "other")]
    #[case("订货卫衣", "other")]
    fn sellers(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(seller_of(name), expected);
    }

    #[rstest]
    #[case("小王订韩版连衣裙M", "long skirt")]
    #[case("小王订Open风格G1143", "风格")]
    #[case("小王订G1143", OTHER)]
    #[case("小王订米杏色毛呢L", "毛呢")]
    #[case("Open风格G1143米杏L", "风格")]
    #[case("小王订黑色XL", OTHER)]
    fn categories(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(category_of(name, &KeywordDictionary::apparel()), expected);
    }

    #[rstest]
    #[case("小王订韩版连衣裙M", "韩版")]
    #[case("小王订韩版修身显瘦卫衣L", "韩版修身")]
    #[case("小李订韩版修身显瘦款卫衣XL", "韩版修身")]
    #[case("小王订毛呢大衣", "毛呢")]
    #[case("小王订米杏色毛呢半身短款", "半身短款")]
    #[case("小王订卫衣 黑色 38码", OTHER)]
    fn descriptions(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(description_of(name, &KeywordDictionary::apparel()), expected);
    }

    #[test]
    fn breakdown_counts() {
        let day_ms = Local
            .with_ymd_and_hms(2026, 2, 14, 12, 0, 0)
            .earliest()
            .unwrap()
            .timestamp_millis();
        let products = vec![
            product("小王订连衣裙", 60.0, 100.0, day_ms),
            product("小王订卫衣", 0.0, 100.0, day_ms),
            product("小李订毛衣", 80.0, 100.0, day_ms),
        ];
        let breakdown = ProductBreakdown::build(&products);

        assert_eq!(breakdown.total, 3);
        assert_eq!(breakdown.by_day.get(&14), Some(&3));
        assert_eq!(breakdown.by_seller[0], ("小王".to_string(), 2));
        assert_eq!(breakdown.avg_margin, Some(30.0));
        assert_eq!(breakdown.avg_estimated_margin, Some(50.0));
        assert_eq!(breakdown.total_sale_value, 300.0);
    }

    #[test]
    fn same_description_groups_together() {
        let products = vec![
            product("小王订韩版修身卫衣L", 0.0, 99.0, 0),
            product("小李订韩版修身卫衣黑色M", 0.0, 99.0, 0),
            product("小王订法式连衣裙", 0.0, 199.0, 0),
        ];
        let breakdown = ProductBreakdown::build(&products);
        assert_eq!(breakdown.by_description[0], ("韩版修身".to_string(), 2));
        assert_eq!(breakdown.by_description[1], ("法式".to_string(), 1));
    }
}
