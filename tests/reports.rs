//! Written reports carry the same totals as the aggregation they came from.

use std::fs;

use dataprobe::analysis::{Feed, FeedSummary, KeywordCounter, KeywordDictionary};
use dataprobe::sales::{SalesSnapshot, SalesSummary};
use dataprobe::{MarkdownDoc, ReportWriter};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use serde_json::Value;

#[fixture]
fn snapshot() -> SalesSnapshot {
    SalesSnapshot::from_json(
        r#"{
            "date": "2026-02-14",
            "total_amount": 8560.50,
            "order_count": 32,
            "customer_count": 28,
            "products": [
                {"name": "卫衣", "quantity": 12, "amount": 2280.0},
                {"name": "羽绒服", "quantity": 4, "amount": 3196.0},
                {"name": "牛仔裤", "quantity": 15, "amount": 3084.5}
            ],
            "payment_methods": {"wechat": 5120.5, "alipay": 2840.0, "cash": 600.0},
            "time_slots": {"morning": 1860.0, "afternoon": 4200.5, "evening": 2500.0}
        }"#,
    )
    .unwrap()
}

fn csv_rows(bytes: &[u8]) -> Vec<csv::StringRecord> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    csv::Reader::from_reader(bytes)
        .records()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[rstest]
fn sales_json_round_trips(snapshot: SalesSnapshot) {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path()).unwrap();
    let summary = SalesSummary::from_snapshot(&snapshot);
    assert_eq!(summary.average_order_value, Some(267.52));

    let path = writer.write_json("sales_summary", &summary).unwrap();
    let back: SalesSummary = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(back, summary);

    let product_total: f64 = back.product_ranking.iter().map(|s| s.value).sum();
    assert!((product_total - snapshot.total_amount).abs() < 1e-9);
}

#[rstest]
#[case(false)]
#[case(true)]
fn sales_csv_round_trips(snapshot: SalesSnapshot, #[case] bom: bool) {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path()).unwrap().with_csv_bom(bom);
    let summary = SalesSummary::from_snapshot(&snapshot);

    let path = writer
        .write_csv(
            "payments",
            &["method", "amount", "share"],
            summary
                .payment_shares
                .iter()
                .map(|s| vec![s.label.clone(), s.value.to_string(), s.percentage.to_string()]),
        )
        .unwrap();

    let rows = csv_rows(&fs::read(path).unwrap());
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "wechat");
    let amount: f64 = rows.iter().map(|r| r[1].parse::<f64>().unwrap()).sum();
    let share: f64 = rows.iter().map(|r| r[2].parse::<f64>().unwrap()).sum();
    assert!((amount - 8560.5).abs() < 1e-9);
    assert!((share - 100.0).abs() < 0.05);
}

#[test]
fn feed_summary_round_trips() {
    let feeds = vec![
        Feed {
            id: "1".into(),
            title: "平价穿搭分享".into(),
            body: "学生党必看".into(),
            likes: 1200,
            ..Feed::default()
        },
        Feed {
            id: "2".into(),
            title: "显瘦穿搭".into(),
            likes: 300,
            ..Feed::default()
        },
    ];
    let summary = FeedSummary::build(&feeds, KeywordCounter::new(KeywordDictionary::post_copy()));

    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path()).unwrap();
    let path = writer.write_json("feed_trends", &summary).unwrap();
    let back: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

    assert_eq!(back["total_feeds"], 2);
    assert_eq!(back["total_likes"], 1500);
    let category_hits: u64 = back["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["count"].as_u64().unwrap())
        .sum();
    let expected: usize = summary.categories.iter().map(|c| c.count).sum();
    assert_eq!(category_hits, expected as u64);
}

#[test]
fn markdown_report_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path().join("nested/out")).unwrap();
    let doc = MarkdownDoc::new("Quotes").bullets(["sz300809 25.50"]);
    let path = writer.write_markdown("quotes", &doc).unwrap();
    assert!(path.starts_with(writer.dir()));
    assert_eq!(fs::read_to_string(path).unwrap(), "# Quotes\n\n- sz300809 25.50\n");
}
