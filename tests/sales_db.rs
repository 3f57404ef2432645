//! Queries against a throwaway copy of the shop database.

use chrono::{Local, TimeZone};
use dataprobe::sales::{month_range_ms, ProductBreakdown, SalesDb};
use dataprobe::Error;
use pretty_assertions::assert_eq;
use rusqlite::{params, Connection};
use tempfile::TempDir;

fn ms(y: i32, m: u32, d: u32, h: u32) -> i64 {
    Local
        .with_ymd_and_hms(y, m, d, h, 0, 0)
        .earliest()
        .unwrap()
        .timestamp_millis()
}

fn fixture() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE spu (id TEXT, code TEXT, name TEXT, purPrice REAL, stdprice1 REAL, createdDate INTEGER);
         CREATE TABLE sku (id TEXT, tenantSpuId TEXT, purPrice REAL, stdprice1 REAL);
         CREATE TABLE customer (name TEXT, phone TEXT, createdDate TEXT);",
    )
    .unwrap();

    let products = [
        ("p1", "A001", "小王订卫衣", 60.0, 150.0, ms(2026, 2, 3, 10)),
        ("p2", "A002", "小王订牛仔裤", 80.0, 200.0, ms(2026, 2, 3, 15)),
        ("p3", "A003", "李姐订羽绒服", 0.0, 500.0, ms(2026, 2, 14, 9)),
        ("p4", "A004", "库存连衣裙", 100.0, 260.0, ms(2026, 2, 28, 23)),
        ("p5", "A005", "小王订卫衣", 60.0, 150.0, ms(2026, 3, 1, 0)),
        ("p6", "A006", "一月旧款", 30.0, 90.0, ms(2026, 1, 31, 23)),
        ("p7", "A007", "小李订毛衣", 50.0, 100.0, ms(2025, 2, 10, 12)),
        ("p8", "A008", "小李订外套", 0.0, 300.0, ms(2025, 2, 20, 12)),
        ("p9", "A009", "库存毛衣", 40.0, 80.0, ms(2025, 2, 21, 12)),
    ];
    for (id, code, name, purchase, sale, created) in products {
        conn.execute(
            "INSERT INTO spu VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, code, name, purchase, sale, created],
        )
        .unwrap();
    }
    for (id, spu, purchase, sale) in [("s1", "p1", 60.0, 150.0), ("s2", "p1", 62.0, 155.0), ("s3", "p2", 80.0, 200.0)] {
        conn.execute("INSERT INTO sku VALUES (?1, ?2, ?3, ?4)", params![id, spu, purchase, sale])
            .unwrap();
    }
    for (name, phone, created) in [
        ("张三", "13800000001", "2026-01-02"),
        ("李四", "13800000002", "2026-01-05"),
        ("张三", "13800000003", "2026-02-01"),
    ] {
        conn.execute("INSERT INTO customer VALUES (?1, ?2, ?3)", params![name, phone, created])
            .unwrap();
    }
    drop(conn);
    (dir, path)
}

#[test]
fn lists_tables_and_date_columns() {
    let (_dir, path) = fixture();
    let db = SalesDb::open(&path).unwrap();
    assert_eq!(db.table_names().unwrap(), vec!["customer", "sku", "spu"]);
    assert_eq!(db.row_count("spu").unwrap(), 9);
    assert_eq!(db.date_columns("spu").unwrap(), vec!["createdDate"]);
    assert!(matches!(db.row_count("orders"), Err(Error::NotFound(_))));
}

#[test]
fn month_filter_is_half_open() {
    let (_dir, path) = fixture();
    let db = SalesDb::open(&path).unwrap();
    let feb = month_range_ms(2026, 2).unwrap();

    let products = db.products_created_between(feb.start, feb.end, None).unwrap();
    let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p4", "p3", "p2", "p1"]);

    let ordered = db
        .products_created_between(feb.start, feb.end, Some("订"))
        .unwrap();
    assert_eq!(ordered.len(), 3);
}

#[test]
fn price_stats_skip_missing_prices() {
    let (_dir, path) = fixture();
    let db = SalesDb::open(&path).unwrap();
    let stats = db.product_price_stats(month_range_ms(2026, 2).unwrap(), None).unwrap();
    assert_eq!(stats.count, 3);
    assert_eq!(stats.avg_purchase, Some(80.0));
    assert_eq!(stats.min_sale, Some(150.0));
    assert_eq!(stats.max_sale, Some(260.0));

    let empty = db.product_price_stats(month_range_ms(2025, 6).unwrap(), None).unwrap();
    assert_eq!(empty.count, 0);
    assert_eq!(empty.avg_sale, None);
}

#[test]
fn breakdown_of_a_month() {
    let (_dir, path) = fixture();
    let db = SalesDb::open(&path).unwrap();
    let feb = month_range_ms(2026, 2).unwrap();
    let products = db.products_created_between(feb.start, feb.end, None).unwrap();
    let breakdown = ProductBreakdown::build(&products);

    assert_eq!(breakdown.total, 4);
    assert_eq!(breakdown.by_day.get(&3), Some(&2));
    assert_eq!(breakdown.by_seller[0], ("小王".to_string(), 2));
    assert_eq!(breakdown.total_sale_value, 1110.0);
}

#[test]
fn customers_and_skus() {
    let (_dir, path) = fixture();
    let db = SalesDb::open(&path).unwrap();

    let customers = db.customer_summary().unwrap();
    assert_eq!(customers.total, 3);
    assert_eq!(customers.distinct_names, 2);
    assert_eq!(customers.recent[0].phone, "13800000003");

    let skus = db.skus_for_product("p1").unwrap();
    assert_eq!(skus.len(), 2);
    assert_eq!(skus[1].sale_price, 155.0);
    assert!(db.skus_for_product("p9").unwrap().is_empty());
}

#[test]
fn price_stats_follow_the_name_filter() {
    let (_dir, path) = fixture();
    let db = SalesDb::open(&path).unwrap();
    let feb = month_range_ms(2026, 2).unwrap();

    let ordered = db.products_created_between(feb.start, feb.end, Some("订")).unwrap();
    let priced = ordered
        .iter()
        .filter(|p| p.purchase_price > 0.0 && p.sale_price > 0.0)
        .count();

    let stats = db.product_price_stats(feb, Some("订")).unwrap();
    assert_eq!(stats.count, priced as u64);
    assert_eq!(stats.count, 2);
    assert_eq!(stats.avg_sale, Some(175.0));
    assert_eq!(stats.max_sale, Some(200.0));
}

#[test]
fn same_month_across_years() {
    let (_dir, path) = fixture();
    let db = SalesDb::open(&path).unwrap();

    let rows = db.month_comparison(2, &[2024, 2025, 2026], Some("订")).unwrap();
    let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![2024, 2025, 2026]);

    assert_eq!(rows[0].total, 0);
    assert_eq!(rows[0].avg_sale, None);
    assert_eq!(rows[0].avg_margin, None);

    // 2025: 小李订毛衣 priced, 小李订外套 sale price only
    assert_eq!(rows[1].total, 2);
    assert_eq!(rows[1].priced, 1);
    assert_eq!(rows[1].avg_purchase, Some(50.0));
    assert_eq!(rows[1].avg_sale, Some(200.0));
    assert_eq!(rows[1].avg_margin, Some(75.0));

    assert_eq!(rows[2].total, 3);
    assert_eq!(rows[2].priced, 2);
    assert_eq!(rows[2].avg_purchase, Some(70.0));
    assert_eq!(rows[2].avg_sale, Some(283.33));

    let everything = db.month_comparison(2, &[2025], None).unwrap();
    assert_eq!(everything[0].total, 3);
}
