//! `dataprobe` command line.
//!
//! Every command fetches, computes, prints a short summary to stdout and
//! writes its report set (JSON, plus CSV/Markdown where it has a table).
//! Logs go to stderr.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{info, warn};

use dataprobe::analysis::{
    filter_by_author, FeedSummary, KeywordCounter, KeywordDictionary, TrendSnapshot,
};
use dataprobe::client::feeds::FeedSearch;
use dataprobe::client::{McpClient, McpConfig};
use dataprobe::config::AppConfig;
use dataprobe::quotes::{
    build_providers, fetch_all, EastmoneyProvider, PriceLevels, ProviderKind, Quote, Symbol,
};
use dataprobe::sales::{
    month_range_ms, parse_year_month, ProductBreakdown, SalesDb, SalesSnapshot, SalesSummary,
};
use dataprobe::shared::logging::init_logging;
use dataprobe::{MarkdownDoc, ReportWriter};

#[derive(Parser, Debug)]
#[command(name = "dataprobe", version, about = "Feed, sales and quote probes")]
struct Cli {
    /// Configuration file (default: ./dataprobe.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report output directory
    #[arg(long, global = true, value_name = "DIR")]
    output: Option<PathBuf>,

    /// More log output; repeat for more
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Talk to the MCP automation server directly
    Mcp {
        #[command(subcommand)]
        action: McpCommand,
    },
    /// Summarize feeds fetched through the MCP server
    Feeds {
        #[command(subcommand)]
        action: FeedsCommand,
    },
    /// Query the retail SQLite export
    Sales {
        #[command(subcommand)]
        action: SalesCommand,
    },
    /// Real-time quotes for one or more symbols
    Quote(QuoteArgs),
}

#[derive(Subcommand, Debug)]
enum McpCommand {
    /// Check that the server answers `initialize`
    Ping,
    /// List the server's tools
    Tools,
    /// Call a tool and print its decoded payload
    Call {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[derive(Subcommand, Debug)]
enum FeedsCommand {
    /// Keyword and category trends over search results
    Trends {
        /// Search keyword; repeatable (default: configured keywords)
        #[arg(long = "keyword", value_name = "K")]
        keywords: Vec<String>,
        /// Feeds kept per keyword
        #[arg(long)]
        limit: Option<usize>,
        /// Sort order passed to the server
        #[arg(long)]
        sort: Option<String>,
    },
    /// Posts from one account
    Account {
        /// Account name
        name: String,
        /// Search term; repeatable (default: the account name)
        #[arg(long = "search", value_name = "TERM")]
        searches: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SalesCommand {
    /// Tables, row counts and date columns
    Tables,
    /// Products created in a month
    Products {
        /// Month as YYYY-MM
        #[arg(long)]
        month: String,
        /// Keep products whose name contains TEXT
        #[arg(long, value_name = "TEXT")]
        contains: Option<String>,
        /// Compare the same month in YEAR; repeatable
        #[arg(long = "compare", value_name = "YEAR")]
        compare: Vec<i32>,
    },
    /// Customer table overview
    Customers,
    /// Summarize hand-entered daily totals
    Summary {
        /// Snapshot JSON file
        #[arg(long, value_name = "FILE.json")]
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
struct QuoteArgs {
    /// Symbols, e.g. 300809 or sh600519
    #[arg(required = true)]
    symbols: Vec<String>,
    /// sina, tencent, eastmoney or all (default: configured providers)
    #[arg(long)]
    provider: Option<String>,
    /// Also fetch this many daily bars and compute indicators
    #[arg(long, value_name = "DAYS")]
    history: Option<u32>,
}

struct App {
    config: AppConfig,
    reports: ReportWriter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(output) = cli.output {
        config.report.output_dir = output;
    }
    config.logging.level = config.logging.level.more_verbose(cli.verbose);
    init_logging(&config.logging).map_err(|e| anyhow!(e))?;

    let reports = ReportWriter::new(&config.report.output_dir)
        .with_context(|| format!("creating {}", config.report.output_dir.display()))?
        .with_csv_bom(config.report.csv_bom);
    let app = App { config, reports };

    match cli.command {
        Command::Mcp { action } => app.mcp(action).await,
        Command::Feeds { action } => app.feeds(action).await,
        Command::Sales { action } => app.sales(action),
        Command::Quote(args) => app.quote(args).await,
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

impl App {
    fn mcp_client(&self) -> Result<McpClient> {
        let settings = &self.config.mcp;
        let url = settings
            .url
            .parse()
            .with_context(|| format!("invalid MCP url {}", settings.url))?;
        let config = McpConfig::new(url)
            .with_timeout(settings.timeout())
            .with_client_name(&settings.client_name);
        Ok(McpClient::new(config)?)
    }

    async fn connected_client(&self) -> Result<McpClient> {
        let mut client = self.mcp_client()?;
        let url = client.url().to_string();
        client
            .initialize()
            .await
            .with_context(|| format!("MCP server at {url} is not reachable"))?;
        Ok(client)
    }

    async fn mcp(&self, action: McpCommand) -> Result<()> {
        match action {
            McpCommand::Ping => {
                let client = self.mcp_client()?;
                if client.ping().await {
                    println!("{} is up", client.url());
                    Ok(())
                } else {
                    bail!("{} did not answer", client.url())
                }
            },
            McpCommand::Tools => {
                let client = self.connected_client().await?;
                let tools = client.list_tools().await?;
                for tool in &tools.tools {
                    println!(
                        "{:<24} {}",
                        tool.name,
                        tool.description.as_deref().unwrap_or_default()
                    );
                }
                println!("{} tools", tools.tools.len());
                Ok(())
            },
            McpCommand::Call { tool, args } => {
                let arguments: Value =
                    serde_json::from_str(&args).context("--args must be a JSON object")?;
                if !arguments.is_object() {
                    bail!("--args must be a JSON object");
                }
                let client = self.connected_client().await?;
                let payload = client.call_tool_json(&tool, arguments).await?;
                println!("{}", serde_json::to_string_pretty(&payload)?);
                let path = self.reports.write_json(&format!("mcp_{tool}"), &payload)?;
                println!("saved {}", path.display());
                Ok(())
            },
        }
    }

    async fn feeds(&self, action: FeedsCommand) -> Result<()> {
        let settings = &self.config.mcp;
        let client = self.connected_client().await?;

        let (stem, title, feeds) = match action {
            FeedsCommand::Trends {
                keywords,
                limit,
                sort,
            } => {
                let keywords = if keywords.is_empty() {
                    settings.search_keywords.clone()
                } else {
                    keywords
                };
                let mut search = FeedSearch::new(keywords)
                    .limit(limit.unwrap_or(settings.feeds_per_keyword))
                    .pause(settings.pause());
                if let Some(sort) = sort {
                    search = search.sort(sort);
                }
                let feeds = client.collect_feeds(&search).await;
                ("feed_trends".to_string(), "Feed trends".to_string(), feeds)
            },
            FeedsCommand::Account { name, searches } => {
                let searches = if searches.is_empty() {
                    vec![name.clone()]
                } else {
                    searches
                };
                let search = FeedSearch::new(searches)
                    .limit(settings.feeds_per_keyword)
                    .pause(settings.pause());
                let feeds = filter_by_author(&client.collect_feeds(&search).await, &name);
                info!(account = %name, feeds = feeds.len(), "filtered by account");
                (
                    "feed_account".to_string(),
                    format!("Account analysis: {name}"),
                    feeds,
                )
            },
        };

        if feeds.is_empty() {
            warn!("no feeds collected");
        }
        let summary = FeedSummary::build(&feeds, KeywordCounter::new(KeywordDictionary::post_copy()));

        println!("{title}");
        println!(
            "feeds: {}  likes: {} (avg {:.1}, p90 {:.0}, max {}, min {})",
            summary.total_feeds,
            summary.total_likes,
            summary.avg_likes,
            summary.p90_likes,
            summary.max_likes,
            summary.min_likes
        );
        for share in summary.categories.iter().take(5) {
            println!("  {:<12} {:>4}  {:>5.1}%", share.category, share.count, share.percentage);
        }

        let json_path = self
            .reports
            .write_json(&stem, &json!({ "summary": &summary, "feeds": &feeds }))?;
        let csv_path = self.reports.write_csv(
            &format!("{stem}_keywords"),
            &["keyword", "category", "count"],
            summary
                .keywords
                .iter()
                .map(|hit| vec![hit.keyword.clone(), hit.category.clone(), hit.count.to_string()]),
        )?;
        let doc = MarkdownDoc::new(title)
            .bullets([
                format!("Feeds: {}", summary.total_feeds),
                format!("Total likes: {}", summary.total_likes),
                format!("Average likes: {:.1}", summary.avg_likes),
                format!("90th percentile likes: {:.0}", summary.p90_likes),
            ])
            .heading(2, "Content types")
            .table(
                ["Type", "Feeds"],
                summary
                    .content_types
                    .iter()
                    .map(|(t, n)| vec![t.clone(), n.to_string()])
                    .collect(),
            )
            .heading(2, "Categories")
            .table(
                ["Category", "Hits", "Share"],
                summary
                    .categories
                    .iter()
                    .map(|s| vec![s.category.clone(), s.count.to_string(), format!("{:.1}%", s.percentage)])
                    .collect(),
            )
            .heading(2, "Top keywords")
            .table(
                ["Keyword", "Category", "Hits"],
                summary
                    .keywords
                    .iter()
                    .map(|h| vec![h.keyword.clone(), h.category.clone(), h.count.to_string()])
                    .collect(),
            )
            .heading(2, "Frequent words")
            .bullets(summary.words.iter().map(|(w, n)| format!("{w}: {n}")))
            .heading(2, "Most liked")
            .table(
                ["Title", "Author", "Likes"],
                summary
                    .top_feeds
                    .iter()
                    .map(|f| vec![f.title.clone(), f.author.clone(), f.likes.to_string()])
                    .collect(),
            );
        let md_path = self.reports.write_markdown(&stem, &doc)?;

        for path in [json_path, csv_path, md_path] {
            println!("saved {}", path.display());
        }
        Ok(())
    }

    fn open_db(&self) -> Result<SalesDb> {
        let path = self
            .config
            .sales
            .database
            .as_ref()
            .context("no database configured (set [sales] database or DATAPROBE_DB)")?;
        SalesDb::open(path).with_context(|| format!("opening {}", path.display()))
    }

    fn sales(&self, action: SalesCommand) -> Result<()> {
        match action {
            SalesCommand::Tables => {
                let db = self.open_db()?;
                let mut tables = Vec::new();
                for name in db.table_names()? {
                    let rows = db.row_count(&name)?;
                    let dates = db.date_columns(&name)?;
                    println!("{name:<24} {rows:>8}  {}", dates.join(", "));
                    tables.push(json!({ "table": name, "rows": rows, "date_columns": dates }));
                }
                let path = self.reports.write_json("sales_tables", &tables)?;
                println!("saved {}", path.display());
                Ok(())
            },
            SalesCommand::Products { month, contains, compare } => {
                let db = self.open_db()?;
                let (year, month_number) = parse_year_month(&month)?;
                let range = month_range_ms(year, month_number)?;
                let filter = contains.as_deref();
                let products = db.products_created_between(range.start, range.end, filter)?;
                let prices = db.product_price_stats(range, filter)?;
                let breakdown = ProductBreakdown::build(&products);

                let mut years = compare;
                if !years.is_empty() && !years.contains(&year) {
                    years.push(year);
                }
                years.sort_unstable();
                years.dedup();
                let comparison = db.month_comparison(month_number, &years, filter)?;

                println!("products created in {month}: {}", breakdown.total);
                println!(
                    "avg margin {}%  estimated {}%  sale value {:.2}",
                    fmt_opt(breakdown.avg_margin),
                    fmt_opt(breakdown.avg_estimated_margin),
                    breakdown.total_sale_value
                );
                for (seller, count) in breakdown.by_seller.iter().take(5) {
                    println!("  {seller:<8} {count:>4}");
                }
                for row in &comparison {
                    println!(
                        "  {}-{month_number:02}: {} products, {} priced, purchase {} sale {} margin {}%",
                        row.year,
                        row.total,
                        row.priced,
                        fmt_opt(row.avg_purchase),
                        fmt_opt(row.avg_sale),
                        fmt_opt(row.avg_margin)
                    );
                }

                let stem = format!("products_{month}");
                let json_path = self.reports.write_json(
                    &stem,
                    &json!({
                        "month": month,
                        "name_filter": filter,
                        "breakdown": &breakdown,
                        "prices": &prices,
                        "comparison": &comparison,
                        "products": &products,
                    }),
                )?;
                let csv_path = self.reports.write_csv(
                    &stem,
                    &["id", "code", "name", "purchase_price", "sale_price", "created_ms"],
                    products.iter().map(|p| {
                        vec![
                            p.id.clone(),
                            p.code.clone(),
                            p.name.clone(),
                            format!("{:.2}", p.purchase_price),
                            format!("{:.2}", p.sale_price),
                            p.created_ms.to_string(),
                        ]
                    }),
                )?;
                let doc = MarkdownDoc::new(format!("Products {month}"))
                    .bullets([
                        format!("Products: {}", breakdown.total),
                        format!("Average margin: {}%", fmt_opt(breakdown.avg_margin)),
                        format!("Average sale price: {}", fmt_opt(prices.avg_sale)),
                    ])
                    .heading(2, "By seller")
                    .table(
                        ["Seller", "Products"],
                        breakdown.by_seller.iter().map(|(s, n)| vec![s.clone(), n.to_string()]).collect(),
                    )
                    .heading(2, "By category")
                    .table(
                        ["Category", "Products"],
                        breakdown.by_category.iter().map(|(c, n)| vec![c.clone(), n.to_string()]).collect(),
                    )
                    .heading(2, "By description")
                    .table(
                        ["Description", "Products"],
                        breakdown.by_description.iter().map(|(c, n)| vec![c.clone(), n.to_string()]).collect(),
                    )
                    .heading(2, "By day")
                    .table(
                        ["Day", "Products"],
                        breakdown.by_day.iter().map(|(d, n)| vec![d.to_string(), n.to_string()]).collect(),
                    )
                    .heading(2, "Same month by year")
                    .table(
                        ["Year", "Products", "Priced", "Avg purchase", "Avg sale", "Margin %"],
                        comparison
                            .iter()
                            .map(|r| {
                                vec![
                                    r.year.to_string(),
                                    r.total.to_string(),
                                    r.priced.to_string(),
                                    fmt_opt(r.avg_purchase),
                                    fmt_opt(r.avg_sale),
                                    fmt_opt(r.avg_margin),
                                ]
                            })
                            .collect(),
                    );
                let md_path = self.reports.write_markdown(&stem, &doc)?;
                for path in [json_path, csv_path, md_path] {
                    println!("saved {}", path.display());
                }
                Ok(())
            },
            SalesCommand::Customers => {
                let db = self.open_db()?;
                let summary = db.customer_summary()?;
                println!("customers: {} ({} distinct names)", summary.total, summary.distinct_names);
                for customer in &summary.recent {
                    println!("  {:<12} {:<14} {}", customer.name, customer.phone, customer.created);
                }
                let path = self.reports.write_json("customers", &summary)?;
                println!("saved {}", path.display());
                Ok(())
            },
            SalesCommand::Summary { input } => {
                let text = std::fs::read_to_string(&input)
                    .with_context(|| format!("reading {}", input.display()))?;
                let snapshot = SalesSnapshot::from_json(&text)?;
                let summary = SalesSummary::from_snapshot(&snapshot);

                println!(
                    "{}: {:.2} over {} orders, {} customers",
                    summary.date, summary.total_amount, summary.orders, summary.customers
                );
                println!(
                    "average order {}  per customer {}  units {}",
                    fmt_opt(summary.average_order_value),
                    fmt_opt(summary.per_customer_spend),
                    summary.units_sold
                );
                println!(
                    "rating {} ({})  estimated profit {:.2} at {:.1}%",
                    summary.rating.as_str(),
                    summary.rating.suggestion(),
                    summary.estimated_profit.profit,
                    summary.estimated_profit.margin
                );

                let share_rows = |shares: &[dataprobe::sales::Share]| -> Vec<Vec<String>> {
                    shares
                        .iter()
                        .map(|s| vec![s.label.clone(), format!("{:.2}", s.value), format!("{:.1}%", s.percentage)])
                        .collect()
                };
                let json_path = self.reports.write_json("sales_summary", &summary)?;
                let csv_path = self.reports.write_csv(
                    "sales_summary_products",
                    &["product", "amount", "share"],
                    share_rows(&summary.product_ranking),
                )?;
                let doc = MarkdownDoc::new(format!("Sales {}", summary.date))
                    .bullets([
                        format!("Revenue: {:.2}", summary.total_amount),
                        format!("Orders: {}", summary.orders),
                        format!("Customers: {}", summary.customers),
                        format!("Average order value: {}", fmt_opt(summary.average_order_value)),
                        format!("Per-customer spend: {}", fmt_opt(summary.per_customer_spend)),
                        format!("Rating: {} ({})", summary.rating.as_str(), summary.rating.suggestion()),
                        format!(
                            "Estimated cost {:.2}, profit {:.2}",
                            summary.estimated_profit.cost, summary.estimated_profit.profit
                        ),
                    ])
                    .heading(2, "Products")
                    .table(["Product", "Amount", "Share"], share_rows(&summary.product_ranking))
                    .heading(2, "Payment methods")
                    .table(["Method", "Amount", "Share"], share_rows(&summary.payment_shares))
                    .heading(2, "Time slots")
                    .table(["Slot", "Amount", "Share"], share_rows(&summary.time_slot_shares))
                    .heading(2, "Customer types")
                    .table(["Type", "Customers", "Share"], share_rows(&summary.customer_type_shares));
                let md_path = self.reports.write_markdown("sales_summary", &doc)?;
                for path in [json_path, csv_path, md_path] {
                    println!("saved {}", path.display());
                }
                Ok(())
            },
        }
    }

    async fn quote(&self, args: QuoteArgs) -> Result<()> {
        let quotes_config = &self.config.quotes;
        let kinds = match args.provider.as_deref() {
            None => quotes_config.providers.clone(),
            Some("all") => ProviderKind::ALL.to_vec(),
            Some(name) => vec![name.parse::<ProviderKind>()?],
        };
        let providers = build_providers(&kinds, quotes_config)?;
        let history = match args.history {
            Some(_) => Some(
                EastmoneyProvider::new(
                    &quotes_config.eastmoney_url,
                    Duration::from_secs(quotes_config.timeout_secs),
                )?
                .with_history_url(&quotes_config.eastmoney_history_url)?,
            ),
            None => None,
        };

        let mut report = Vec::new();
        let mut rows: Vec<Quote> = Vec::new();
        for raw in &args.symbols {
            let symbol = Symbol::parse(raw)?;
            let quotes = fetch_all(&providers, &symbol).await;
            if quotes.is_empty() {
                warn!(%symbol, "no provider answered");
                println!("{symbol}: no data");
                continue;
            }
            for quote in &quotes {
                println!(
                    "{:<9} {:<8} {:<10} {:>8.2} {:>+7.2}%  vol {:.0}",
                    quote.provider.as_str(),
                    quote.symbol,
                    quote.name,
                    quote.price,
                    quote.change_percent().unwrap_or(0.0),
                    quote.volume
                );
            }
            let levels = PriceLevels::from_quote(&quotes[0]);
            println!(
                "  support {:.2}/{:.2}  resistance {:.2}/{:.2}",
                levels.support_1, levels.support_2, levels.resistance_1, levels.resistance_2
            );

            let trend = match (&history, args.history) {
                (Some(provider), Some(days)) => match provider.daily_bars(&symbol, days).await {
                    Ok(bars) => {
                        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
                        let trend = TrendSnapshot::from_series(&closes, &volumes);
                        if let Some(t) = &trend {
                            println!(
                                "  ma5 {}  ma20 {}  ma60 {}  rsi14 {}  drawdown {:.2}%",
                                fmt_opt(t.ma5),
                                fmt_opt(t.ma20),
                                fmt_opt(t.ma60),
                                fmt_opt(t.rsi14),
                                t.max_drawdown
                            );
                            println!(
                                "  macd {}  bollinger {}  sharpe {}  volume ratio {}",
                                t.macd.map_or_else(|| "-".to_string(), |m| format!("{:.3} ({:?})", m.macd, m.cross)),
                                t.bollinger.map_or_else(|| "-".to_string(), |b| format!("{:?}", b.position)),
                                fmt_opt(t.sharpe_ratio),
                                fmt_opt(t.volume_ratio)
                            );
                            for alert in t.alerts(quotes_config.alert_threshold_pct) {
                                warn!(%symbol, %alert, "alert");
                                println!("  ! {alert}");
                            }
                        }
                        trend
                    },
                    Err(e) => {
                        warn!(%symbol, error = %e, "history unavailable");
                        None
                    },
                },
                _ => None,
            };

            let alerts = trend
                .as_ref()
                .map(|t| t.alerts(quotes_config.alert_threshold_pct))
                .unwrap_or_default();
            report.push(json!({
                "symbol": symbol.to_string(),
                "quotes": &quotes,
                "levels": levels,
                "trend": trend,
                "alerts": alerts,
            }));
            rows.extend(quotes);
        }

        if rows.is_empty() {
            bail!("no quotes fetched");
        }
        let json_path = self.reports.write_json("quotes", &report)?;
        let csv_path = self.reports.write_csv(
            "quotes",
            &[
                "provider", "symbol", "name", "price", "change_pct", "open", "previous_close", "high",
                "low", "volume", "amount", "fetched_at",
            ],
            rows.iter().map(|q| {
                vec![
                    q.provider.to_string(),
                    q.symbol.to_string(),
                    q.name.clone(),
                    format!("{:.2}", q.price),
                    fmt_opt(q.change_percent()),
                    format!("{:.2}", q.open),
                    format!("{:.2}", q.previous_close),
                    format!("{:.2}", q.high),
                    format!("{:.2}", q.low),
                    format!("{:.0}", q.volume),
                    format!("{:.2}", q.amount),
                    q.fetched_at.to_rfc3339(),
                ]
            }),
        )?;
        for path in [json_path, csv_path] {
            println!("saved {}", path.display());
        }
        Ok(())
    }
}
