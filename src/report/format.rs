//! Formatted terminal output for ingest runs, aggregated views and price trends.

use crate::app::pipeline::IngestOutcome;
use crate::domain::{AggregatedRow, AggregationRequest, PriceRow};
use crate::io::ingest::IngestedFeed;
use crate::report::Movers;

/// Rows and errors shown before truncating.
const MAX_ROW_ERRORS: usize = 10;

pub fn format_ingest_summary(feed: &IngestedFeed, outcome: &IngestOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== tflow ingest: {} ===\n", outcome.source.display_name()));
    out.push_str(&format!(
        "Rows: read={} kept={} dropped={} errors={}\n",
        feed.rows_read,
        outcome.records,
        feed.rows_dropped,
        feed.row_errors.len()
    ));
    if outcome.facts_skipped {
        out.push_str(&format!(
            "Facts: table '{}' already exists, nothing written (use --update to append)\n",
            outcome.source.fact_table()
        ));
    } else {
        out.push_str(&format!(
            "Facts: {} written to '{}'\n",
            outcome.facts_written,
            outcome.source.fact_table()
        ));
    }
    for e in feed.row_errors.iter().take(MAX_ROW_ERRORS) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if feed.row_errors.len() > MAX_ROW_ERRORS {
        out.push_str(&format!("  ... {} more\n", feed.row_errors.len() - MAX_ROW_ERRORS));
    }
    out
}

/// Aggregated view; at most `top_n` rows, most recent last.
pub fn format_aggregated(
    rows: &[AggregatedRow],
    request: &AggregationRequest,
    top_n: usize,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} / {} ({} rows) ===\n",
        request.period.as_str(),
        request.level.as_str(),
        rows.len()
    ));
    let Some(first) = rows.first() else {
        return out;
    };

    let mut header = String::new();
    let mut rule = String::new();
    for c in first.columns {
        header.push_str(&format!("{:>10} ", c.name()));
        rule.push_str(&format!("{:-<10} ", ""));
    }
    header.push_str(&format!(
        "{:>16} {:>16} {:>16} {:>16}",
        "imports", "exports", "net_value", "net_qty"
    ));
    rule.push_str(&format!("{:-<16} {:-<16} {:-<16} {:-<16}", "", "", "", ""));
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    let skip = rows.len().saturating_sub(top_n);
    if skip > 0 {
        out.push_str(&format!("  ... {skip} earlier rows\n"));
    }
    for r in &rows[skip..] {
        let mut line = String::new();
        for k in &r.key {
            let cell = k.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
            line.push_str(&format!("{cell:>10} "));
        }
        line.push_str(&format!(
            "{:>16.2} {:>16.2} {:>16.2} {:>16.2}",
            r.imports, r.exports, r.net_value, r.net_qty
        ));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Latest-period price table plus year-over-year movers.
pub fn format_prices(rows: &[PriceRow], movers: &Movers) -> String {
    let mut out = String::new();
    let latest = rows.iter().map(|r| r.date).max();
    out.push_str(&format!(
        "=== price trends ({} rows, latest {}) ===\n",
        rows.len(),
        latest.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    ));

    out.push_str("\nTop rising (YoY moving import price):\n");
    out.push_str(&format_price_table(&movers.rising));
    out.push_str("\nTop falling (YoY moving import price):\n");
    out.push_str(&format_price_table(&movers.falling));
    out
}

fn format_price_table(rows: &[PriceRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<6} {:>12} {:>12} {:>12} {:>6} {:>10}\n",
            "hs4", "price_imp", "moving_imp", "band_upper", "rank", "yoy"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<6} {:-<12} {:-<12} {:-<12} {:-<6} {:-<10}\n",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<6} {:>12.4} {:>12.4} {:>12.4} {:>6} {:>10}\n",
                r.hs4,
                r.price_imports,
                r.moving_price_imports,
                r.upper_band_imports,
                r.rank_imports,
                fmt_pct(r.pct_change_imports_year_over_year),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{:+.1}%", x * 100.0),
        None => "-".to_string(),
    }
}
