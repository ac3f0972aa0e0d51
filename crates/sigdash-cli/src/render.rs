//! Plain-text rendering of view state.

use sigdash_client::{format_file_size, BacktestResult, ChartData, DashboardStats, StrategyFile};
use sigdash_core::{
    format_profit_loss_ratio, format_signal_time, minimum_fetch_frequency, CollectionSettings,
    Signal,
};
use sigdash_view::SignalViewState;
use std::fmt::Write;
use std::ops::RangeInclusive;

/// One row per signal.
pub fn signal_table(signals: &[Signal]) -> String {
    let mut out = format!(
        "{:<20} {:<10} {:<5} {:>14} {:>9} {:<12} {:<14} {}\n",
        "TIME", "SYMBOL", "SIDE", "PRICE", "P/L", "EXCHANGE", "STRATEGY", "ID"
    );
    for s in signals {
        let _ = writeln!(
            out,
            "{:<20} {:<10} {:<5} {:>14} {:>9} {:<12} {:<14} {}",
            format_signal_time(s.signal_time),
            s.symbol,
            s.side.to_string(),
            s.price.normalize().to_string(),
            format_profit_loss_ratio(s.profit_loss_ratio),
            s.exchange,
            s.strategy.as_deref().unwrap_or("-"),
            s.id
        );
    }
    if signals.is_empty() {
        out.push_str("(no signals)\n");
    }
    out
}

/// Pager line, e.g. `« [3] 4 5 6 7 »  page 3/12`.
pub fn pager(current: u32, total: u32, window: RangeInclusive<u32>) -> String {
    if window.is_empty() {
        return "page 1/0".to_string();
    }
    let mut out = String::new();
    out.push_str(if current > 1 { "« " } else { "  " });
    for page in window {
        if page == current {
            let _ = write!(out, "[{page}] ");
        } else {
            let _ = write!(out, "{page} ");
        }
    }
    out.push_str(if current < total { "»" } else { " " });
    let _ = write!(out, "  page {current}/{total}");
    out
}

/// Signal list with filter summary and pager.
pub fn signal_view(state: &SignalViewState, window: RangeInclusive<u32>) -> String {
    let mut out = String::new();
    let active = state.criteria.active_count();
    if active > 0 {
        let filters: Vec<String> = state
            .criteria
            .query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        let _ = writeln!(out, "filters ({active}): {}", filters.join(" "));
    }
    out.push_str(&signal_table(state.page.items()));
    out.push_str(&pager(
        state.page.current_page(),
        state.page.total_pages(),
        window,
    ));
    if state.loading {
        out.push_str("  (loading)");
    }
    out.push('\n');
    if let Some(selected) = &state.selected {
        out.push_str(&signal_detail(selected));
    }
    out
}

pub fn signal_detail(s: &Signal) -> String {
    let opt = |v: Option<rust_decimal::Decimal>| {
        v.map(|d| d.normalize().to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let mut out = String::new();
    let _ = writeln!(out, "--- signal {} ---", s.id);
    let _ = writeln!(out, "symbol      {} ({})", s.symbol, s.exchange);
    let _ = writeln!(out, "side        {}", s.side);
    let _ = writeln!(out, "price       {}", s.price.normalize());
    let _ = writeln!(out, "buy price   {}", opt(s.buy_price));
    let _ = writeln!(out, "take profit {}", opt(s.take_profit));
    let _ = writeln!(out, "stop loss   {}", opt(s.stop_loss));
    let _ = writeln!(out, "p/l ratio   {}", format_profit_loss_ratio(s.profit_loss_ratio));
    let _ = writeln!(out, "time        {}", format_signal_time(s.signal_time));
    let _ = writeln!(out, "strategy    {}", s.strategy.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "expiration  {}", s.expiration.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "remark      {}", s.remark.as_deref().unwrap_or("-"));
    out
}

pub fn settings(settings: &CollectionSettings, available_exchanges: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "mode            {}", settings.crypto_mode);
    let _ = writeln!(out, "coins ({})       {}", settings.crypto_symbols.len(), settings.crypto_symbols.join(", "));
    let _ = writeln!(out, "exchanges       {}", settings.exchange_types.join(", "));
    if !available_exchanges.is_empty() {
        let _ = writeln!(out, "available       {}", available_exchanges.join(", "));
    }
    let _ = writeln!(out, "proxies         {}", settings.proxies.len());
    for proxy in &settings.proxies {
        let _ = writeln!(out, "  - {}", proxy.uri());
    }
    let _ = writeln!(
        out,
        "fetch frequency {} min (minimum {} min)",
        settings.fetch_frequency_minutes,
        minimum_fetch_frequency(settings)
    );
    out
}

pub fn stats(stats: &DashboardStats, fallback: bool) -> String {
    let change = |c: &Option<String>| c.as_deref().map(|c| format!(" ({c})")).unwrap_or_default();
    let mut out = String::new();
    let _ = writeln!(out, "total signals  {}{}", stats.total_signals, change(&stats.total_change));
    let _ = writeln!(out, "buy signals    {}{}", stats.buy_signals, change(&stats.buy_change));
    let _ = writeln!(out, "sell signals   {}{}", stats.sell_signals, change(&stats.sell_change));
    let _ = writeln!(out, "active pairs   {}{}", stats.active_pairs, change(&stats.pairs_change));
    if fallback {
        out.push_str("(derived from loaded signals)\n");
    }
    out
}

pub fn chart(chart: &ChartData) -> String {
    let mut out = format!("{:<8} {:>6} {:>6}\n", "MONTH", "BUY", "SELL");
    for (i, label) in chart.labels.iter().enumerate() {
        let buy = chart.buy_data.get(i).copied().unwrap_or(0);
        let sell = chart.sell_data.get(i).copied().unwrap_or(0);
        let _ = writeln!(out, "{label:<8} {buy:>6} {sell:>6}");
    }
    out
}

pub fn strategy_table(strategies: &[StrategyFile]) -> String {
    let mut out = format!(
        "{:>5} {:<28} {:<9} {:>10} {}\n",
        "ID", "NAME", "STATUS", "SIZE", "UPLOADED"
    );
    for s in strategies {
        let _ = writeln!(
            out,
            "{:>5} {:<28} {:<9} {:>10} {}",
            s.id,
            s.display_label(),
            s.status.label(),
            s.file_size.map(format_file_size).unwrap_or_else(|| "-".to_string()),
            s.upload_time
                .map(format_signal_time)
                .unwrap_or_else(|| "-".to_string())
        );
    }
    out
}

pub fn backtest(result: &BacktestResult) -> String {
    let num = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} on {} ({} → {})",
        result.strategy_name.as_deref().unwrap_or("-"),
        result.symbol.as_deref().unwrap_or("-"),
        result.start_date.as_deref().unwrap_or("-"),
        result.end_date.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "balance        {} → {}", num(result.initial_balance), num(result.final_balance));
    let _ = writeln!(out, "return         {}%", num(result.total_return_pct));
    let _ = writeln!(out, "max drawdown   {}%", num(result.max_drawdown_pct));
    let _ = writeln!(out, "sharpe         {}", num(result.sharpe_ratio));
    let _ = writeln!(
        out,
        "trades         {} ({} won / {} lost, win rate {}%)",
        result.total_trades.unwrap_or(0),
        result.winning_trades.unwrap_or(0),
        result.losing_trades.unwrap_or(0),
        num(result.win_rate)
    );
    let _ = writeln!(out, "profit factor  {}", num(result.profit_factor));
    out
}
