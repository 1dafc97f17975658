//! Shutdown signal handling and operator-facing formatting helpers.

use std::time::Duration;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

/// Resolve on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// Format an amount as dollars with thousands separators, e.g. `$1,234.56`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .abs();
    let text = format!("{:.2}", rounded);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{frac_part}")
}

/// Format a fraction as a percentage with two decimals, e.g. `0.0412` -> `4.12%`.
pub fn format_percentage(fraction: Decimal) -> String {
    let pct = (fraction * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}%", pct)
}

/// Format a duration as `1h 2m 3s`, dropping leading zero units.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(dec!(1234.56)), "$1,234.56");
        assert_eq!(format_currency(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(format_currency(dec!(41.2)), "$41.20");
        assert_eq!(format_currency(dec!(0)), "$0.00");
        assert_eq!(format_currency(dec!(999)), "$999.00");
    }

    #[test]
    fn currency_handles_negatives() {
        assert_eq!(format_currency(dec!(-1020)), "-$1,020.00");
        assert_eq!(format_currency(dec!(-0.001)), "$0.00");
    }

    #[test]
    fn percentage_has_two_decimals() {
        assert_eq!(format_percentage(dec!(0.0412)), "4.12%");
        assert_eq!(format_percentage(dec!(0.25)), "25.00%");
        assert_eq!(format_percentage(dec!(-0.005)), "-0.50%");
    }

    #[test]
    fn duration_drops_leading_zero_units() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
