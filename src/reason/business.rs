//! Business-impact phrasing for anomalies: trailing-window ROI framing,
//! sales-path shape, conversion-cycle and seasonal customer heuristics.
//!
//! These are judgment-call heuristics, kept behind the composer's config
//! flag so they can be tuned or disabled without touching detection.

use chrono::{Datelike, Weekday};

use crate::core::{AnomalyDirection, BucketSeries, Granularity};
use crate::stats::mean;

/// Trailing comparison window per granularity.
fn compare_window(granularity: Granularity) -> usize {
    match granularity {
        Granularity::Day => 30,
        Granularity::Week => 8,
        Granularity::Month => 6,
        Granularity::Quarter => 4,
        Granularity::Year => 3,
    }
}

/// Compose business-impact sentences for the anomaly at `idx`.
pub fn business_impact(
    series: &BucketSeries,
    idx: usize,
    direction: AnomalyDirection,
) -> Vec<String> {
    let mut reasons = Vec::new();
    let values = series.values();
    let value = values[idx];
    let unit = series.granularity.unit_name();
    let window = compare_window(series.granularity);

    // Deviation from the trailing-window average.
    let start = idx.saturating_sub(window);
    if idx > start {
        let trailing_avg = mean(&values[start..idx]);
        if trailing_avg > 0.0 {
            let change_pct = (value - trailing_avg) / trailing_avg * 100.0;
            match direction {
                AnomalyDirection::Up => {
                    if change_pct > 50.0 {
                        reasons.push(format!(
                            "{unit} sales {change_pct:.1}% above the trailing {window}-{unit} average; marketing ROI likely improved sharply"
                        ));
                    } else if change_pct > 20.0 {
                        reasons.push(format!(
                            "{unit} sales {change_pct:.1}% above the trailing {window}-{unit} average; return on spend should improve"
                        ));
                    }
                }
                AnomalyDirection::Down => {
                    if change_pct < -40.0 {
                        reasons.push(format!(
                            "{unit} sales {:.1}% below the trailing {window}-{unit} average; marketing ROI at risk",
                            change_pct.abs()
                        ));
                    } else if change_pct < -15.0 {
                        reasons.push(format!(
                            "{unit} sales {:.1}% below the trailing {window}-{unit} average; return on spend likely reduced",
                            change_pct.abs()
                        ));
                    }
                }
                AnomalyDirection::None => {}
            }
        }

        // Step change vs the immediately preceding period.
        if idx > 0 {
            let prev = values[idx - 1];
            if prev > 0.0 {
                let step_pct = (value - prev) / prev * 100.0;
                if step_pct.abs() > 15.0 {
                    let prev_label = series.label(idx - 1);
                    if step_pct > 0.0 {
                        reasons.push(format!(
                            "single-{unit} sales up {step_pct:.1}% vs the previous {unit} ({prev_label}); a clear step up"
                        ));
                    } else {
                        reasons.push(format!(
                            "single-{unit} sales down {:.1}% vs the previous {unit} ({prev_label}); a clear step down",
                            step_pct.abs()
                        ));
                    }
                }
            }
        }
    }

    // Sales-path shape over a short recent window.
    let recent_window = (window / 2).clamp(3, 7);
    let start_recent = idx.saturating_sub(recent_window);
    if idx > start_recent + 2 {
        let recent = &values[start_recent..=idx];
        match direction {
            AnomalyDirection::Up => {
                if recent.len() >= 3 && recent.windows(2).take(recent.len() - 2).all(|w| w[0] <= w[1])
                {
                    reasons.push(format!(
                        "conversion path flowing well: a cumulative {recent_window}-{unit} rise breaking out"
                    ));
                }
                if recent.len() >= 5
                    && recent[0] > recent[1]
                    && recent[recent.len() - 1] > recent[recent.len() - 2]
                {
                    reasons.push(format!(
                        "late-funnel conversion improving; earlier {unit}-level campaigns starting to pay off"
                    ));
                }
            }
            AnomalyDirection::Down => {
                if recent.len() >= 3 && recent.windows(2).take(recent.len() - 2).all(|w| w[0] >= w[1])
                {
                    reasons.push(format!(
                        "sales path deteriorating across {recent_window} consecutive {unit}s; sustained customer loss"
                    ));
                }
                if recent.len() >= 5 && mean(&recent[..3]) < mean(&recent[recent.len() - 3..]) {
                    reasons.push(format!(
                        "possible early-funnel problem; new-customer intake weakening since {recent_window} {unit}s ago"
                    ));
                }
            }
            AnomalyDirection::None => {}
        }
    }

    conversion_cycle(series, idx, direction, &mut reasons);
    customer_seasonality(series, idx, direction, &mut reasons);

    reasons
}

/// Budget/quota cycle heuristics keyed on calendar position.
fn conversion_cycle(
    series: &BucketSeries,
    idx: usize,
    direction: AnomalyDirection,
    reasons: &mut Vec<String>,
) {
    let date = series.buckets[idx].start;
    let up = direction == AnomalyDirection::Up;
    match series.granularity {
        Granularity::Day => {
            if date.day() <= 5 {
                reasons.push(if up {
                    "start-of-month conversion is typically strong as fresh budgets release".to_string()
                } else {
                    "weak start-of-month conversion; possibly a budget allocation problem".to_string()
                });
            } else if date.day() >= 25 {
                reasons.push(if up {
                    "end-of-month conversion lift, consistent with sales quota cycles".to_string()
                } else {
                    "end-of-month conversion drop; budgets may be exhausted".to_string()
                });
            }
            match date.weekday() {
                Weekday::Mon if !up => reasons.push(
                    "Monday conversion dip as customer decision cycles restart".to_string(),
                ),
                Weekday::Fri if up => reasons.push(
                    "Friday conversion lift as decisions close before the weekend".to_string(),
                ),
                _ => {}
            }
            if matches!(date.month(), 3 | 6 | 9 | 12) && date.day() >= 25 && up {
                reasons.push("quarter-end conversion surge during the sales push".to_string());
            }
        }
        Granularity::Week => {
            let week_in_month = (date.day() - 1) / 7 + 1;
            if week_in_month == 1 {
                reasons.push(if up {
                    "first-week conversion lift as the monthly budget cycle opens".to_string()
                } else {
                    "first-week conversion dip; possibly a budget adjustment period".to_string()
                });
            } else if week_in_month >= 4 {
                reasons.push(if up {
                    "month-end week conversion surge during the sales sprint".to_string()
                } else {
                    "month-end week conversion slide; monthly budgets likely depleted".to_string()
                });
            }
        }
        Granularity::Month => {
            if matches!(date.month(), 1 | 4 | 7 | 10) {
                reasons.push(if up {
                    "quarter-opening month conversion rise as new plans kick off".to_string()
                } else {
                    "quarter-opening month conversion drop; possibly a strategy reset".to_string()
                });
            } else if matches!(date.month(), 3 | 6 | 9 | 12) {
                reasons.push(if up {
                    "quarter-closing month conversion lift toward the quarterly target".to_string()
                } else {
                    "quarter-closing month conversion drop; quarterly budget may be overspent"
                        .to_string()
                });
            }
        }
        Granularity::Quarter => {
            let quarter = (date.month() - 1) / 3 + 1;
            if quarter == 1 {
                reasons.push(if up {
                    "strong first-quarter conversion; a good start to the yearly plan".to_string()
                } else {
                    "weak first-quarter conversion; the yearly plan may need adjusting".to_string()
                });
            } else if quarter == 4 {
                reasons.push(if up {
                    "fourth-quarter conversion surge during the year-end push".to_string()
                } else {
                    "fourth-quarter conversion drop; full-year results at risk".to_string()
                });
            }
        }
        Granularity::Year => {}
    }
}

/// Seasonal customer-behavior heuristics.
fn customer_seasonality(
    series: &BucketSeries,
    idx: usize,
    direction: AnomalyDirection,
    reasons: &mut Vec<String>,
) {
    let date = series.buckets[idx].start;
    let unit = series.granularity.unit_name();
    let up = direction == AnomalyDirection::Up;
    match series.granularity {
        Granularity::Day | Granularity::Week | Granularity::Month => {
            if up {
                if matches!(date.month(), 11 | 12) || (date.month() == 1 && date.day() <= 15) {
                    reasons.push(format!(
                        "year-end and new-year promotion window; high-value customers more active per {unit}"
                    ));
                } else if matches!(date.month(), 7 | 8) {
                    reasons.push(format!(
                        "summer promotion season; leisure-category {unit} conversion up"
                    ));
                }
            } else if date.month() == 2 && date.day() > 10 {
                reasons.push(format!(
                    "post-festival lull; high-value customer {unit} activity lower"
                ));
            } else if matches!(date.month(), 4 | 5) {
                reasons.push(format!(
                    "traditional slow season; customer {unit} decision cycles lengthen"
                ));
            }
        }
        Granularity::Quarter => {
            let quarter = (date.month() - 1) / 3 + 1;
            if up {
                if quarter == 4 {
                    reasons.push(
                        "seasonal fourth-quarter lift in high-value customer activity".to_string(),
                    );
                } else if quarter == 2 {
                    reasons.push(
                        "second-quarter willingness to spend rises with new product launches"
                            .to_string(),
                    );
                }
            } else if quarter == 1 {
                reasons.push(
                    "first-quarter slow season; customers spend less this quarter".to_string(),
                );
            } else if quarter == 3 {
                reasons.push(
                    "third-quarter decision slowdown; a holiday-period effect".to_string(),
                );
            }
        }
        Granularity::Year => {
            if up {
                reasons.push(
                    "customer loyalty improving year on year; repeat purchases growing".to_string(),
                );
            } else {
                reasons.push(
                    "customer churn rising year over year; brand pull may be weakening".to_string(),
                );
            }
        }
    }
}
