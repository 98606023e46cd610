//! Chart generation for the dashboard.
//!
//! Each chart is built with charming as an ECharts JSON configuration and
//! rendered into an HTML container div, with an injected script that
//! initializes the ECharts instances client-side.

use std::collections::{BTreeMap, BTreeSet};

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, JsFunction,
        Tooltip, Trigger,
    },
    series::{Bar, Line, Pie},
};
use maud::{Markup, PreEscaped, html};
use time::Date;

use crate::{
    aggregation::{Breakdown, MONTH_LABELS},
    html::HeadElement,
};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Build the charts for `breakdown`, shaped by its scope. `period` is the
/// human-readable label of the scope, used as the chart subtitle.
pub(super) fn build_charts(breakdown: &Breakdown, period: &str) -> Vec<DashboardChart> {
    let mut charts = vec![DashboardChart {
        id: "category-pie-chart",
        options: category_pie_chart(&breakdown.category_totals(), period).to_string(),
    }];

    match breakdown {
        Breakdown::Day { items, .. } => charts.push(DashboardChart {
            id: "day-items-chart",
            options: day_items_chart(items, period).to_string(),
        }),
        Breakdown::Month { daily_totals, .. } => charts.push(DashboardChart {
            id: "daily-totals-chart",
            options: daily_totals_chart(daily_totals, period).to_string(),
        }),
        Breakdown::Year {
            monthly_totals,
            monthly_by_category,
            ..
        } => {
            charts.push(DashboardChart {
                id: "monthly-totals-chart",
                options: monthly_totals_chart(monthly_totals, period).to_string(),
            });
            charts.push(DashboardChart {
                id: "monthly-by-category-chart",
                options: stacked_category_chart(monthly_by_category, period).to_string(),
            });
        }
    }

    charts
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts, with dark
/// mode support and responsive resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

fn category_pie_chart(category_totals: &BTreeMap<String, f64>, period: &str) -> Chart {
    let data: Vec<(f64, &str)> = category_totals
        .iter()
        .map(|(category, total)| (*total, category.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text("Spending by category").subtext(period))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().top("bottom"))
        .series(Pie::new().name("Spent").radius("55%").data(data))
}

/// One bar per expense on the day, so individual purchases stay visible
/// instead of being collapsed into category totals.
fn day_items_chart(items: &[(String, f64)], period: &str) -> Chart {
    let labels: Vec<String> = items.iter().map(|(category, _)| category.clone()).collect();
    let values: Vec<f64> = items.iter().map(|(_, amount)| *amount).collect();

    Chart::new()
        .title(Title::new().text("Expenses on the day").subtext(period))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Amount").data(values))
}

fn daily_totals_chart(daily_totals: &BTreeMap<Date, f64>, period: &str) -> Chart {
    let labels: Vec<String> = daily_totals.keys().map(Date::to_string).collect();
    let values: Vec<f64> = daily_totals.values().copied().collect();

    Chart::new()
        .title(Title::new().text("Spending per day").subtext(period))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Line::new().name("Spent").data(values))
}

fn monthly_totals_chart(monthly_totals: &[f64; 12], period: &str) -> Chart {
    Chart::new()
        .title(Title::new().text("Spending per month").subtext(period))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(MONTH_LABELS.to_vec()),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Total").data(monthly_totals.to_vec()))
}

fn stacked_category_chart(monthly_by_category: &[BTreeMap<String, f64>; 12], period: &str) -> Chart {
    let categories: BTreeSet<&String> = monthly_by_category
        .iter()
        .flat_map(BTreeMap::keys)
        .collect();

    let mut chart = Chart::new()
        .title(
            Title::new()
                .text("Monthly spending by category")
                .subtext(period)
                .left(20)
                .top("1%"),
        )
        .tooltip(currency_tooltip())
        .legend(Legend::new().left(250).top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(90)
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(MONTH_LABELS.to_vec()),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        );

    for category in categories {
        let data: Vec<f64> = monthly_by_category
            .iter()
            .map(|month| month.get(category).copied().unwrap_or(0.0))
            .collect();

        chart = chart.series(
            Bar::new()
                .name(category)
                .stack("Expenses")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(data),
        );
    }

    chart
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-IN', {
              style: 'currency',
              currency: 'INR'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
