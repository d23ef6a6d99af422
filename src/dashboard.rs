//! Level dashboards
//!
//! KPI values are computed server-side; until the API exposes them the
//! dashboards show these fixed figures.

use crate::models::KpiLevel;

/// Which direction counts as improvement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetDirection {
    Increasing,
    Decreasing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TopItem {
    pub name: &'static str,
    pub count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KpiCard {
    pub title: &'static str,
    pub current: f64,
    pub previous: Option<f64>,
    pub unit: &'static str,
    pub progress: Option<f64>,
    pub last_calculated: &'static str,
    pub threshold: f64,
    pub target: TargetDirection,
    pub top_items: &'static [TopItem],
}

impl KpiCard {
    /// Absolute change since the previous period
    pub fn change(&self) -> Option<f64> {
        self.previous.map(|prev| self.current - prev)
    }

    pub fn change_percent(&self) -> Option<f64> {
        match self.previous {
            Some(prev) if prev != 0.0 => Some((self.current - prev) / prev * 100.0),
            _ => None,
        }
    }

    /// Whether the current value sits on the right side of the threshold
    pub fn meets_threshold(&self) -> bool {
        match self.target {
            TargetDirection::Increasing => self.current >= self.threshold,
            TargetDirection::Decreasing => self.current <= self.threshold,
        }
    }

    /// Whether the change since last period went the wanted way
    pub fn improving(&self) -> Option<bool> {
        let change = self.change()?;
        if change == 0.0 {
            return None;
        }
        Some(match self.target {
            TargetDirection::Increasing => change > 0.0,
            TargetDirection::Decreasing => change < 0.0,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrendChart {
    pub title: &'static str,
    pub threshold: f64,
    pub kind: ChartKind,
    pub points: &'static [(&'static str, f64)],
}

impl TrendChart {
    pub fn max_value(&self) -> f64 {
        self.points
            .iter()
            .map(|(_, v)| *v)
            .fold(self.threshold, f64::max)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelDashboard {
    pub kpis: &'static [KpiCard],
    pub charts: &'static [TrendChart],
}

pub fn level_dashboard(level: KpiLevel) -> LevelDashboard {
    match level {
        KpiLevel::Operational => LevelDashboard {
            kpis: OPERATIONAL_KPIS,
            charts: OPERATIONAL_CHARTS,
        },
        KpiLevel::Managerial => LevelDashboard {
            kpis: MANAGERIAL_KPIS,
            charts: MANAGERIAL_CHARTS,
        },
        KpiLevel::Strategic => LevelDashboard {
            kpis: STRATEGIC_KPIS,
            charts: STRATEGIC_CHARTS,
        },
    }
}

const fn card(
    title: &'static str,
    current: f64,
    previous: Option<f64>,
    unit: &'static str,
    threshold: f64,
    target: TargetDirection,
) -> KpiCard {
    KpiCard {
        title,
        current,
        previous,
        unit,
        progress: None,
        last_calculated: "01-07-2025",
        threshold,
        target,
        top_items: &[],
    }
}

const fn percent_card(
    title: &'static str,
    current: f64,
    previous: f64,
    threshold: f64,
) -> KpiCard {
    KpiCard {
        progress: Some(current),
        ..card(title, current, Some(previous), "%", threshold, TargetDirection::Increasing)
    }
}

const fn top_card(
    title: &'static str,
    unit: &'static str,
    threshold: f64,
    top_items: &'static [TopItem],
) -> KpiCard {
    KpiCard {
        top_items,
        ..card(title, top_items.len() as f64, None, unit, threshold, TargetDirection::Decreasing)
    }
}

const fn item(name: &'static str, count: u32) -> TopItem {
    TopItem { name, count }
}

const MONTHS: [&str; 7] = ["2025-01", "2025-02", "2025-03", "2025-04", "2025-05", "2025-06", "2025-07"];

const INCIDENT_TREND: [(&str, f64); 7] = [
    (MONTHS[0], 30.0),
    (MONTHS[1], 28.0),
    (MONTHS[2], 24.0),
    (MONTHS[3], 32.0),
    (MONTHS[4], 26.0),
    (MONTHS[5], 22.0),
    (MONTHS[6], 16.0),
];

const OPERATIONAL_KPIS: &[KpiCard] = &[
    top_card(
        "Top Attack Types",
        "types",
        3.0,
        &[
            item("Phishing", 12),
            item("Malware", 9),
            item("Ransomware", 7),
            item("DDoS", 5),
            item("Insider Threat", 3),
        ],
    ),
    percent_card("Detection Rule Performance", 92.0, 89.0, 90.0),
    card("Average CVSS Score", 6.8, Some(7.1), "/10", 5.0, TargetDirection::Decreasing),
    KpiCard {
        current: 8.0,
        ..top_card(
            "Top Vulnerabilities",
            "vulnerabilities",
            5.0,
            &[
                item("CVE-2023-1234", 4),
                item("CVE-2023-5678", 2),
                item("CVE-2022-9999", 1),
                item("CVE-2021-8888", 1),
            ],
        )
    },
    top_card(
        "Top Malware Types",
        "types",
        2.0,
        &[item("Trojan", 6), item("Worm", 4), item("Spyware", 3), item("Adware", 2)],
    ),
    percent_card("Successful Quarantines", 95.0, 93.0, 90.0),
];

const OPERATIONAL_CHARTS: &[TrendChart] = &[
    TrendChart {
        title: "Detection Rule Performance Trend",
        threshold: 90.0,
        kind: ChartKind::Bar,
        points: &[
            (MONTHS[0], 92.0),
            (MONTHS[1], 85.0),
            (MONTHS[2], 81.0),
            (MONTHS[3], 90.0),
            (MONTHS[4], 85.0),
            (MONTHS[5], 89.0),
            (MONTHS[6], 92.0),
        ],
    },
    TrendChart {
        title: "Quarantine Success Rate Trend",
        threshold: 90.0,
        kind: ChartKind::Line,
        points: &[
            (MONTHS[0], 85.0),
            (MONTHS[1], 88.0),
            (MONTHS[2], 90.0),
            (MONTHS[3], 91.0),
            (MONTHS[4], 93.0),
            (MONTHS[5], 93.0),
            (MONTHS[6], 95.0),
        ],
    },
];

const MANAGERIAL_KPIS: &[KpiCard] = &[
    card("Number of Incidents", 16.0, Some(22.0), "incidents", 10.0, TargetDirection::Decreasing),
    percent_card("SLA Remediation Rate", 88.0, 92.0, 90.0),
    card("Average CVSS Score", 6.4, Some(7.2), "/10", 5.0, TargetDirection::Decreasing),
    percent_card("Security Training", 82.0, 68.0, 75.0),
];

const MANAGERIAL_CHARTS: &[TrendChart] = &[
    TrendChart {
        title: "Incident Trend",
        threshold: 10.0,
        kind: ChartKind::Bar,
        points: &INCIDENT_TREND,
    },
    TrendChart {
        title: "Average CVSS Score trend",
        threshold: 5.0,
        kind: ChartKind::Line,
        points: &[
            (MONTHS[0], 8.2),
            (MONTHS[1], 7.6),
            (MONTHS[2], 7.8),
            (MONTHS[3], 7.3),
            (MONTHS[4], 6.9),
            (MONTHS[5], 7.2),
            (MONTHS[6], 6.4),
        ],
    },
];

const STRATEGIC_KPIS: &[KpiCard] = &[
    KpiCard {
        last_calculated: "01-01-2025",
        ..percent_card("Cybersecurity Budget", 65.0, 56.0, 60.0)
    },
    percent_card("Security staff trained", 60.0, 50.0, 80.0),
    card("Incident Trend", 16.0, Some(22.0), "incidents", 10.0, TargetDirection::Decreasing),
];

const STRATEGIC_CHARTS: &[TrendChart] = &[
    TrendChart {
        title: "Incident Trend",
        threshold: 10.0,
        kind: ChartKind::Line,
        points: &INCIDENT_TREND,
    },
    TrendChart {
        title: "Security Staff Training Trend",
        threshold: 80.0,
        kind: ChartKind::Bar,
        points: &[
            (MONTHS[0], 40.0),
            (MONTHS[1], 45.0),
            (MONTHS[2], 50.0),
            (MONTHS[3], 53.0),
            (MONTHS[4], 58.0),
            (MONTHS[5], 61.0),
            (MONTHS[6], 65.0),
        ],
    },
];
