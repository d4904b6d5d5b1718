//! `rnc report` command - Summary tables

use miette::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{truncate_str, write_output, Context};
use crate::cli::GlobalOpts;
use crate::entities::rnc::{Rnc, RncStatus};

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// Only RNCs numbered in this year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ReportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let rncs: Vec<Rnc> = ctx
        .service()?
        .list()?
        .into_iter()
        .filter(|r| args.year.map_or(true, |y| r.number.year() == y))
        .collect();

    let report = build_report(&rncs, args.year);
    write_output(report.as_bytes(), args.output.as_deref())
}

/// Markdown report: totals by status, by year and by area, then the open backlog
fn build_report(rncs: &[Rnc], year: Option<i32>) -> String {
    let mut output = String::new();
    match year {
        Some(y) => output.push_str(&format!("# RNC Report {}\n\n", y)),
        None => output.push_str("# RNC Report\n\n"),
    }

    output.push_str("## By Status\n\n");
    let mut by_status = Builder::default();
    by_status.push_record(["Status", "Count"]);
    for status in RncStatus::ALL {
        let count = rncs.iter().filter(|r| r.status == status).count();
        by_status.push_record([status.label().to_string(), count.to_string()]);
    }
    by_status.push_record(["Total".to_string(), rncs.len().to_string()]);
    output.push_str(&by_status.build().with(Style::markdown()).to_string());

    output.push_str("\n\n## By Year\n\n");
    let mut years: BTreeMap<i32, [usize; 4]> = BTreeMap::new();
    for rnc in rncs {
        let counts = years.entry(rnc.number.year()).or_default();
        counts[status_index(rnc.status)] += 1;
    }
    let mut by_year = Builder::default();
    let mut header = vec!["Year".to_string()];
    header.extend(RncStatus::ALL.iter().map(|s| s.label().to_string()));
    header.push("Total".to_string());
    by_year.push_record(header);
    for (y, counts) in years.iter().rev() {
        let mut row = vec![y.to_string()];
        row.extend(counts.iter().map(|c| c.to_string()));
        row.push(counts.iter().sum::<usize>().to_string());
        by_year.push_record(row);
    }
    output.push_str(&by_year.build().with(Style::markdown()).to_string());

    output.push_str("\n\n## By Area\n\n");
    let mut areas: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for rnc in rncs {
        let area = if rnc.area.is_empty() { "(none)" } else { rnc.area.as_str() };
        let entry = areas.entry(area).or_default();
        entry.0 += 1;
        if is_active(rnc.status) {
            entry.1 += 1;
        }
    }
    let mut area_rows: Vec<_> = areas.into_iter().collect();
    area_rows.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.0.cmp(b.0)));
    let mut by_area = Builder::default();
    by_area.push_record(["Area", "Total", "Active"]);
    for (area, (total, active)) in area_rows {
        by_area.push_record([truncate_str(area, 30), total.to_string(), active.to_string()]);
    }
    output.push_str(&by_area.build().with(Style::markdown()).to_string());

    let mut backlog: Vec<&Rnc> = rncs.iter().filter(|r| is_active(r.status)).collect();
    if !backlog.is_empty() {
        backlog.sort_by(|a, b| a.report_date.cmp(&b.report_date).then(a.number.cmp(&b.number)));
        output.push_str("\n\n## Active Backlog (oldest first)\n\n");
        let mut table = Builder::default();
        table.push_record(["Number", "Date", "Status", "Area", "Title"]);
        for rnc in backlog {
            table.push_record([
                rnc.number.to_string(),
                rnc.report_date.to_string(),
                rnc.status.label().to_string(),
                truncate_str(&rnc.area, 20),
                truncate_str(&rnc.title, 40),
            ]);
        }
        output.push_str(&table.build().with(Style::markdown()).to_string());
    }

    output.push('\n');
    output
}

fn status_index(status: RncStatus) -> usize {
    match status {
        RncStatus::Open => 0,
        RncStatus::InProgress => 1,
        RncStatus::Closed => 2,
        RncStatus::Cancelled => 3,
    }
}

fn is_active(status: RncStatus) -> bool {
    matches!(status, RncStatus::Open | RncStatus::InProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::numbering::RncNumber;
    use crate::entities::rnc::NewRnc;
    use chrono::Utc;

    fn rnc(year: i32, seq: u32, area: &str, status: RncStatus) -> Rnc {
        let new = NewRnc::new(format!("Issue {}", seq))
            .with_area(area)
            .with_status(status);
        Rnc::from_new(RncNumber::new(year, seq).unwrap(), new, Utc::now())
    }

    #[test]
    fn test_report_sections() {
        let rncs = vec![
            rnc(2025, 1, "Line 3", RncStatus::Open),
            rnc(2025, 2, "Line 3", RncStatus::Closed),
            rnc(2024, 7, "", RncStatus::InProgress),
        ];
        let report = build_report(&rncs, None);

        assert!(report.contains("## By Status"));
        assert!(report.contains("| Total"));
        assert!(report.contains("| 2025 "));
        assert!(report.contains("| 2024 "));
        assert!(report.contains("(none)"));
        assert!(report.contains("## Active Backlog"));
        assert!(report.contains("2024-007"));
    }

    #[test]
    fn test_report_without_active_backlog() {
        let rncs = vec![rnc(2025, 1, "Yard", RncStatus::Cancelled)];
        let report = build_report(&rncs, Some(2025));
        assert!(report.starts_with("# RNC Report 2025"));
        assert!(!report.contains("Active Backlog"));
    }
}
