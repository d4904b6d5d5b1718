//! Record commands: `new`, `list`, `show`, `edit`, `close`, `reopen`, `cancel`, `delete`

use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{parse_number, style_status, truncate_str, Context};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::workflow;
use crate::entities::rnc::{NewRnc, Rnc, RncAction, RncPatch, RncStatus};

/// Parse a `YYYY-MM-DD` date argument
pub fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}' (expected YYYY-MM-DD): {}", s, e))
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Short title of the non-conformance (prompts for all fields when omitted)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Who is issuing the report (default: configured author)
    #[arg(long, short = 'r')]
    pub reporter: Option<String>,

    /// Date the non-conformance was observed (default: today)
    #[arg(long, short = 'd', value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    /// Area or location
    #[arg(long, short = 'a', default_value = "")]
    pub area: String,

    /// Project / cost code
    #[arg(long, short = 'p', default_value = "")]
    pub pep: String,

    /// Full description
    #[arg(long, short = 'D', default_value = "")]
    pub description: String,

    /// Prompt for every field
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

/// Status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Open,
    InProgress,
    Closed,
    Cancelled,
    /// Open or in progress
    Active,
    All,
}

impl StatusFilter {
    fn matches(self, status: RncStatus) -> bool {
        match self {
            StatusFilter::Open => status == RncStatus::Open,
            StatusFilter::InProgress => status == RncStatus::InProgress,
            StatusFilter::Closed => status == RncStatus::Closed,
            StatusFilter::Cancelled => status == RncStatus::Cancelled,
            StatusFilter::Active => matches!(status, RncStatus::Open | RncStatus::InProgress),
            StatusFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortField {
    Number,
    Date,
    Title,
    Status,
    Area,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Only RNCs numbered in this year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Filter by area (substring, case-insensitive)
    #[arg(long, short = 'a')]
    pub area: Option<String>,

    /// Search in number, title, description and reporter
    #[arg(long)]
    pub search: Option<String>,

    /// Sort by field (default: newest number first)
    #[arg(long)]
    pub sort: Option<SortField>,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long, short = 'r')]
    pub reporter: Option<String>,

    #[arg(long, short = 'd', value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    #[arg(long, short = 'a')]
    pub area: Option<String>,

    #[arg(long, short = 'p')]
    pub pep: Option<String>,

    #[arg(long, short = 'D')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct TransitionArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,

    /// Note recorded with the status change
    #[arg(long, short = 'm', default_value = "")]
    pub note: String,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// RNC number (e.g. 2025-003)
    pub number: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let session = ctx.session(global)?;

    let new = if args.interactive || args.title.is_none() {
        prompt_new(&args, &ctx.config.author())?
    } else {
        let title = args
            .title
            .clone()
            .ok_or_else(|| miette::miette!("Title is required (use --title or -t)"))?;
        NewRnc::new(title)
            .with_reporter(args.reporter.clone().unwrap_or_else(|| ctx.config.author()))
            .with_report_date(args.date.unwrap_or_else(|| Local::now().date_naive()))
            .with_area(args.area.clone())
            .with_pep(args.pep.clone())
            .with_description(args.description.clone())
    };

    let mut service = ctx.service()?;
    let rnc = service.create(&session, new)?;

    if global.format == OutputFormat::Id || global.quiet {
        println!("{}", rnc.number);
        return Ok(());
    }

    println!(
        "{} Created RNC {}",
        style("✓").green(),
        style(rnc.number).cyan()
    );
    println!(
        "   {} | {} | {}",
        rnc.report_date,
        style_status(rnc.status),
        style(&rnc.title).white()
    );
    Ok(())
}

fn prompt_new(args: &NewArgs, author: &str) -> Result<NewRnc> {
    use dialoguer::Input;

    let reporter: String = Input::new()
        .with_prompt("Reporter")
        .default(args.reporter.clone().unwrap_or_else(|| author.to_string()))
        .interact_text()
        .into_diagnostic()?;

    let today = args.date.unwrap_or_else(|| Local::now().date_naive());
    let date: String = Input::new()
        .with_prompt("Report date (YYYY-MM-DD)")
        .default(today.format("%Y-%m-%d").to_string())
        .validate_with(|input: &String| parse_date_arg(input).map(|_| ()))
        .interact_text()
        .into_diagnostic()?;
    let report_date = parse_date_arg(&date).map_err(|e| miette::miette!("{}", e))?;

    let area: String = Input::new()
        .with_prompt("Area")
        .default(args.area.clone())
        .allow_empty(true)
        .interact_text()
        .into_diagnostic()?;

    let pep: String = Input::new()
        .with_prompt("PEP (cost code)")
        .default(args.pep.clone())
        .allow_empty(true)
        .interact_text()
        .into_diagnostic()?;

    let mut title_prompt = Input::<String>::new().with_prompt("Title");
    if let Some(ref title) = args.title {
        title_prompt = title_prompt.default(title.clone());
    }
    let title = title_prompt
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("title must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .into_diagnostic()?;

    let description: String = Input::new()
        .with_prompt("Description")
        .default(args.description.clone())
        .allow_empty(true)
        .interact_text()
        .into_diagnostic()?;

    Ok(NewRnc::new(title)
        .with_reporter(reporter)
        .with_report_date(report_date)
        .with_area(area)
        .with_pep(pep)
        .with_description(description))
}

pub fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let service = ctx.service()?;

    let search = args.search.as_ref().map(|s| s.to_lowercase());
    let area = args.area.as_ref().map(|s| s.to_lowercase());
    let mut rncs: Vec<Rnc> = service
        .list()?
        .into_iter()
        .filter(|r| args.status.matches(r.status))
        .filter(|r| args.year.map_or(true, |y| r.number.year() == y))
        .filter(|r| {
            area.as_ref()
                .map_or(true, |a| r.area.to_lowercase().contains(a))
        })
        .filter(|r| {
            if let Some(ref search) = search {
                r.number.to_string().contains(search)
                    || r.title.to_lowercase().contains(search)
                    || r.description.to_lowercase().contains(search)
                    || r.reporter.to_lowercase().contains(search)
            } else {
                true
            }
        })
        .collect();

    match args.sort {
        Some(SortField::Number) => rncs.sort_by(|a, b| a.number.cmp(&b.number)),
        Some(SortField::Date) => rncs.sort_by(|a, b| {
            a.report_date
                .cmp(&b.report_date)
                .then(a.number.cmp(&b.number))
        }),
        Some(SortField::Title) => rncs.sort_by(|a, b| a.title.cmp(&b.title)),
        Some(SortField::Status) => rncs.sort_by(|a, b| a.status.cmp(&b.status)),
        Some(SortField::Area) => rncs.sort_by(|a, b| a.area.cmp(&b.area)),
        None => {}
    }

    if args.reverse {
        rncs.reverse();
    }

    if let Some(limit) = args.limit {
        rncs.truncate(limit);
    }

    if args.count {
        println!("{}", rncs.len());
        return Ok(());
    }

    if rncs.is_empty() {
        if !global.quiet {
            println!("No RNCs found.");
        }
        return Ok(());
    }

    let format = if global.format == OutputFormat::Auto {
        OutputFormat::Tsv
    } else {
        global.format
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&rncs).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&rncs).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Csv => write_list_csv(std::io::stdout().lock(), &rncs)?,
        OutputFormat::Tsv | OutputFormat::Auto => {
            println!(
                "{:<10} {:<11} {:<12} {:<16} {:<16} {}",
                style("NUMBER").bold(),
                style("DATE").bold(),
                style("STATUS").bold(),
                style("AREA").bold(),
                style("REPORTER").bold(),
                style("TITLE").bold()
            );
            println!("{}", "-".repeat(100));

            for rnc in &rncs {
                println!(
                    "{:<10} {:<11} {:<12} {:<16} {:<16} {}",
                    style(rnc.number).cyan(),
                    rnc.report_date,
                    style_status(rnc.status),
                    truncate_str(&rnc.area, 16),
                    truncate_str(&rnc.reporter, 16),
                    truncate_str(&rnc.title, 40)
                );
            }

            if !global.quiet {
                println!();
                println!("{} RNC(s) found.", style(rncs.len()).cyan());
            }
        }
        OutputFormat::Id => {
            for rnc in &rncs {
                println!("{}", rnc.number);
            }
        }
        OutputFormat::Md => {
            println!("| Number | Date | Status | Area | Reporter | Title |");
            println!("|---|---|---|---|---|---|");
            for rnc in &rncs {
                println!(
                    "| {} | {} | {} | {} | {} | {} |",
                    rnc.number,
                    rnc.report_date,
                    rnc.status.label(),
                    rnc.area,
                    rnc.reporter,
                    rnc.title
                );
            }
        }
    }

    Ok(())
}

/// The `list` columns as CSV
fn write_list_csv<W: std::io::Write>(writer: W, rncs: &[Rnc]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["number", "date", "status", "area", "reporter", "title"])
        .into_diagnostic()?;
    for rnc in rncs {
        wtr.write_record([
            rnc.number.to_string(),
            rnc.report_date.to_string(),
            rnc.status.to_string(),
            rnc.area.clone(),
            rnc.reporter.clone(),
            rnc.title.clone(),
        ])
        .into_diagnostic()?;
    }
    wtr.flush().into_diagnostic()?;
    Ok(())
}

pub fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;
    let rnc = ctx.service()?.get(number)?;

    match global.format {
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&rnc).into_diagnostic()?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rnc).into_diagnostic()?);
        }
        OutputFormat::Id => println!("{}", rnc.number),
        _ => print_details(&rnc),
    }
    Ok(())
}

fn print_details(rnc: &Rnc) {
    println!(
        "{} {}  [{}]",
        style("RNC").bold(),
        style(rnc.number).cyan().bold(),
        style_status(rnc.status)
    );
    println!("{}", style("─".repeat(60)).dim());

    let field = |label: &str, value: &str| {
        let shown = if value.is_empty() { "-" } else { value };
        println!("{:<13} {}", style(format!("{}:", label)).bold(), shown);
    };
    field("Title", &rnc.title);
    field("Reporter", &rnc.reporter);
    field("Report date", &rnc.report_date.to_string());
    field(
        "Created",
        &rnc.created
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
    );
    field("Area", &rnc.area);
    field("PEP", &rnc.pep);

    println!();
    println!("{}", style("Description").bold());
    if rnc.description.is_empty() {
        println!("  -");
    } else {
        for line in rnc.description.lines() {
            println!("  {}", line);
        }
    }

    if !rnc.events.is_empty() {
        println!();
        println!("{}", style("History").bold());
        for event in &rnc.events {
            println!(
                "  {}  {:<7} {} → {}  by {}",
                event.at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                event.action,
                event.from,
                style_status(event.to),
                event.actor
            );
            if !event.note.is_empty() {
                println!("      {}", style(&event.note).dim());
            }
        }
    }

    if !rnc.photos.is_empty() {
        println!();
        println!("{}", style("Photos").bold());
        for photo in &rnc.photos {
            println!(
                "  [{}] {}  {}",
                photo.category,
                photo.filename,
                style(&photo.url).dim()
            );
        }
    }

    let actions = workflow::allowed_actions(rnc.status);
    if !actions.is_empty() {
        let names: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
        println!();
        println!("{} {}", style("Next:").dim(), names.join(", "));
    }
}

pub fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;

    let patch = RncPatch {
        reporter: args.reporter,
        report_date: args.date,
        area: args.area,
        pep: args.pep,
        title: args.title,
        description: args.description,
    };
    if patch.is_empty() {
        return Err(miette::miette!(
            "Nothing to edit. Pass at least one of --title, --reporter, --date, --area, --pep, --description"
        ));
    }

    let session = ctx.session(global)?;
    let rnc = ctx.service()?.edit(&session, number, &patch)?;

    if !global.quiet {
        println!(
            "{} Updated RNC {}",
            style("✓").green(),
            style(rnc.number).cyan()
        );
    }
    Ok(())
}

pub fn run_transition(action: RncAction, args: TransitionArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;
    let session = ctx.session(global)?;

    let mut service = ctx.service()?;
    let rnc = match action {
        RncAction::Close => service.close(&session, number, &args.note)?,
        RncAction::Reopen => service.reopen(&session, number, &args.note)?,
        RncAction::Cancel => service.cancel(&session, number, &args.note)?,
    };

    if !global.quiet {
        let verb = match action {
            RncAction::Close => "Closed",
            RncAction::Reopen => "Reopened",
            RncAction::Cancel => "Cancelled",
        };
        println!(
            "{} {} RNC {} (now {})",
            style("✓").green(),
            verb,
            style(rnc.number).cyan(),
            style_status(rnc.status)
        );
    }
    Ok(())
}

pub fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let number = parse_number(&args.number)?;
    let session = ctx.session(global)?;
    let mut service = ctx.service()?;
    let rnc = service.get(number)?;

    if !args.yes {
        if !console::Term::stderr().is_term() {
            return Err(miette::miette!(
                "Refusing to delete RNC {} without confirmation. Pass --yes",
                number
            ));
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Permanently delete RNC {} \"{}\" and {} photo(s)?",
                rnc.number,
                rnc.title,
                rnc.photos.len()
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    service.delete(&session, number)?;
    if !global.quiet {
        println!(
            "{} Deleted RNC {}",
            style("✓").green(),
            style(number).cyan()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_arg() {
        assert_eq!(
            parse_date_arg("2025-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert!(parse_date_arg("01/06/2025").is_err());
    }

    #[test]
    fn test_list_csv_quotes_line_breaks() {
        let number = "2025-001".parse().unwrap();
        let rnc = Rnc::from_new(
            number,
            NewRnc::new("Line\r3, \"north\"\nbay").with_area("Solda"),
            chrono::Utc::now(),
        );

        let mut buf = Vec::new();
        write_list_csv(&mut buf, &[rnc]).unwrap();

        let mut rdr = csv::Reader::from_reader(buf.as_slice());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "2025-001");
        assert_eq!(&rows[0][3], "Solda");
        assert_eq!(&rows[0][5], "Line\r3, \"north\"\nbay");
    }

    #[test]
    fn test_status_filter() {
        assert!(StatusFilter::Active.matches(RncStatus::InProgress));
        assert!(!StatusFilter::Active.matches(RncStatus::Closed));
        assert!(StatusFilter::All.matches(RncStatus::Cancelled));
    }
}
