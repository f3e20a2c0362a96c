use std::{fmt::Display, path::Path};

use anyhow::{bail, Context};
use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, info};

/// Shown in logs when a row has no name
pub const DEFAULT_DISPLAY_NAME: &str = "Hiring Manager";

/// One row of the contact list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub email: String,
    pub display_name: String,
    pub company: String,
    pub title: String,
}

impl ContactRecord {
    pub fn new(email: &str, display_name: &str, company: &str, title: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            display_name: display_name.trim().to_string(),
            company: company.trim().to_string(),
            title: title.trim().to_string(),
        }
    }

    /// Rows with an empty address, no "@" or the spreadsheet "nan" marker are not sendable
    pub fn has_valid_email(&self) -> bool {
        !self.email.is_empty() && self.email.contains('@') && !self.email.eq_ignore_ascii_case("nan")
    }
}

impl Display for ContactRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.display_name.is_empty() {
            DEFAULT_DISPLAY_NAME
        } else {
            &self.display_name
        };
        if self.company.is_empty() {
            write!(f, "{name} <{}>", self.email)
        } else {
            write!(f, "{name} at {} <{}>", self.company, self.email)
        }
    }
}

/// Loads the contact list, csv files are read as csv everything else as a workbook
pub fn load_contacts(path: &Path) -> anyhow::Result<Vec<ContactRecord>> {
    if !path.exists() {
        bail!("Contact list not found at {path:?}");
    }
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let (header, rows) = if is_csv {
        read_csv(path)?
    } else {
        read_workbook(path)?
    };
    let result = rows_to_contacts(&header, rows)
        .with_context(|| format!("Failed to read contacts from {path:?}"))?;
    info!("Loaded {} contacts from {path:?}", result.len());
    Ok(result)
}

type Table = (Vec<String>, Vec<Vec<String>>);

fn read_csv(path: &Path) -> anyhow::Result<Table> {
    debug!("Reading contacts as csv from {path:?}");
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    let header: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {path:?}"))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows: Vec<Vec<String>> = vec![];
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read a row of {path:?}"))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((header, rows))
}

fn read_workbook(path: &Path) -> anyhow::Result<Table> {
    debug!("Reading contacts as workbook from {path:?}");
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed to open workbook {path:?}"))?;
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        bail!("Workbook {path:?} has no sheets");
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet {sheet_name:?} of {path:?}"))?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_to_string).collect(),
        None => bail!("Sheet {sheet_name:?} of {path:?} is empty"),
    };
    let rows = rows
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<String>>())
        .collect();
    Ok((header, rows))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn rows_to_contacts(header: &[String], rows: Vec<Vec<String>>) -> anyhow::Result<Vec<ContactRecord>> {
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let Some(email_col) = column("Email") else {
        bail!("No Email column found. Columns are: {header:?}");
    };
    let name_col = column("Name");
    let company_col = column("Company");
    let title_col = column("Title");

    let cell = |row: &[String], col: Option<usize>| -> String {
        col.and_then(|c| row.get(c)).cloned().unwrap_or_default()
    };

    Ok(rows
        .iter()
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| {
            ContactRecord::new(
                &cell(row, Some(email_col)),
                &cell(row, name_col),
                &cell(row, company_col),
                &cell(row, title_col),
            )
        })
        .collect())
}
