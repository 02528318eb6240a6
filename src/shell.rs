use chrono::NaiveDate;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use thiserror::Error;

use crate::catalog::{BookCatalog, CatalogError};
use crate::export::{write_charts, Export, ExportError};
use crate::model::{Book, BookPatch, HistoryEntry, PatchError};
use crate::settings::AnalyticsSettings;
use crate::statistics::{self, charts, BookMetric, Statistics, UnknownMetric};
use crate::store::BookRepository;

#[derive(Debug, Error)]
enum ShellError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Metric(#[from] UnknownMetric),
    #[error("invalid due date {0:?}, expected YYYY-MM-DD")]
    DueDate(String),
    #[error("unknown export format {0:?}, expected csv, md or json")]
    Format(String),
}

const PERCENTILES: [f64; 4] = [0.25, 0.5, 0.75, 0.9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    AddBook,
    GetAllRecords,
    FindByName,
    GetAveragePrice,
    GetTopBooks,
    GetValueScores,
    GetGenreRatings,
    GetPercentiles,
    WriteCharts,
    ExportBooks,
    CheckOut,
    CheckIn,
    UpdateBook,
    DeleteBook,
    GetHistory,
    Help,
    Exit,
}

impl Command {
    const ALL: [Command; 17] = [
        Command::AddBook,
        Command::GetAllRecords,
        Command::FindByName,
        Command::GetAveragePrice,
        Command::GetTopBooks,
        Command::GetValueScores,
        Command::GetGenreRatings,
        Command::GetPercentiles,
        Command::WriteCharts,
        Command::ExportBooks,
        Command::CheckOut,
        Command::CheckIn,
        Command::UpdateBook,
        Command::DeleteBook,
        Command::GetHistory,
        Command::Help,
        Command::Exit,
    ];

    fn name(&self) -> &'static str {
        match self {
            Command::AddBook => "addBook",
            Command::GetAllRecords => "getAllRecords",
            Command::FindByName => "findByName",
            Command::GetAveragePrice => "getAveragePrice",
            Command::GetTopBooks => "getTopBooks",
            Command::GetValueScores => "getValueScores",
            Command::GetGenreRatings => "getGenreRatings",
            Command::GetPercentiles => "getPercentiles",
            Command::WriteCharts => "writeCharts",
            Command::ExportBooks => "exportBooks",
            Command::CheckOut => "checkOut",
            Command::CheckIn => "checkIn",
            Command::UpdateBook => "updateBook",
            Command::DeleteBook => "deleteBook",
            Command::GetHistory => "getHistory",
            Command::Help => "help",
            Command::Exit => "exit",
        }
    }
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|command| command.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Line-based command loop over a [`BookCatalog`].
#[derive(Debug)]
pub struct Shell<R> {
    catalog: BookCatalog<R>,
    analytics: AnalyticsSettings,
    running: bool,
}

impl<R: BookRepository> Shell<R> {
    pub fn new(catalog: BookCatalog<R>, analytics: AnalyticsSettings) -> Self {
        Self {
            catalog,
            analytics,
            running: true,
        }
    }

    pub fn catalog(&self) -> &BookCatalog<R> {
        &self.catalog
    }

    /// Runs until `exit` or end of input. Only I/O failures on the streams
    /// themselves end the loop early.
    pub fn run<I: BufRead, O: Write>(&mut self, mut input: I, mut output: O) -> io::Result<()> {
        writeln!(
            output,
            "Welcome to the book app! Type 'help' for a list of commands!"
        )?;
        while self.running {
            write!(output, ">>> ")?;
            output.flush()?;
            let Some(line) = read_line(&mut input)? else {
                break;
            };
            if line.is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(command) => match self.dispatch(command, &mut input, &mut output) {
                    Ok(()) => {}
                    Err(ShellError::Io(e)) => return Err(e),
                    Err(e) => writeln!(output, "Error: {e}")?,
                },
                Err(()) => writeln!(output, "Please use a valid command!")?,
            }
        }
        Ok(())
    }

    fn dispatch<I: BufRead, O: Write>(
        &mut self,
        command: Command,
        input: &mut I,
        output: &mut O,
    ) -> Result<(), ShellError> {
        tracing::debug!(command = command.name(), "shell command");
        match command {
            Command::Exit => {
                self.running = false;
                writeln!(output, "Goodbye!")?;
            }
            Command::Help => {
                let names: Vec<&str> = Command::ALL.iter().map(Command::name).collect();
                writeln!(output, "Available commands: {}", names.join(", "))?;
            }
            Command::AddBook => {
                writeln!(output, "Enter Book Details:")?;
                let title = prompt(input, output, "Title: ")?;
                let author = prompt(input, output, "Author: ")?;
                let book_id = self.catalog.add_book(Book::new(title, author))?;
                writeln!(output, "{book_id}")?;
            }
            Command::GetAllRecords => print_books(output, &self.catalog.get_all_books())?,
            Command::FindByName => {
                let query = prompt(input, output, "Please enter book name: ")?;
                print_books(output, &self.catalog.find_by_name(&query))?;
            }
            Command::GetAveragePrice => {
                match statistics::average_price(&self.catalog.get_all_books()) {
                    Some(avg) => writeln!(output, "{avg:.2}")?,
                    None => writeln!(output, "No prices recorded")?,
                }
            }
            Command::GetTopBooks => {
                let top = statistics::top_rated(
                    &self.catalog.get_all_books(),
                    self.analytics.min_ratings,
                    self.analytics.top_limit,
                );
                for book in &top {
                    let rating = book
                        .average_rating
                        .map_or_else(|| "unrated".to_string(), |r| format!("{r:.2}"));
                    writeln!(output, "{rating}  {book}")?;
                }
                if top.is_empty() {
                    writeln!(output, "No books found")?;
                }
            }
            Command::GetValueScores => {
                for score in statistics::value_scores(&self.catalog.get_all_books()) {
                    writeln!(
                        output,
                        "{} | {}: {:.3}",
                        score.book_id, score.title, score.score
                    )?;
                }
            }
            Command::GetGenreRatings => {
                let ratings = statistics::bayesian_weighted_by_genre(
                    &self.catalog.get_all_books(),
                    self.analytics.prior_weight,
                );
                for genre in ratings {
                    writeln!(
                        output,
                        "{}: {:.3} (mean {:.2}, median ratings {})",
                        genre.genre,
                        genre.weighted_rating,
                        genre.mean_average_rating,
                        genre.median_ratings_count
                    )?;
                }
            }
            Command::GetPercentiles => {
                let names: Vec<&str> = BookMetric::ALL.iter().map(BookMetric::name).collect();
                let label = format!("Metric ({}): ", names.join(", "));
                let metric: BookMetric = prompt(input, output, &label)?.parse()?;
                let books = self.catalog.get_all_books();
                let values = books.calculate_percentile(metric, &PERCENTILES);
                if values.is_empty() {
                    writeln!(output, "No {} values recorded", metric.name())?;
                }
                for (p, value) in PERCENTILES.iter().zip(values) {
                    writeln!(output, "p{:.0}: {value:.2}", p * 100.0)?;
                }
            }
            Command::ExportBooks => {
                let format = prompt(input, output, "Format (csv, md, json): ")?;
                let books = self.catalog.get_all_books();
                let rendered = match format.to_ascii_lowercase().as_str() {
                    "csv" => books.to_csv()?,
                    "md" | "markdown" => books.to_md()?,
                    "json" => books.to_json()?,
                    _ => return Err(ShellError::Format(format)),
                };
                write!(output, "{rendered}")?;
                if !rendered.ends_with('\n') {
                    writeln!(output)?;
                }
            }
            Command::WriteCharts => {
                let series = charts::all_charts(&self.catalog.get_all_books());
                for path in write_charts(&series, &self.analytics.chart_dir)? {
                    writeln!(output, "{}", path.display())?;
                }
            }
            Command::CheckOut => {
                let book_id = prompt(input, output, "Book ID to check out: ")?;
                let email = prompt(input, output, "Your email: ")?;
                let due = prompt(input, output, "Due date (optional, YYYY-MM-DD): ")?;
                let due_date = parse_due_date(&due)?;
                let book = self
                    .catalog
                    .check_out(&book_id, non_empty(&email), due_date)?;
                writeln!(output, "Checked out: {book}")?;
            }
            Command::CheckIn => {
                let book_id = prompt(input, output, "Book ID to check in: ")?;
                let email = prompt(input, output, "Your email (optional): ")?;
                let book = self.catalog.check_in(&book_id, non_empty(&email))?;
                writeln!(output, "Checked in: {book}")?;
            }
            Command::UpdateBook => {
                let book_id = prompt(input, output, "Book ID to update: ")?;
                let field = prompt(input, output, "Field to update (e.g., title): ")?;
                let value = prompt(input, output, "New value: ")?;
                let patch = BookPatch::from_text(&field, &value)?;
                match self.catalog.update_book(&book_id, &patch)? {
                    Some(book) => writeln!(output, "Updated: {book}")?,
                    None => writeln!(output, "Not found")?,
                }
            }
            Command::DeleteBook => {
                let book_id = prompt(input, output, "Book ID to delete: ")?;
                if self.catalog.delete_book(&book_id)? {
                    writeln!(output, "Deleted")?;
                } else {
                    writeln!(output, "Not found")?;
                }
            }
            Command::GetHistory => {
                let book_id = prompt(input, output, "Book ID for history: ")?;
                let history = self.catalog.history(&book_id)?;
                if history.is_empty() {
                    writeln!(output, "No checkout history")?;
                }
                for entry in &history {
                    writeln!(output, "{}", describe(entry))?;
                }
            }
        }
        Ok(())
    }
}

fn read_line<I: BufRead>(input: &mut I) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn prompt<I: BufRead, O: Write>(input: &mut I, output: &mut O, label: &str) -> io::Result<String> {
    write!(output, "{label}")?;
    output.flush()?;
    Ok(read_line(input)?.unwrap_or_default())
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn parse_due_date(raw: &str) -> Result<Option<NaiveDate>, ShellError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<NaiveDate>()
        .map(Some)
        .map_err(|_| ShellError::DueDate(raw.to_string()))
}

fn print_books<O: Write>(output: &mut O, books: &[Book]) -> io::Result<()> {
    if books.is_empty() {
        return writeln!(output, "No books found");
    }
    for book in books {
        writeln!(output, "{book}")?;
    }
    Ok(())
}

fn describe(entry: &HistoryEntry) -> String {
    let who = entry.user_email().unwrap_or("unknown");
    let when = entry.timestamp().format("%Y-%m-%d %H:%M:%S");
    match entry {
        HistoryEntry::Checkout {
            due_date: Some(due),
            ..
        } => format!("checkout {when} by {who}, due {due}"),
        HistoryEntry::Checkout { .. } => format!("checkout {when} by {who}"),
        HistoryEntry::Checkin { .. } => format!("checkin {when} by {who}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBookStore;
    use std::io::Cursor;

    fn run_script(shell: &mut Shell<MemoryBookStore>, script: &str) -> String {
        let mut output = Vec::new();
        shell.run(Cursor::new(script.to_string()), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn shell() -> Shell<MemoryBookStore> {
        Shell::new(
            BookCatalog::new(MemoryBookStore::new()),
            AnalyticsSettings::default(),
        )
    }

    #[test]
    fn test_add_and_list() {
        let mut shell = shell();
        let out = run_script(&mut shell, "addBook\nDune\nHerbert\ngetAllRecords\nexit\n");
        let books = shell.catalog().get_all_books();
        assert_eq!(books.len(), 1);
        assert!(out.contains(books[0].book_id()));
        assert!(out.contains("Dune by Herbert [available]"));
        assert!(out.ends_with("Goodbye!\n"));
    }

    #[test]
    fn test_checkout_cycle_and_history() {
        let mut shell = shell();
        let id = shell
            .catalog()
            .add_book(Book::new("Dune", "Herbert"))
            .unwrap();
        let script = format!(
            "checkOut\n{id}\na@b.com\n2030-01-01\ncheckOut\n{id}\nc@d.com\n\ncheckIn\n{id}\na@b.com\ngetHistory\n{id}\n"
        );
        let out = run_script(&mut shell, &script);
        assert!(out.contains("Checked out:"));
        assert!(out.contains("Error: book"));
        assert!(out.contains("Checked in:"));
        assert!(out.contains("by a@b.com, due 2030-01-01"));
        assert_eq!(shell.catalog().history(&id).unwrap().len(), 2);
    }

    #[test]
    fn test_errors_are_reported_not_fatal() {
        let mut shell = shell();
        let out = run_script(
            &mut shell,
            "addBook\n\nX\nbogus\ncheckOut\nmissing\n\nsoon\nupdateBook\nmissing\nprice_usd\ncheap\ndeleteBook\nmissing\nhelp\n",
        );
        assert!(out.contains("Error: book must have a non-empty title"));
        assert!(out.contains("Please use a valid command!"));
        assert!(out.contains("Error: invalid due date \"soon\""));
        assert!(out.contains("Error: invalid value \"cheap\" for field price_usd"));
        assert!(out.contains("Not found"));
        assert!(out.contains("Available commands: addBook,"));
        assert!(shell.catalog().get_all_books().is_empty());
    }

    #[test]
    fn test_percentiles_and_export_commands() {
        let mut shell = shell();
        for (title, price) in [("Cheap", 10.0), ("Middle", 20.0), ("Dear", 30.0)] {
            let mut book = Book::new(title, "Author");
            book.price_usd = Some(price);
            shell.catalog().add_book(book).unwrap();
        }
        let out = run_script(
            &mut shell,
            "getPercentiles\nprice\ngetPercentiles\nsales_millions\ngetPercentiles\nisbn\nexportBooks\ncsv\nexportBooks\njson\nexportBooks\npdf\n",
        );
        assert!(out.contains("p25: 20.00\np50: 20.00\np75: 30.00\np90: 30.00\n"));
        assert!(out.contains("No sales_millions values recorded"));
        assert!(out.contains("Error: unknown metric \"isbn\""));
        assert!(out.contains("book_id,title,author,"));
        assert!(out.contains(",Middle,Author,"));
        assert!(out.contains("\"price_usd\": 30.0"));
        assert!(out.contains("Error: unknown export format \"pdf\""));
    }

    #[test]
    fn test_update_and_analytics_commands() {
        let mut shell = shell();
        let id = shell
            .catalog()
            .add_book(Book::new("Dune", "Herbert"))
            .unwrap();
        let script = format!(
            "updateBook\n{id}\nprice_usd\n10\nupdateBook\n{id}\naverage_rating\n4.5\nupdateBook\n{id}\nratings_count\n1500\ngetAveragePrice\ngetTopBooks\ngetValueScores\n"
        );
        let out = run_script(&mut shell, &script);
        assert!(out.contains("Updated:"));
        assert!(out.contains("10.00\n"));
        assert!(out.contains("4.50  "));
        assert!(out.contains(&format!("{id} | Dune:")));
        assert_eq!(shell.catalog().get_by_id(&id).unwrap().price_usd, Some(10.0));
    }
}
