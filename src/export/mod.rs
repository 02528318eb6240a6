pub mod books;
pub mod charts;
pub mod error;

pub use charts::write_charts;
pub use error::ExportError;

pub trait Export {
    fn to_csv(&self) -> Result<String, ExportError>;
    fn to_md(&self) -> Result<String, ExportError>;
    fn to_json(&self) -> Result<String, ExportError>;
}
