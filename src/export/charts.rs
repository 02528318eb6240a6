use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::export::{Export, ExportError};
use crate::statistics::ChartSeries;

impl Export for ChartSeries {
    fn to_csv(&self) -> Result<String, ExportError> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record([self.x_label, self.y_label])?;
        for point in &self.points {
            wtr.write_record([point.x.clone(), point.y.to_string()])?;
        }
        Ok(String::from_utf8(wtr.into_inner()?)?)
    }

    fn to_md(&self) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        writeln!(buffer, "### {}", self.title)?;
        writeln!(buffer, "\n| {} | {} |", self.x_label, self.y_label)?;
        writeln!(buffer, "|---|---|")?;
        for point in &self.points {
            writeln!(buffer, "| {} | {} |", point.x, point.y)?;
        }
        Ok(String::from_utf8(buffer)?)
    }

    fn to_json(&self) -> Result<String, ExportError> {
        serde_json::to_string(self).map_err(ExportError::Json)
    }
}

impl ChartSeries {
    /// Writes the series as `<dir>/<name>.csv` and returns the path written.
    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(format!("{}.csv", self.name));
        fs::write(&path, self.to_csv()?).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), points = self.points.len(), "chart data written");
        Ok(path)
    }
}

/// Writes every series into `dir`, creating it if needed.
pub fn write_charts(series: &[ChartSeries], dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    series.iter().map(|chart| chart.write_csv(dir)).collect()
}
