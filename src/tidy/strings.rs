use itertools::Itertools;
use log::debug;
use polars::prelude::*;
use regex_lite::Regex;

use super::eval::evaluate;
use crate::data_structs::{
    Dataset,
    CELL_ID,
};
use crate::error::{
    Result,
    TidyError,
};
use crate::utils::column_as_strings;

/// Rejects `cell_id` among the columns a string verb would write.
fn check_targets<S: AsRef<str>>(targets: &[S]) -> Result<()> {
    if targets.iter().any(|t| t.as_ref() == CELL_ID) {
        return Err(TidyError::ProtectedColumn(CELL_ID.to_string()));
    }
    Ok(())
}

impl Dataset {
    /// Source values of a string verb, stored or computed, as text.
    fn string_values(
        &self,
        column: &str,
    ) -> Result<Vec<Option<String>>> {
        self.require_columns([column])?;
        column_as_strings(self.frame_all()?.column(column)?)
    }

    fn drop_sources<S: AsRef<str>>(
        mut self,
        sources: &[S],
        keep: &[String],
    ) -> Result<Dataset> {
        for source in sources.iter().map(|s| s.as_ref()) {
            if source == CELL_ID || keep.iter().any(|k| k == source) {
                continue;
            }
            if self.cells().has_column(source) {
                let cells = self.cells().drop_column(source)?;
                self = self.with_cells(cells);
            }
        }
        Ok(self)
    }

    fn with_string_columns(
        mut self,
        names: &[String],
        values: Vec<Vec<Option<String>>>,
    ) -> Result<Dataset> {
        for (name, column) in names.iter().zip(values) {
            let series = Series::new(name.as_str().into(), column);
            self.cells_mut().with_column(Column::from(series))?;
        }
        Ok(self)
    }

    /// Joins the text of `components` with `separator` into `new_column`.
    /// A null in any component gives a null result. With `remove`, stored
    /// component columns are dropped afterwards.
    pub fn unite<S: AsRef<str>>(
        self,
        new_column: &str,
        components: &[S],
        separator: &str,
        remove: bool,
    ) -> Result<Dataset> {
        check_targets(&[new_column])?;
        let names = components.iter().map(|c| c.as_ref()).collect_vec();
        self.require_columns(names.iter().copied())?;
        let exprs = names
            .iter()
            .map(|n| col(*n).cast(DataType::String))
            .collect_vec();
        let column = evaluate(&self, new_column, concat_str(exprs, separator, false))?;

        let mut out = self;
        out.cells_mut().with_column(column)?;
        if remove {
            out = out.drop_sources(components, &[new_column.to_string()])?;
        }
        Ok(out)
    }

    /// Splits `column` with a regular expression, one new column per capture
    /// group. Nulls stay null; unmatched optional groups become null.
    pub fn extract<S: AsRef<str>>(
        self,
        column: &str,
        new_columns: &[S],
        pattern: &str,
    ) -> Result<Dataset> {
        check_targets(new_columns)?;
        let regex = Regex::new(pattern).map_err(|e| TidyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason:  e.to_string(),
        })?;
        let groups = regex.captures_len() - 1;
        if groups != new_columns.len() {
            return Err(TidyError::cardinality(
                format!("capture groups of '{pattern}'"),
                new_columns.len(),
                groups,
            ));
        }

        let values = self.string_values(column)?;
        let mut out: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(values.len()); groups];
        for value in values.iter() {
            let Some(value) = value
            else {
                out.iter_mut().for_each(|c| c.push(None));
                continue;
            };
            let captures = regex.captures(value).ok_or_else(|| TidyError::PatternMismatch {
                column:  column.to_string(),
                value:   value.clone(),
                pattern: pattern.to_string(),
            })?;
            for (group, target) in out.iter_mut().enumerate() {
                target.push(captures.get(group + 1).map(|m| m.as_str().to_string()));
            }
        }
        debug!("extract '{column}' into {groups} columns");

        let names = new_columns.iter().map(|c| c.as_ref().to_string()).collect_vec();
        self.with_string_columns(&names, out)
    }

    /// Splits `column` on a literal separator. Every non-null value must
    /// produce exactly as many pieces as there are new columns.
    pub fn separate<S: AsRef<str>>(
        self,
        column: &str,
        new_columns: &[S],
        separator: &str,
        remove: bool,
    ) -> Result<Dataset> {
        check_targets(new_columns)?;
        if separator.is_empty() {
            return Err(TidyError::InvalidPattern {
                pattern: separator.to_string(),
                reason:  "empty separator".to_string(),
            });
        }
        let values = self.string_values(column)?;
        let mut out: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(values.len()); new_columns.len()];
        for value in values.iter() {
            let Some(value) = value
            else {
                out.iter_mut().for_each(|c| c.push(None));
                continue;
            };
            let pieces = value.split(separator).collect_vec();
            if pieces.len() != new_columns.len() {
                return Err(TidyError::PatternMismatch {
                    column:  column.to_string(),
                    value:   value.clone(),
                    pattern: separator.to_string(),
                });
            }
            for (target, piece) in out.iter_mut().zip(pieces) {
                target.push(Some(piece.to_string()));
            }
        }

        let names = new_columns.iter().map(|c| c.as_ref().to_string()).collect_vec();
        let mut result = self.with_string_columns(&names, out)?;
        if remove {
            result = result.drop_sources(&[column], &names)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rstest::*;

    use super::*;
    use crate::data_structs::{
        DatasetBuilder,
        Matrix,
    };

    #[fixture]
    fn dataset() -> Dataset {
        DatasetBuilder::default()
            .with_cells(
                df!(
                    "cell_id" => ["c1", "c2", "c3"],
                    "sample" => [Some("b1-x"), Some("b2-y"), None],
                    "lane" => [1i64, 2, 3]
                )
                .unwrap(),
            )
            .with_features(df!("feature_id" => ["G1"]).unwrap())
            .add_assay("counts", Matrix::Dense(array![[1.0, 2.0, 3.0]]))
            .build()
            .unwrap()
    }

    fn strings(
        ds: &Dataset,
        column: &str,
    ) -> Vec<Option<String>> {
        ds.string_values(column).unwrap()
    }

    #[rstest]
    fn test_extract(dataset: Dataset) {
        let out = dataset
            .extract("sample", &["batch", "tag"], r"^b(\d+)-(\w+)$")
            .unwrap();
        assert_eq!(strings(&out, "batch"), vec![
            Some("1".to_string()),
            Some("2".to_string()),
            None
        ]);
        assert_eq!(strings(&out, "tag")[1].as_deref(), Some("y"));
        assert!(out.has_column("sample"));
    }

    #[rstest]
    #[case(r"^b(\d+)$", &["batch", "tag"])]
    #[case(r"^b(\d+)-(\w+)$", &["batch"])]
    fn test_extract_group_count(
        dataset: Dataset,
        #[case] pattern: &str,
        #[case] into: &[&str],
    ) {
        assert!(matches!(
            dataset.extract("sample", into, pattern),
            Err(TidyError::CardinalityMismatch { .. })
        ));
    }

    #[rstest]
    fn test_extract_errors(dataset: Dataset) {
        assert!(matches!(
            dataset.clone().extract("sample", &["a"], r"^(x)"),
            Err(TidyError::PatternMismatch { column, value, .. })
                if column == "sample" && value == "b1-x"
        ));
        assert!(matches!(
            dataset.clone().extract("sample", &["a"], r"(unclosed"),
            Err(TidyError::InvalidPattern { .. })
        ));
        assert!(matches!(
            dataset.extract("sample", &["cell_id"], r"(.*)"),
            Err(TidyError::ProtectedColumn(_))
        ));
    }

    #[rstest]
    fn test_unite(dataset: Dataset) {
        let out = dataset.unite("label", &["lane", "sample"], "_", true).unwrap();
        assert_eq!(strings(&out, "label"), vec![
            Some("1_b1-x".to_string()),
            Some("2_b2-y".to_string()),
            None
        ]);
        assert!(!out.has_column("lane"));
        assert!(!out.has_column("sample"));
    }

    #[rstest]
    fn test_separate(dataset: Dataset) {
        let out = dataset
            .clone()
            .separate("sample", &["batch", "tag"], "-", true)
            .unwrap();
        assert_eq!(strings(&out, "batch")[0].as_deref(), Some("b1"));
        assert!(!out.has_column("sample"));
        assert!(matches!(
            dataset.separate("sample", &["a", "b", "c"], "-", false),
            Err(TidyError::PatternMismatch { .. })
        ));
    }
}
