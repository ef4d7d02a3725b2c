use indexmap::IndexMap;
use itertools::Itertools;
use polars::prelude::*;

use crate::data_structs::ScalarValue;
use crate::error::Result;

/// Lifts every value of a column into a [`ScalarValue`], keeping nulls.
pub(crate) fn column_keys(column: &Column) -> Result<Vec<ScalarValue>> {
    let keys = match column.dtype() {
        DataType::Boolean => column
            .bool()?
            .into_iter()
            .map(|v| v.map_or(ScalarValue::Null, ScalarValue::Bool))
            .collect_vec(),
        dtype if dtype.is_integer() => column
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(ScalarValue::Null, ScalarValue::Int))
            .collect_vec(),
        dtype if dtype.is_float() => column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(ScalarValue::Null, ScalarValue::Float))
            .collect_vec(),
        _ => column
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(ScalarValue::Null, |s| ScalarValue::Str(s.to_owned())))
            .collect_vec(),
    };
    Ok(keys)
}

/// Row keys over several columns of a frame.
pub(crate) fn frame_keys(
    frame: &DataFrame,
    columns: &[&str],
) -> Result<Vec<Vec<ScalarValue>>> {
    let per_column = columns
        .iter()
        .map(|name| column_keys(frame.column(name)?))
        .collect::<Result<Vec<_>>>()?;
    Ok((0..frame.height())
        .map(|row| per_column.iter().map(|keys| keys[row].clone()).collect_vec())
        .collect_vec())
}

/// Row positions per distinct key, in order of first appearance. Nulls
/// form a group of their own.
pub(crate) fn group_rows<K, I>(keys: I) -> IndexMap<K, Vec<usize>>
where
    K: std::hash::Hash + Eq,
    I: IntoIterator<Item = K>, {
    let mut groups: IndexMap<K, Vec<usize>> = IndexMap::new();
    for (row, key) in keys.into_iter().enumerate() {
        groups.entry(key).or_default().push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let column = Column::from(Series::new(
            "cell_type".into(),
            [Some("T"), Some("B"), None, Some("T")],
        ));
        let groups = group_rows(column_keys(&column).unwrap());
        let keys = groups.keys().cloned().collect_vec();
        assert_eq!(keys, vec![
            ScalarValue::from("T"),
            ScalarValue::from("B"),
            ScalarValue::Null
        ]);
        assert_eq!(groups[&ScalarValue::from("T")], vec![0, 3]);
    }

    #[test]
    fn test_numeric_keys() {
        let column = Column::from(Series::new("cluster".into(), [1i32, 2, 1]));
        let keys = column_keys(&column).unwrap();
        assert_eq!(keys[2], ScalarValue::Int(1));
        let column = Column::from(Series::new("score".into(), [0.5f32]));
        assert_eq!(column_keys(&column).unwrap()[0], ScalarValue::Float(0.5));
    }
}
