use leafcast_core::{Matrix, ModelError, ModelResult};
use std::path::Path;

/// Read a CSV file with a header row into a feature matrix and a label
/// vector. `label_column` names the zero-based column holding the class
/// label; the remaining columns become features, in file order.
///
/// Malformed numeric fields are errors, never silently zeroed.
pub fn read_csv(path: &Path, label_column: usize) -> ModelResult<(Matrix, Vec<usize>)> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|e| ModelError::Io(e.to_string()))?;
    let width = rdr
        .headers()
        .map_err(|e| ModelError::Serialization(e.to_string()))?
        .len();
    if label_column >= width {
        return Err(ModelError::DimensionMismatch {
            expected: width,
            got: label_column,
        });
    }

    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut labels: Vec<usize> = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| ModelError::Serialization(e.to_string()))?;
        let mut features = Vec::with_capacity(width - 1);
        for (j, field) in record.iter().enumerate() {
            if j == label_column {
                let label: usize = field.trim().parse().map_err(|_| {
                    ModelError::Serialization(format!(
                        "row {}: invalid label {:?}",
                        line + 1,
                        field
                    ))
                })?;
                labels.push(label);
            } else {
                let value: f64 = field.trim().parse().map_err(|_| {
                    ModelError::Serialization(format!(
                        "row {}: invalid numeric field {:?}",
                        line + 1,
                        field
                    ))
                })?;
                features.push(value);
            }
        }
        rows.push(features);
    }

    let matrix = Matrix::from_rows(&rows)?;
    Ok((matrix, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("leafcast-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_csv_splits_labels() {
        let path = temp_csv("ok.csv", "a,b,label\n1.0,2.0,0\n3.0,4.0,1\n");
        let (x, y) = read_csv(&path, 2).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(x.rows(), 2);
        assert_eq!(x.cols(), 2);
        assert_eq!(x.row(1), &[3.0, 4.0]);
        assert_eq!(y, vec![0, 1]);
    }

    #[test]
    fn test_read_csv_rejects_malformed_field() {
        let path = temp_csv("bad.csv", "a,label\noops,0\n");
        let err = read_csv(&path, 1).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ModelError::Serialization(_)));
    }

    #[test]
    fn test_read_csv_label_column_out_of_range() {
        let path = temp_csv("range.csv", "a,b\n1.0,2.0\n");
        let err = read_csv(&path, 5).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(err, ModelError::DimensionMismatch { .. }));
    }
}
