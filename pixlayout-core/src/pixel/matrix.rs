use std::ops::{Deref, DerefMut};

use ndarray::Array2;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// A square class-by-class matrix of `f64`.
///
/// Rows are ground-truth classes and columns predicted classes. It serializes
/// as a list of rows, i.e. nested JSON arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMatrix(pub Array2<f64>);

impl ClassMatrix {
    pub fn zeros(num_classes: usize) -> Self {
        Self(Array2::zeros((num_classes, num_classes)))
    }

    pub fn num_classes(&self) -> usize {
        self.0.nrows()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.0
    }

    /// Sum of all cells.
    pub fn total(&self) -> f64 {
        self.0.sum()
    }
}

impl From<Array2<f64>> for ClassMatrix {
    fn from(value: Array2<f64>) -> Self {
        Self(value)
    }
}

impl Deref for ClassMatrix {
    type Target = Array2<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ClassMatrix {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Serialize for ClassMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<f64>> = self.0.rows().into_iter().map(|row| row.to_vec()).collect();
        rows.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClassMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<f64>>::deserialize(deserializer)?;
        let num_classes = rows.len();
        if let Some(row) = rows.iter().find(|row| row.len() != num_classes) {
            return Err(de::Error::custom(format!(
                "expected a square matrix with {} columns per row, found a row of {}",
                num_classes,
                row.len()
            )));
        }

        let cells: Vec<f64> = rows.into_iter().flatten().collect();
        Array2::from_shape_vec((num_classes, num_classes), cells)
            .map(Self)
            .map_err(de::Error::custom)
    }
}
