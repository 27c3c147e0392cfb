use std::collections::{BTreeMap, HashMap};

use snafu::OptionExt;

use crate::{
    consts::{BACKGROUND_ID, BACKGROUND_NAME, MAX_CATEGORIES, PIXEL_WORD_BITS},
    error::{PixlayoutError, UnknownCategorySnafu},
};

/// Mapping between caller category ids and confusion-matrix ids.
///
/// Matrix id 0 is always the background class. Caller categories receive the
/// ids `1..=C` in the order they were supplied, which is also the order of the
/// matrix rows and columns. The map is immutable once built.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    class_names: BTreeMap<usize, String>,
    matrix_ids: HashMap<i64, usize>,
    category_ids: BTreeMap<usize, i64>,
}

impl CategoryMap {
    /// Builds the mapping from `(category_id, name)` pairs.
    ///
    /// Fails when the categories do not fit the pixel word next to the
    /// background bit, when a category id repeats, or when a category reuses
    /// the background name.
    pub fn new<I, S>(categories: I) -> Result<Self, PixlayoutError>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut class_names = BTreeMap::from([(BACKGROUND_ID, BACKGROUND_NAME.to_string())]);
        let mut matrix_ids = HashMap::new();
        let mut category_ids = BTreeMap::new();

        for (category_id, name) in categories {
            let name = name.into();
            if name == BACKGROUND_NAME {
                return Err(PixlayoutError::ReservedCategory { category_id, name });
            }

            let matrix_id = matrix_ids.len() + 1;
            if matrix_ids.insert(category_id, matrix_id).is_some() {
                return Err(PixlayoutError::DuplicateCategory { category_id });
            }
            class_names.insert(matrix_id, name);
            category_ids.insert(matrix_id, category_id);
        }

        if matrix_ids.len() > MAX_CATEGORIES {
            return Err(PixlayoutError::TooManyCategories {
                num_categories: matrix_ids.len(),
                bits: PIXEL_WORD_BITS,
            });
        }

        Ok(Self {
            class_names,
            matrix_ids,
            category_ids,
        })
    }

    /// Matrix id (and pixel bit) of a caller category.
    pub fn matrix_id(&self, category_id: i64) -> Result<usize, PixlayoutError> {
        self.matrix_ids
            .get(&category_id)
            .copied()
            .context(UnknownCategorySnafu { category_id })
    }

    /// Caller category behind a matrix id, `None` for background.
    pub fn category_id(&self, matrix_id: usize) -> Option<i64> {
        self.category_ids.get(&matrix_id).copied()
    }

    /// Class names keyed by matrix id, background included.
    pub fn class_names(&self) -> &BTreeMap<usize, String> {
        &self.class_names
    }

    /// Number of matrix classes, i.e. categories plus background.
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }
}
