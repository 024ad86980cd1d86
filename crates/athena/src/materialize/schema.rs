//! Arrow schema for materialized result sets.

use std::collections::HashMap;

use arrow::datatypes::{DataType, Field, Schema};

use crate::result::ResultColumn;

/// Field metadata key recording the Athena type a column was declared with.
pub(crate) const ATHENA_TYPE_KEY: &str = "athena.type";

/// One non-null UTF-8 field per column, labelled as Athena returned it.
pub(crate) fn build_schema(columns: &[ResultColumn]) -> Schema {
    let fields: Vec<Field> = columns
        .iter()
        .map(|col| {
            Field::new(&col.name, DataType::Utf8, false).with_metadata(HashMap::from([(
                ATHENA_TYPE_KEY.to_string(),
                col.data_type.clone(),
            )]))
        })
        .collect();
    Schema::new(fields)
}
