// pipewright-core/src/unwind_options.rs
// Options for the $unwind stage

use crate::payload::FieldMap;
use serde_json::Value;

/// Resolved `$unwind` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnwindOptions {
    /// Field that receives the element's array index
    pub include_array_index: Option<String>,

    /// Keep documents whose array is null, missing or empty
    pub preserve_null_and_empty_arrays: Option<bool>,
}

/// One setting passed to `StageBuilder::unwind`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UnwindOption {
    IncludeArrayIndex(String),
    PreserveNullAndEmptyArrays(bool),
}

impl UnwindOption {
    pub fn apply(self, opts: &mut UnwindOptions) {
        match self {
            UnwindOption::IncludeArrayIndex(field) => opts.include_array_index = Some(field),
            UnwindOption::PreserveNullAndEmptyArrays(keep) => {
                opts.preserve_null_and_empty_arrays = Some(keep)
            }
        }
    }
}

/// Emit the array index of each unwound element under `field`.
pub fn include_index(field: impl Into<String>) -> UnwindOption {
    UnwindOption::IncludeArrayIndex(field.into())
}

/// Keep documents whose target array is null, missing or empty.
pub fn preserve_null_empty(preserve: bool) -> UnwindOption {
    UnwindOption::PreserveNullAndEmptyArrays(preserve)
}

impl UnwindOptions {
    /// Apply `options` in order; later options win.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = UnwindOption>,
    {
        let mut opts = UnwindOptions::default();
        for option in options {
            option.apply(&mut opts);
        }
        opts
    }

    /// `$unwind` payload for `path`. Unset options are left out.
    pub fn to_payload(&self, path: &str) -> FieldMap {
        let mut unwind = FieldMap::new();
        unwind.insert("path".to_string(), Value::from(path));

        if let Some(index) = &self.include_array_index {
            unwind.insert("includeArrayIndex".to_string(), Value::from(index.as_str()));
        }
        if let Some(preserve) = self.preserve_null_and_empty_arrays {
            unwind.insert("preserveNullAndEmptyArrays".to_string(), Value::from(preserve));
        }
        unwind
    }
}
