//! Encoding attributes shared by every AnnData element.

use crate::container::{
    element_count, Attribute, AttributeValue, ContainerError, Dataset, Group, NodeKind,
};

pub(crate) const ENCODING_TYPE: &str = "encoding-type";
pub(crate) const ENCODING_VERSION: &str = "encoding-version";
pub(crate) const INDEX: &str = "_index";
pub(crate) const COLUMN_ORDER: &str = "column-order";
pub(crate) const SHAPE: &str = "shape";
pub(crate) const ORDERED: &str = "ordered";

pub(crate) const ANNDATA: &str = "anndata";
pub(crate) const DATAFRAME: &str = "dataframe";
pub(crate) const DICT: &str = "dict";
pub(crate) const ARRAY: &str = "array";
pub(crate) const STRING_ARRAY: &str = "string-array";
pub(crate) const CATEGORICAL: &str = "categorical";
pub(crate) const NULLABLE_INTEGER: &str = "nullable-integer";
pub(crate) const NULLABLE_BOOLEAN: &str = "nullable-boolean";
pub(crate) const CSR_MATRIX: &str = "csr_matrix";
pub(crate) const CSC_MATRIX: &str = "csc_matrix";

/// Column encodings a dataframe can hold
pub(crate) const COLUMN_ENCODINGS: [&str; 5] = [
    CATEGORICAL,
    STRING_ARRAY,
    ARRAY,
    NULLABLE_INTEGER,
    NULLABLE_BOOLEAN,
];

/// Anything carrying attributes
pub(crate) trait Node {
    fn node_path(&self) -> &str;
    fn node_attr(&self, name: &str) -> Result<Option<Attribute>, ContainerError>;
}

impl Node for Group {
    fn node_path(&self) -> &str {
        self.path()
    }

    fn node_attr(&self, name: &str) -> Result<Option<Attribute>, ContainerError> {
        self.attr(name)
    }
}

impl Node for Dataset {
    fn node_path(&self) -> &str {
        self.path()
    }

    fn node_attr(&self, name: &str) -> Result<Option<Attribute>, ContainerError> {
        self.attr(name)
    }
}

fn describe(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => format!("'{}'", s),
        other => format!("{:?}", other),
    }
}

/// Attribute `name`, which must be present
pub(crate) fn require_attr(node: &impl Node, name: &str) -> Result<AttributeValue, ContainerError> {
    node.node_attr(name)?
        .map(Attribute::into_value)
        .ok_or_else(|| ContainerError::MissingEncodingAttribute {
            path: node.node_path().to_string(),
            attribute: name.to_string(),
        })
}

/// String attribute `name`, which must be present
pub(crate) fn require_string_attr(node: &impl Node, name: &str) -> Result<String, ContainerError> {
    match require_attr(node, name)? {
        AttributeValue::Str(s) => Ok(s),
        other => Err(ContainerError::InvalidEncodingAttribute {
            path: node.node_path().to_string(),
            attribute: name.to_string(),
            expected: "a string".to_string(),
            actual: describe(&other),
        }),
    }
}

/// Value of `encoding-type`, `None` when absent or not a string
pub(crate) fn encoding_type(node: &impl Node) -> Result<Option<String>, ContainerError> {
    Ok(node
        .node_attr(ENCODING_TYPE)?
        .and_then(|a| a.value().as_str().map(str::to_string)))
}

/// Check that `encoding-type` is one of `expected` and return it
pub(crate) fn check_encoding(node: &impl Node, expected: &[&str]) -> Result<String, ContainerError> {
    let actual = require_string_attr(node, ENCODING_TYPE)?;
    if expected.contains(&actual.as_str()) {
        Ok(actual)
    } else {
        Err(ContainerError::InvalidEncodingAttribute {
            path: node.node_path().to_string(),
            attribute: ENCODING_TYPE.to_string(),
            expected: expected
                .iter()
                .map(|e| format!("'{}'", e))
                .collect::<Vec<_>>()
                .join(" or "),
            actual: format!("'{}'", actual),
        })
    }
}

/// `encoding-type` of the child `name` of `group`, whether a group or a dataset
pub(crate) fn child_encoding_type(group: &Group, name: &str) -> Result<Option<String>, ContainerError> {
    match group.child_kind(name)? {
        Some(NodeKind::Group) => encoding_type(&group.group(name)?),
        Some(NodeKind::Dataset) => encoding_type(&group.dataset(name)?),
        None => Ok(None),
    }
}

/// Rank-2 `shape` attribute
pub(crate) fn read_shape(node: &impl Node) -> Result<(usize, usize), ContainerError> {
    let value = require_attr(node, SHAPE)?;
    let invalid = || ContainerError::InvalidEncodingAttribute {
        path: node.node_path().to_string(),
        attribute: SHAPE.to_string(),
        expected: "two non-negative integers".to_string(),
        actual: describe(&value),
    };
    let dims = value.as_int_array().ok_or_else(invalid)?;
    let (rows, cols) = match dims.as_slice() {
        [rows, cols] => (
            usize::try_from(*rows).map_err(|_| invalid())?,
            usize::try_from(*cols).map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    element_count(node.node_path(), &[rows, cols])?;
    Ok((rows, cols))
}
