use log::debug;

use crate::anndata::encoding::{
    check_encoding, child_encoding_type, encoding_type, ANNDATA, COLUMN_ENCODINGS, DICT,
    ENCODING_VERSION,
};
use crate::anndata::Dataframe;
use crate::container::{ContainerError, Group};

use super::{ValidationCheck, ValidationReport};

/// Root group encoding attributes
pub(crate) fn check_root(root: &Group, report: &mut ValidationReport) {
    match encoding_type(root) {
        Ok(Some(encoding)) if encoding == ANNDATA => {
            report.add_check(ValidationCheck::ok("Root encoding-type"))
        }
        Ok(Some(encoding)) => report.add_check(ValidationCheck::failed(
            "Root encoding-type",
            format!("expected '{}', found '{}'", ANNDATA, encoding),
        )),
        Ok(None) => report.add_check(ValidationCheck::failed(
            "Root encoding-type",
            "missing or not a string",
        )),
        Err(e) => report.add_check(ValidationCheck::failed("Root encoding-type", e.to_string())),
    }

    match root.attr(ENCODING_VERSION) {
        Ok(Some(_)) => report.add_check(ValidationCheck::ok("Root encoding-version")),
        Ok(None) => report.add_check(ValidationCheck::failed("Root encoding-version", "missing")),
        Err(e) => report.add_check(ValidationCheck::failed("Root encoding-version", e.to_string())),
    }
}

/// Dataframe `name` and every column in it
pub(crate) fn check_dataframe(
    root: &Group,
    name: &str,
    report: &mut ValidationReport,
) -> Option<Dataframe> {
    let label = format!("{} dataframe", name);
    let dataframe = match root.contains(name) {
        Ok(true) => match root.group(name).and_then(Dataframe::open) {
            Ok(dataframe) => dataframe,
            Err(e) => {
                report.add_check(ValidationCheck::failed(label, e.to_string()));
                return None;
            }
        },
        Ok(false) => {
            report.add_check(ValidationCheck::failed(label, "missing"));
            return None;
        }
        Err(e) => {
            report.add_check(ValidationCheck::failed(label, e.to_string()));
            return None;
        }
    };
    debug!("{} has {} rows", label, dataframe.len());
    report.add_check(ValidationCheck::ok(label));

    if let Err(e) = check_columns(root, name, &dataframe, report) {
        report.add_check(ValidationCheck::failed(format!("{} columns", name), e.to_string()));
    }
    Some(dataframe)
}

fn check_columns(
    root: &Group,
    name: &str,
    dataframe: &Dataframe,
    report: &mut ValidationReport,
) -> Result<(), ContainerError> {
    let group = root.group(name)?;
    for child in group.children()? {
        let label = format!("{} column '{}'", name, child);
        match child_encoding_type(&group, &child)? {
            Some(encoding) if COLUMN_ENCODINGS.contains(&encoding.as_str()) => {}
            Some(encoding) => {
                report.add_check(ValidationCheck::warning(
                    label,
                    format!("unsupported encoding-type '{}', ignored", encoding),
                ));
                continue;
            }
            None => {
                report.add_check(ValidationCheck::warning(
                    label,
                    "no encoding-type attribute, ignored",
                ));
                continue;
            }
        }

        match dataframe.column(&child) {
            Ok(column) if column.len() != dataframe.len() => {
                report.add_check(ValidationCheck::failed(
                    label,
                    format!("{} entries, expected {}", column.len(), dataframe.len()),
                ))
            }
            Ok(column) => {
                debug!("{} decoded as {}", label, column.encoding_type());
                report.add_check(ValidationCheck::ok(label))
            }
            Err(e) => report.add_check(ValidationCheck::failed(label, e.to_string())),
        }
    }
    Ok(())
}

/// `uns` must be a dict when present
pub(crate) fn check_uns(root: &Group, report: &mut ValidationReport) {
    match root.contains("uns") {
        Ok(false) => {}
        Ok(true) => match root.group("uns").and_then(|uns| check_encoding(&uns, &[DICT])) {
            Ok(_) => report.add_check(ValidationCheck::ok("uns encoding")),
            Err(e) => report.add_check(ValidationCheck::failed("uns encoding", e.to_string())),
        },
        Err(e) => report.add_check(ValidationCheck::failed("uns encoding", e.to_string())),
    }
}
